//! Whole-document caption scan over page text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::caption::{caption_query, is_figure_caption, is_table_caption};
use crate::parser::PdfBackend;

/// A caption line found in the page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionLine {
    pub page: u32,
    pub line: String,
}

/// Page texts and the caption lines found in them.
#[derive(Debug, Clone, Default)]
pub struct CaptionScan {
    /// Text per page, index 0 holding page 1
    pub page_texts: Vec<String>,
    pub figures: Vec<CaptionLine>,
    pub tables: Vec<CaptionLine>,
}

impl CaptionScan {
    /// Extract every page's text and scan it.
    ///
    /// A page whose text cannot be extracted contributes empty text.
    pub fn scan<B: PdfBackend + ?Sized>(backend: &B) -> Self {
        let texts = (1..=backend.page_count()).map(|page| {
            backend.page_text(page).unwrap_or_else(|e| {
                log::warn!("Page {}: text extraction failed: {}", page, e);
                String::new()
            })
        });
        Self::from_page_texts(texts)
    }

    /// Scan already extracted page texts (page 1 first).
    pub fn from_page_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scan = Self::default();
        for (i, text) in texts.into_iter().enumerate() {
            let page = i as u32 + 1;
            let text = text.into();
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                if is_figure_caption(line) {
                    scan.figures.push(CaptionLine { page, line: line.to_string() });
                }
                if is_table_caption(line) {
                    scan.tables.push(CaptionLine { page, line: line.to_string() });
                }
            }
            scan.page_texts.push(text);
        }
        log::debug!(
            "Caption scan: {} figure and {} table lines over {} pages",
            scan.figures.len(),
            scan.tables.len(),
            scan.page_texts.len()
        );
        scan
    }

    /// Figure then table caption lines.
    pub fn captions(&self) -> impl Iterator<Item = &CaptionLine> {
        self.figures.iter().chain(self.tables.iter())
    }

    /// One page number per caption line.
    pub fn caption_pages(&self) -> Vec<u32> {
        self.captions().map(|c| c.page).collect()
    }

    /// Search queries per page, deduplicated in first-seen order.
    pub fn queries_by_page(&self) -> BTreeMap<u32, Vec<String>> {
        let mut queries: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for caption in self.captions() {
            if let Some(query) = caption_query(&caption.line) {
                let page_queries = queries.entry(caption.page).or_default();
                if !page_queries.contains(&query) {
                    page_queries.push(query);
                }
            }
        }
        queries
    }

    /// All page texts behind `===== Page N =====` separators.
    pub fn fulltext(&self) -> String {
        self.page_texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("\n\n===== Page {} =====\n{}", i + 1, text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CaptionScan {
        CaptionScan::from_page_texts([
            "Introduction\nAs Figure 1 shows...",
            "Figure 1: Overview\n  Table 1. Datasets  \nFigure 1: Overview",
            "",
            "FIGURE 2 Results\nFig. 3 | More results",
        ])
    }

    #[test]
    fn test_scan_lines() {
        let scan = sample();
        assert_eq!(scan.page_texts.len(), 4);
        assert_eq!(scan.figures.len(), 4);
        assert_eq!(scan.tables, vec![CaptionLine { page: 2, line: "Table 1. Datasets".to_string() }]);
        assert_eq!(scan.caption_pages(), vec![2, 2, 4, 4, 2]);
    }

    #[test]
    fn test_queries_by_page() {
        let queries = sample().queries_by_page();
        assert_eq!(queries[&2], vec!["Figure 1".to_string(), "Table 1".to_string()]);
        assert_eq!(queries[&4], vec!["FIGURE 2".to_string(), "Fig. 3".to_string()]);
        assert!(!queries.contains_key(&1));
    }

    #[test]
    fn test_fulltext_format() {
        let scan = CaptionScan::from_page_texts(["one", "two"]);
        assert_eq!(
            scan.fulltext(),
            "\n\n===== Page 1 =====\none\n\n===== Page 2 =====\ntwo"
        );
    }
}
