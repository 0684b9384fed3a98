//! Caption line recognition.
//!
//! Figure captions read `Figure 3: ...`, `Fig. 2. ...`, `FIG.4 | ...` or the
//! all-caps `FIGURE 5 ...`; tables mirror these with `Table`, `Tab.`,
//! `TAB.` and `TABLE`.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::model::{CaptionCandidate, CaptionKind, PageLayout, Rect};

/// A caption line broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionMatch {
    pub kind: CaptionKind,
    /// Label as spelled in the document (`Figure`, `Fig.`, `TABLE`, ...)
    pub label: String,
    /// Figure/table identifier (`3`, `S1`, `IV`)
    pub id: String,
    /// Caption text after the separator
    pub body: String,
}

impl CaptionMatch {
    /// Search query that finds this caption's key on a page.
    pub fn query(&self) -> String {
        format!("{} {}", self.label, self.id)
    }
}

fn figure_caption_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(?P<caps>FIGURE)\s*(?P<caps_id>[A-Za-z0-9]+)\s+(?P<caps_body>.+)|(?P<label>Figure|Fig\.|FIG\.)\s*(?P<id>[A-Za-z0-9]+)\s*[|:.]\s+(?P<body>.+))",
        )
        .unwrap()
    })
}

fn table_caption_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(?P<caps>TABLE)\s*(?P<caps_id>[A-Za-z0-9]+)\s+(?P<caps_body>.+)|(?P<label>Table|Tab\.|TAB\.)\s*(?P<id>[A-Za-z0-9]+)\s*[|:.]\s+(?P<body>.+))",
        )
        .unwrap()
    })
}

fn figure_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(Figure|FIGURE|Fig\.|FIG\.)\s*([A-Za-z0-9]+)").unwrap())
}

fn table_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(Table|TABLE|Tab\.|TAB\.)\s*([A-Za-z0-9]+)").unwrap())
}

fn to_match(kind: CaptionKind, caps: &Captures<'_>) -> CaptionMatch {
    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();
    let (label, id, body) = if caps.name("caps").is_some() {
        (group("caps"), group("caps_id"), group("caps_body"))
    } else {
        (group("label"), group("id"), group("body"))
    };
    CaptionMatch {
        kind,
        label: label.to_string(),
        id: id.to_string(),
        body: body.trim().to_string(),
    }
}

/// Match a figure caption line.
pub fn match_figure_caption(line: &str) -> Option<CaptionMatch> {
    figure_caption_re()
        .captures(line)
        .map(|c| to_match(CaptionKind::Figure, &c))
}

/// Match a table caption line.
pub fn match_table_caption(line: &str) -> Option<CaptionMatch> {
    table_caption_re()
        .captures(line)
        .map(|c| to_match(CaptionKind::Table, &c))
}

/// Match a line as either kind, figures first.
pub fn match_caption(line: &str) -> Option<CaptionMatch> {
    match_figure_caption(line).or_else(|| match_table_caption(line))
}

pub fn is_figure_caption(line: &str) -> bool {
    figure_caption_re().is_match(line)
}

pub fn is_table_caption(line: &str) -> bool {
    table_caption_re().is_match(line)
}

/// Derive a `"<Label> <id>"` search query from a caption line.
///
/// Looser than the caption predicates: only the key is required, so a
/// caption whose body wrapped onto the next line still yields a query.
pub fn caption_query(line: &str) -> Option<String> {
    let line = line.trim();
    [figure_key_re(), table_key_re()]
        .iter()
        .find_map(|re| re.captures(line))
        .map(|c| format!("{} {}", &c[1], &c[2]))
}

/// Text lines of a page that read like captions.
pub fn locate_captions(page: &PageLayout) -> Vec<CaptionCandidate> {
    page.lines
        .iter()
        .filter(|line| {
            let text = line.text.trim();
            !text.is_empty() && (is_figure_caption(text) || is_table_caption(text))
        })
        .map(|line| CaptionCandidate {
            page: page.number,
            text: line.text.trim().to_string(),
            bbox: line.bbox,
        })
        .collect()
}

/// Search hits for every query, merged in query order.
pub fn match_queries(page: &PageLayout, queries: &[String]) -> Vec<Rect> {
    queries.iter().flat_map(|q| page.search(q)).collect()
}

/// Caption boxes for a page: located caption lines, else query hits.
pub fn caption_rects(page: &PageLayout, queries: &[String]) -> Vec<Rect> {
    let located = locate_captions(page);
    if located.is_empty() && !queries.is_empty() {
        let hits = match_queries(page, queries);
        log::debug!(
            "Page {}: no caption lines, {} hits for queries {:?}",
            page.number,
            hits.len(),
            queries
        );
        return hits;
    }
    located.into_iter().map(|c| c.bbox).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figure_caption_forms() {
        let m = match_figure_caption("Figure 3: Accuracy per epoch").unwrap();
        assert_eq!(m.kind, CaptionKind::Figure);
        assert_eq!((m.label.as_str(), m.id.as_str()), ("Figure", "3"));
        assert_eq!(m.body, "Accuracy per epoch");
        assert_eq!(m.query(), "Figure 3");

        assert!(is_figure_caption("Fig. 2. Overview of the pipeline"));
        assert!(is_figure_caption("FIG.4 | Ablation"));
        assert!(is_figure_caption("  Figure S1 | Supplementary data"));

        let caps = match_figure_caption("FIGURE 5 Cell counts").unwrap();
        assert_eq!((caps.label.as_str(), caps.id.as_str()), ("FIGURE", "5"));
        assert_eq!(caps.body, "Cell counts");
    }

    #[test]
    fn test_body_references_are_not_captions() {
        assert!(!is_figure_caption("Figure 3 shows the results"));
        assert!(!is_figure_caption("as shown in Figure 3: results"));
        assert!(!is_figure_caption("Figure 3:"));
        assert!(!is_figure_caption("Fig 2. Missing period after Fig"));
        assert!(!is_table_caption("Table 1 lists the parameters"));
    }

    #[test]
    fn test_table_caption_forms() {
        let m = match_table_caption("Table 2. Hyperparameters").unwrap();
        assert_eq!(m.kind, CaptionKind::Table);
        assert_eq!(m.query(), "Table 2");
        assert!(is_table_caption("TABLE IV Comparison with baselines"));
        assert!(is_table_caption("Tab. 1: Datasets"));
        assert_eq!(match_caption("TAB.3 | Runtime").map(|m| m.kind), Some(CaptionKind::Table));
    }

    #[test]
    fn test_caption_query() {
        assert_eq!(caption_query("Figure 3: Results").as_deref(), Some("Figure 3"));
        assert_eq!(caption_query("  Fig.2 Overview").as_deref(), Some("Fig. 2"));
        assert_eq!(caption_query("TABLE 1 Data").as_deref(), Some("TABLE 1"));
        assert_eq!(caption_query("Results in Figure 3"), None);
    }

    #[test]
    fn test_locate_captions() {
        let mut page = PageLayout::letter(4);
        page.add_line("Some body text", Rect::new(72.0, 100.0, 300.0, 112.0));
        page.add_line("Figure 1: A plot", Rect::new(72.0, 400.0, 200.0, 412.0));
        page.add_line("Table 1. Numbers", Rect::new(72.0, 500.0, 200.0, 512.0));

        let captions = locate_captions(&page);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].page, 4);
        assert_eq!(captions[0].text, "Figure 1: A plot");
        assert_eq!(captions[1].bbox, Rect::new(72.0, 500.0, 200.0, 512.0));
    }

    #[test]
    fn test_caption_rects_falls_back_to_queries() {
        let mut page = PageLayout::letter(1);
        page.add_line("Figure 2", Rect::new(72.0, 400.0, 152.0, 412.0));
        page.add_line("Overview of the model", Rect::new(72.0, 414.0, 252.0, 426.0));

        assert!(locate_captions(&page).is_empty());
        assert!(caption_rects(&page, &[]).is_empty());

        let rects = caption_rects(&page, &["Figure 2".to_string()]);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].y0, 400.0);
    }
}
