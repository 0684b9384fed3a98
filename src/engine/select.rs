//! Render page selection.

use std::collections::BTreeMap;

use crate::model::{PageSelection, SelectionTier};
use crate::options::FigurePages;

/// Choose the pages to render.
///
/// `caption_pages` holds one page number per caption line found in the
/// document text. In caption mode, pages with more than `max_per_page`
/// captions (lists of figures, supplementary indexes) are dropped; if that
/// empties the selection every caption page is kept, and without any
/// caption every page is.
pub fn select_pages(
    page_count: u32,
    caption_pages: &[u32],
    mode: FigurePages,
    max_per_page: usize,
) -> PageSelection {
    if mode == FigurePages::All {
        return PageSelection::all(page_count);
    }

    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for &page in caption_pages {
        if (1..=page_count).contains(&page) {
            *counts.entry(page).or_default() += 1;
        }
    }

    let filtered: Vec<u32> = counts
        .iter()
        .filter(|(_, count)| **count <= max_per_page)
        .map(|(&page, _)| page)
        .collect();

    if !filtered.is_empty() {
        if filtered.len() < counts.len() {
            log::debug!(
                "Excluded {} caption-dense pages",
                counts.len() - filtered.len()
            );
        }
        return PageSelection::new(filtered, SelectionTier::Filtered);
    }
    if !counts.is_empty() {
        return PageSelection::new(counts.into_keys().collect(), SelectionTier::CaptionPages);
    }
    PageSelection::all(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_mode() {
        let selection = select_pages(3, &[2], FigurePages::All, 6);
        assert_eq!(selection.pages, vec![1, 2, 3]);
        assert_eq!(selection.tier, SelectionTier::AllPages);
    }

    #[test]
    fn test_dense_page_excluded() {
        let mut captions = vec![3; 10];
        captions.extend([5, 5, 7]);
        let selection = select_pages(8, &captions, FigurePages::Caption, 6);
        assert_eq!(selection.pages, vec![5, 7]);
        assert_eq!(selection.tier, SelectionTier::Filtered);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let selection = select_pages(4, &[2; 6], FigurePages::Caption, 6);
        assert_eq!(selection.pages, vec![2]);
        assert_eq!(selection.tier, SelectionTier::Filtered);
    }

    #[test]
    fn test_all_dense_keeps_caption_pages() {
        let mut captions = vec![4; 8];
        captions.extend([2; 7]);
        let selection = select_pages(6, &captions, FigurePages::Caption, 6);
        assert_eq!(selection.pages, vec![2, 4]);
        assert_eq!(selection.tier, SelectionTier::CaptionPages);
    }

    #[test]
    fn test_no_captions_selects_all() {
        let selection = select_pages(3, &[], FigurePages::Caption, 6);
        assert_eq!(selection.pages, vec![1, 2, 3]);
        assert_eq!(selection.tier, SelectionTier::AllPages);
    }

    #[test]
    fn test_never_empty_with_pages() {
        for captions in [vec![], vec![1; 20], vec![1, 2]] {
            assert!(!select_pages(2, &captions, FigurePages::Caption, 0).is_empty());
        }
        assert!(select_pages(0, &[], FigurePages::Caption, 6).is_empty());
    }
}
