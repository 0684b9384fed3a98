//! Pages chosen for rendering.

use serde::{Deserialize, Serialize};

/// Which fallback tier produced a page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    /// Caption pages within the per-page caption limit
    Filtered,
    /// Every caption-bearing page (the limit excluded all of them)
    CaptionPages,
    /// Every page of the document
    AllPages,
}

/// Ordered set of page numbers selected for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection {
    /// Page numbers (1-indexed), ascending, without duplicates
    pub pages: Vec<u32>,

    /// Tier that produced `pages`
    pub tier: SelectionTier,
}

impl PageSelection {
    pub fn new(mut pages: Vec<u32>, tier: SelectionTier) -> Self {
        pages.sort_unstable();
        pages.dedup();
        Self { pages, tier }
    }

    /// Every page of a document with `page_count` pages.
    pub fn all(page_count: u32) -> Self {
        Self {
            pages: (1..=page_count).collect(),
            tier: SelectionTier::AllPages,
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.binary_search(&page).is_ok()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_sorted_and_deduped() {
        let sel = PageSelection::new(vec![5, 2, 5, 1], SelectionTier::Filtered);
        assert_eq!(sel.pages, vec![1, 2, 5]);
        assert!(sel.contains(2));
        assert!(!sel.contains(3));
        assert_eq!(sel.len(), 3);
    }

    #[test]
    fn test_selection_all() {
        let sel = PageSelection::all(3);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(sel.tier, SelectionTier::AllPages);
        assert!(PageSelection::all(0).is_empty());
    }
}
