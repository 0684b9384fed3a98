//! Caption-aware clip computation.
//!
//! Given the caption boxes and visual regions of a page, pick the visuals
//! each caption belongs to and derive one crop rectangle covering them.
//!
//! # Algorithm
//!
//! 1. Captions farther than `max_caption_gap_ratio` × page height from
//!    every visual are dropped.
//! 2. Each remaining caption looks at the visuals above it and below it
//!    (within a side tolerance) and takes the side with the larger summed
//!    area. Equal areas resolve to the visuals above, since captions more
//!    often sit under their figure.
//! 3. The chosen visuals and their captions are unioned. When no caption
//!    associates with anything, all visuals are unioned instead.
//! 4. The union is padded by the caption margin on the left, top and right,
//!    and at the bottom up to the bottom margin of the page.
//! 5. A crop thinner than `min_crop_height_ratio` × page height, or one
//!    escaping the page, falls back to the full page.

use serde::Serialize;

use super::caption::caption_rects;
use super::visual::collect_visuals;
use crate::model::{ClipFallback, ClipRegion, PageLayout, Rect, VisualRegion};
use crate::options::ClipConfig;

/// Which side of a caption its visuals sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Above,
    Below,
}

/// The visuals a caption was matched with.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub side: Side,
    pub regions: Vec<VisualRegion>,
}

/// Result of clip computation for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutcome {
    pub clip: ClipRegion,
    /// Caption boxes found on the page, before gap filtering
    pub caption_rect_count: usize,
    /// Visual regions considered
    pub visual_count: usize,
    /// Captions that associated with a side
    pub associated_count: usize,
    /// Why the clip was not applied
    pub fallback: Option<ClipFallback>,
}

impl ClipOutcome {
    /// Outcome when no clip was computed at all.
    pub fn disabled() -> Self {
        Self {
            clip: ClipRegion::NotApplied,
            caption_rect_count: 0,
            visual_count: 0,
            associated_count: 0,
            fallback: None,
        }
    }

    fn not_applied(caption_rect_count: usize, visual_count: usize, fallback: ClipFallback) -> Self {
        Self {
            clip: ClipRegion::NotApplied,
            caption_rect_count,
            visual_count,
            associated_count: 0,
            fallback: Some(fallback),
        }
    }
}

/// Distance from a caption to its nearest visual, `None` without visuals.
pub fn nearest_visual_gap(caption: &Rect, visuals: &[VisualRegion]) -> Option<f32> {
    visuals
        .iter()
        .map(|v| caption.vertical_gap(&v.bbox))
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

/// Keep captions whose nearest visual lies within `max_gap`.
pub fn filter_captions(captions: &[Rect], visuals: &[VisualRegion], max_gap: f32) -> Vec<Rect> {
    captions
        .iter()
        .filter(|cap| nearest_visual_gap(cap, visuals).is_some_and(|gap| gap <= max_gap))
        .copied()
        .collect()
}

/// Pick the side of `caption` whose visuals cover more area.
pub fn associate(caption: &Rect, visuals: &[VisualRegion], tolerance: f32) -> Option<Association> {
    let above: Vec<VisualRegion> = visuals
        .iter()
        .filter(|v| v.bbox.y1 <= caption.y0 + tolerance)
        .copied()
        .collect();
    let below: Vec<VisualRegion> = visuals
        .iter()
        .filter(|v| v.bbox.y0 >= caption.y1 - tolerance)
        .copied()
        .collect();

    let above_area: f32 = above.iter().map(|v| v.area).sum();
    let below_area: f32 = below.iter().map(|v| v.area).sum();
    if above_area <= 0.0 && below_area <= 0.0 {
        return None;
    }

    let (side, regions) = if above_area >= below_area {
        (Side::Above, above)
    } else {
        (Side::Below, below)
    };
    (!regions.is_empty()).then_some(Association { side, regions })
}

/// Compute the crop rectangle for a page of the given size.
///
/// Returns the fallback reason when the clip cannot be applied; the second
/// tuple element is the number of captions that associated.
pub fn compute_clip(
    page_rect: &Rect,
    captions: &[Rect],
    visuals: &[VisualRegion],
    config: &ClipConfig,
) -> (Result<Rect, ClipFallback>, usize) {
    if visuals.is_empty() {
        return (Err(ClipFallback::NoVisualRegions), 0);
    }

    let page_height = page_rect.height();
    let captions = filter_captions(captions, visuals, page_height * config.max_caption_gap_ratio);
    let tolerance = config.side_tolerance(page_height);

    let mut to_union: Vec<Rect> = Vec::new();
    let mut associated = 0;
    for cap in &captions {
        if let Some(association) = associate(cap, visuals, tolerance) {
            to_union.extend(association.regions.iter().map(|v| v.bbox));
            to_union.push(*cap);
            associated += 1;
        }
    }
    if to_union.is_empty() {
        to_union.extend(visuals.iter().map(|v| v.bbox));
    }

    let Some(union) = Rect::union_all(&to_union) else {
        return (Err(ClipFallback::NoVisualRegions), associated);
    };

    let pad = config.caption_top_margin_pt;
    let left = page_rect.x0.max(union.x0 - pad);
    let top = page_rect.y0.max(union.y0 - pad);
    let right = page_rect.x1.min(union.x1 + pad).max(left + 1.0);
    let bottom = (page_rect.y1 - config.crop_bottom_margin_pt)
        .min(union.y1 + pad)
        .max(top + 1.0);
    let clip = Rect { x0: left, y0: top, x1: right, y1: bottom };

    if clip.height() < page_height * config.min_crop_height_ratio {
        return (Err(ClipFallback::TooThin), associated);
    }
    if !page_rect.contains(&clip) {
        return (Err(ClipFallback::OutOfBounds), associated);
    }
    (Ok(clip), associated)
}

/// Locate captions and visuals on a page and compute its clip.
///
/// `queries` are used only when no caption line is found on the page.
pub fn build_clip(page: &PageLayout, queries: &[String], config: &ClipConfig) -> ClipOutcome {
    let captions = caption_rects(page, queries);
    let caption_rect_count = captions.len();

    let visuals = collect_visuals(page, config.image_area_ratio, config.drawing_area_ratio);
    let (result, associated_count) = compute_clip(&page.rect(), &captions, &visuals, config);

    match result {
        Ok(rect) => {
            log::debug!(
                "Page {}: clip {:?} from {} captions, {} visuals",
                page.number,
                rect.to_array(),
                caption_rect_count,
                visuals.len()
            );
            ClipOutcome {
                clip: ClipRegion::Applied(rect),
                caption_rect_count,
                visual_count: visuals.len(),
                associated_count,
                fallback: None,
            }
        }
        Err(fallback) => {
            log::debug!("Page {}: no clip ({})", page.number, fallback);
            ClipOutcome {
                associated_count,
                ..ClipOutcome::not_applied(caption_rect_count, visuals.len(), fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisualKind;

    fn image(x0: f32, y0: f32, x1: f32, y1: f32) -> VisualRegion {
        VisualRegion::new(Rect::new(x0, y0, x1, y1), VisualKind::Image)
    }

    fn letter() -> Rect {
        Rect::new(0.0, 0.0, 612.0, 792.0)
    }

    #[test]
    fn test_caption_below_image() {
        let mut page = PageLayout::letter(1);
        page.add_image(7, Rect::new(120.0, 500.0, 500.0, 690.0));
        page.add_line("Figure 1: Results", Rect::new(100.0, 700.0, 400.0, 712.0));

        let outcome = build_clip(&page, &[], &ClipConfig::default());
        assert_eq!(outcome.caption_rect_count, 1);
        assert_eq!(outcome.associated_count, 1);
        assert_eq!(outcome.fallback, None);
        assert_eq!(
            outcome.clip,
            ClipRegion::Applied(Rect::new(90.0, 490.0, 510.0, 722.0))
        );
    }

    #[test]
    fn test_no_visuals_not_applied() {
        let mut page = PageLayout::letter(1);
        page.add_line("Figure 1: Results", Rect::new(100.0, 700.0, 400.0, 712.0));

        let outcome = build_clip(&page, &[], &ClipConfig::default());
        assert_eq!(outcome.clip, ClipRegion::NotApplied);
        assert_eq!(outcome.fallback, Some(ClipFallback::NoVisualRegions));
        assert_eq!(outcome.caption_rect_count, 1);
    }

    #[test]
    fn test_larger_side_wins() {
        let caption = Rect::new(50.0, 400.0, 550.0, 412.0);
        let visuals = [
            image(50.0, 300.0, 150.0, 390.0),
            image(50.0, 420.0, 550.0, 700.0),
        ];
        let association = associate(&caption, &visuals, 7.92).unwrap();
        assert_eq!(association.side, Side::Below);
        assert_eq!(association.regions, vec![visuals[1]]);
    }

    #[test]
    fn test_tie_goes_above() {
        let caption = Rect::new(50.0, 400.0, 550.0, 412.0);
        let visuals = [
            image(50.0, 200.0, 250.0, 390.0),
            image(50.0, 422.0, 250.0, 612.0),
        ];
        let association = associate(&caption, &visuals, 7.92).unwrap();
        assert_eq!(association.side, Side::Above);
        assert_eq!(association.regions, vec![visuals[0]]);
    }

    #[test]
    fn test_side_tolerance_admits_overlap() {
        // Image bottom slightly overlaps the caption top
        let caption = Rect::new(50.0, 400.0, 550.0, 412.0);
        let visuals = [image(50.0, 200.0, 550.0, 405.0)];
        let association = associate(&caption, &visuals, 7.92).unwrap();
        assert_eq!(association.side, Side::Above);

        assert!(associate(&caption, &visuals, 4.0).is_none());
    }

    #[test]
    fn test_far_caption_ignored() {
        let config = ClipConfig::default();
        let visuals = [image(100.0, 50.0, 500.0, 250.0)];
        // 300pt below the image: more than 25% of 792
        let far = Rect::new(100.0, 550.0, 300.0, 562.0);

        let (with_far, associated) = compute_clip(&letter(), &[far], &visuals, &config);
        let (without, _) = compute_clip(&letter(), &[], &visuals, &config);
        assert_eq!(associated, 0);
        assert_eq!(with_far, without);
        assert_eq!(with_far, Ok(Rect::new(90.0, 40.0, 510.0, 260.0)));
    }

    #[test]
    fn test_unassociated_captions_union_all_visuals() {
        let config = ClipConfig::default();
        let visuals = [
            image(50.0, 100.0, 250.0, 300.0),
            image(300.0, 100.0, 550.0, 300.0),
        ];
        let (clip, associated) = compute_clip(&letter(), &[], &visuals, &config);
        assert_eq!(associated, 0);
        assert_eq!(clip, Ok(Rect::new(40.0, 90.0, 560.0, 310.0)));
    }

    #[test]
    fn test_bottom_margin_limits_clip() {
        let config = ClipConfig::default();
        let visuals = [image(50.0, 500.0, 550.0, 790.0)];
        let (clip, _) = compute_clip(&letter(), &[], &visuals, &config);
        let clip = clip.unwrap();
        assert_eq!(clip.y1, 784.0);
        assert_eq!(clip.y0, 490.0);
    }

    #[test]
    fn test_thin_clip_falls_back() {
        let config = ClipConfig::default();
        // Padded height 60pt against a 118.8pt minimum
        let visuals = [image(50.0, 100.0, 550.0, 140.0)];
        let (clip, _) = compute_clip(&letter(), &[], &visuals, &config);
        assert_eq!(clip, Err(ClipFallback::TooThin));
    }

    #[test]
    fn test_applied_clip_within_page() {
        let config = ClipConfig::default();
        let page = letter();
        let visuals = [
            image(-20.0, -30.0, 300.0, 400.0),
            image(400.0, 600.0, 640.0, 820.0),
        ];
        let (clip, _) = compute_clip(&page, &[], &visuals, &config);
        let clip = clip.unwrap();
        assert!(page.contains(&clip));
        assert!(clip.height() >= page.height() * config.min_crop_height_ratio);
    }

    #[test]
    fn test_rotated_page_is_cropped_in_layout_space() {
        let mut page = PageLayout::letter(2);
        page.add_image(7, Rect::new(120.0, 500.0, 500.0, 690.0));
        page.add_line("Figure 1: Results", Rect::new(100.0, 700.0, 400.0, 712.0));
        let upright = build_clip(&page, &[], &ClipConfig::default());

        page.rotation = 90;
        let outcome = build_clip(&page, &[], &ClipConfig::default());
        assert!(outcome.clip.is_applied());
        assert_eq!(outcome.fallback, None);
        assert_eq!(outcome.caption_rect_count, 1);
        assert_eq!(outcome.clip, upright.clip);
    }

    #[test]
    fn test_query_hits_count_as_captions() {
        let mut page = PageLayout::letter(1);
        page.add_image(7, Rect::new(120.0, 100.0, 500.0, 400.0));
        page.add_line("Fig. 3", Rect::new(120.0, 410.0, 160.0, 420.0));

        let outcome = build_clip(&page, &["Fig. 3".to_string()], &ClipConfig::default());
        assert_eq!(outcome.caption_rect_count, 1);
        assert_eq!(outcome.associated_count, 1);
        assert!(outcome.clip.is_applied());
    }
}
