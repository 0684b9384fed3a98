//! Visual region collection.

use std::collections::HashSet;

use crate::model::{PageLayout, VisualKind, VisualRegion};

/// Image placements and drawings covering at least the given fractions of
/// the page area, deduplicated by rounded bbox.
pub fn collect_visuals(
    page: &PageLayout,
    image_area_ratio: f32,
    drawing_area_ratio: f32,
) -> Vec<VisualRegion> {
    let page_area = page.area().max(1.0);
    let mut seen = HashSet::new();
    let mut regions = Vec::new();

    let images = page
        .images
        .iter()
        .map(|p| (p.bbox, VisualKind::Image, image_area_ratio));
    let drawings = page
        .drawings
        .iter()
        .map(|d| (*d, VisualKind::Drawing, drawing_area_ratio));

    for (bbox, kind, min_ratio) in images.chain(drawings) {
        if bbox.area() / page_area < min_ratio {
            continue;
        }
        if seen.insert(bbox.key()) {
            regions.push(VisualRegion::new(bbox, kind));
        }
    }
    regions
}

/// Whether a page carries anything figure-like.
///
/// Falls back to a raw drawing count for pages whose plots are built from
/// many small paths, none of which passes the area threshold alone.
pub fn has_visual_signal(
    page: &PageLayout,
    image_area_ratio: f32,
    drawing_area_ratio: f32,
    min_drawings: usize,
) -> bool {
    !collect_visuals(page, image_area_ratio, drawing_area_ratio).is_empty()
        || page.drawings.len() >= min_drawings
}
