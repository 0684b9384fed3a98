//! Figure detection and cropping engine.
//!
//! Everything here works on [`PageLayout`](crate::model::PageLayout)
//! snapshots and plain option values, so each step can be tested without a
//! PDF. Only [`render`] touches a raster backend.

pub mod caption;
pub mod clip;
pub mod embedded;
pub mod render;
pub mod select;
pub mod visual;

pub use caption::{
    caption_query, caption_rects, locate_captions, match_caption, match_figure_caption,
    match_queries, match_table_caption, CaptionMatch,
};
pub use clip::{associate, build_clip, compute_clip, Association, ClipOutcome, Side};
pub use embedded::{extract_embedded, passes_size_filter, EmbeddedImage};
pub use render::{
    clip_for_page, render_page, Capabilities, PdfiumRasterizer, RasterDocument, Rasterizer,
};
pub use select::select_pages;
pub use visual::{collect_visuals, has_visual_signal};
