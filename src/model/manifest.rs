//! Image manifest records, the permanent output of an extraction run.

use super::Rect;
use crate::options::CropMode;
use serde::{Deserialize, Serialize};

/// Identity of a page render: which page, at what resolution, cropped or not.
///
/// Filenames are derived from this key only at the storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub page: u32,
    pub dpi: u32,
    pub cropped: bool,
}

impl RenderKey {
    /// File name for this render under `prefix`.
    pub fn file_name(&self, prefix: &str) -> String {
        let mut name = format!("{}_p{:03}_render_{}dpi", prefix, self.page, self.dpi);
        if self.cropped {
            name.push_str("_capcrop");
        }
        name.push_str(".png");
        name
    }
}

/// Identity of an extracted embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmbeddedKey {
    pub page: u32,
    pub index: u32,
    pub xref: u32,
}

impl EmbeddedKey {
    /// File name for this image under `prefix`.
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{}_p{:03}_img{:03}_xref{}.png",
            prefix, self.page, self.index, self.xref
        )
    }
}

/// An embedded raster image written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedEntry {
    pub page: u32,
    pub image_index: u32,
    pub xref: u32,
    pub ext: String,
    pub width: u32,
    pub height: u32,
    pub alpha: bool,
    pub colorspace: String,
    pub size_bytes: u64,
    pub path: String,
}

/// A rasterized (and possibly cropped) page written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEntry {
    pub page: u32,
    pub render_index: u32,
    pub dpi: u32,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub crop_mode: CropMode,
    pub crop_applied: bool,
    pub caption_rect_count: usize,
    pub clip_rect: Option<[f32; 4]>,
    pub path: String,
}

impl RenderEntry {
    /// The clip rectangle, if a crop was applied.
    pub fn clip(&self) -> Option<Rect> {
        self.clip_rect.map(|[x0, y0, x1, y1]| Rect::new(x0, y0, x1, y1))
    }
}

/// One manifest record, tagged by its `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ManifestEntry {
    Embedded(EmbeddedEntry),
    PageRender(RenderEntry),
}

impl ManifestEntry {
    pub fn page(&self) -> u32 {
        match self {
            ManifestEntry::Embedded(e) => e.page,
            ManifestEntry::PageRender(r) => r.page,
        }
    }

    /// Per-source index (`image_index` or `render_index`).
    pub fn index(&self) -> u32 {
        match self {
            ManifestEntry::Embedded(e) => e.image_index,
            ManifestEntry::PageRender(r) => r.render_index,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ManifestEntry::Embedded(e) => &e.path,
            ManifestEntry::PageRender(r) => &r.path,
        }
    }

    /// Manifest `source` value.
    pub fn source(&self) -> &'static str {
        match self {
            ManifestEntry::Embedded(_) => "embedded",
            ManifestEntry::PageRender(_) => "page_render",
        }
    }
}
