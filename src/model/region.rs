//! Captions, visual regions and clip results.

use super::Rect;
use serde::{Deserialize, Serialize};

/// Figure or table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionKind {
    Figure,
    Table,
}

/// A text line that reads like a figure or table caption, with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCandidate {
    /// Page number (1-indexed)
    pub page: u32,

    /// Raw line text
    pub text: String,

    /// Line bounding box
    pub bbox: Rect,
}

/// Source of a visual region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    /// Placed raster image
    Image,
    /// Painted vector path
    Drawing,
}

/// An image or drawing large enough to count as figure/table content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualRegion {
    pub bbox: Rect,
    pub kind: VisualKind,
    pub area: f32,
}

impl VisualRegion {
    pub fn new(bbox: Rect, kind: VisualKind) -> Self {
        Self {
            bbox,
            kind,
            area: bbox.area(),
        }
    }
}

/// Rectangle used to crop a page render.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClipRegion {
    /// Crop the render to this rectangle
    Applied(Rect),
    /// Render the full page
    #[default]
    NotApplied,
}

impl ClipRegion {
    pub fn is_applied(&self) -> bool {
        matches!(self, ClipRegion::Applied(_))
    }

    /// The crop rectangle, if any.
    pub fn rect(&self) -> Option<Rect> {
        match self {
            ClipRegion::Applied(r) => Some(*r),
            ClipRegion::NotApplied => None,
        }
    }
}

/// Why a clip fell back to a full-page render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipFallback {
    /// No image or drawing passed the area thresholds
    NoVisualRegions,
    /// The computed crop was shorter than the minimum height ratio
    TooThin,
    /// The computed crop escaped the page rectangle
    OutOfBounds,
}

impl std::fmt::Display for ClipFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClipFallback::NoVisualRegions => "no visual regions",
            ClipFallback::TooThin => "crop too thin",
            ClipFallback::OutOfBounds => "crop outside page",
        };
        f.write_str(s)
    }
}
