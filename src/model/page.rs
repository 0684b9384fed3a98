//! Page-level geometry snapshot.

use super::Rect;
use serde::{Deserialize, Serialize};

/// A single text line with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutLine {
    /// Line text, spans joined in reading order
    pub text: String,

    /// Bounding box in page space
    pub bbox: Rect,
}

impl LayoutLine {
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Placement of an embedded raster image on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlacement {
    /// Object number of the image XObject
    pub xref: u32,

    /// Where the unit square lands after the current transformation
    pub bbox: Rect,
}

/// Immutable view of one page: text lines, image placements and vector drawings.
///
/// All rectangles use a top-left origin in PDF points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: u16,

    /// Text lines in reading order
    pub lines: Vec<LayoutLine>,

    /// Embedded image placements in paint order
    pub images: Vec<ImagePlacement>,

    /// Bounding boxes of painted vector paths
    pub drawings: Vec<Rect>,
}

impl PageLayout {
    /// Create an empty page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            rotation: 0,
            lines: Vec::new(),
            images: Vec::new(),
            drawings: Vec::new(),
        }
    }

    /// Create an empty page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0) // 8.5 * 72, 11 * 72
    }

    /// The full page rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Page area in square points, never below 1.
    pub fn area(&self) -> f32 {
        (self.width * self.height).max(1.0)
    }

    /// Add a text line.
    pub fn add_line(&mut self, text: impl Into<String>, bbox: Rect) {
        self.lines.push(LayoutLine::new(text, bbox));
    }

    /// Add an image placement.
    pub fn add_image(&mut self, xref: u32, bbox: Rect) {
        self.images.push(ImagePlacement { xref, bbox });
    }

    /// Add a vector drawing bounding box.
    pub fn add_drawing(&mut self, bbox: Rect) {
        self.drawings.push(bbox);
    }

    /// Map a rectangle from layout space onto the page as displayed.
    ///
    /// `/Rotate` turns the page clockwise, so a rasterizer hands back a
    /// `height x width` image for quarter turns.
    pub fn to_display(&self, r: &Rect) -> Rect {
        let (w, h) = (self.width, self.height);
        match self.rotation {
            90 => Rect::new(h - r.y1, r.x0, h - r.y0, r.x1),
            180 => Rect::new(w - r.x1, h - r.y1, w - r.x0, h - r.y0),
            270 => Rect::new(r.y0, w - r.x1, r.y1, w - r.x0),
            _ => *r,
        }
    }

    /// Find every occurrence of `query` and return approximate hit boxes.
    ///
    /// Matching is case-insensitive. A hit's horizontal extent is interpolated
    /// from the character offsets within its line.
    pub fn search(&self, query: &str) -> Vec<Rect> {
        let needle: Vec<char> = query.trim().to_lowercase().chars().collect();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for line in &self.lines {
            let hay: Vec<char> = line.text.to_lowercase().chars().collect();
            if hay.len() < needle.len() {
                continue;
            }
            let char_width = line.bbox.width() / hay.len() as f32;
            let mut start = 0;
            while start + needle.len() <= hay.len() {
                if hay[start..start + needle.len()] == needle[..] {
                    let x0 = line.bbox.x0 + start as f32 * char_width;
                    let x1 = x0 + needle.len() as f32 * char_width;
                    hits.push(Rect::new(x0, line.bbox.y0, x1, line.bbox.y1));
                    start += needle.len();
                } else {
                    start += 1;
                }
            }
        }
        hits
    }
}
