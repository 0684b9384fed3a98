//! Extraction options and configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which image sources a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageMode {
    /// Embedded raster images only
    Embedded,
    /// Page renders only
    Render,
    /// Both, with optional suppression of embedded images on rendered pages
    #[default]
    Hybrid,
}

impl ImageMode {
    pub fn extracts_embedded(self) -> bool {
        matches!(self, ImageMode::Embedded | ImageMode::Hybrid)
    }

    pub fn renders_pages(self) -> bool {
        matches!(self, ImageMode::Render | ImageMode::Hybrid)
    }
}

/// How pages are chosen for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FigurePages {
    /// Pages with caption lines, filtered by caption density
    #[default]
    Caption,
    /// Every page
    All,
}

/// Whether page renders are cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropMode {
    /// Always render the full page
    None,
    /// Crop to the caption-associated visual region when one is found
    #[default]
    CaptionAware,
}

impl std::fmt::Display for CropMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CropMode::None => f.write_str("none"),
            CropMode::CaptionAware => f.write_str("caption-aware"),
        }
    }
}

/// Where artifacts are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// `<output_dir>/<bundle_name>/...` with images under `images/`
    #[default]
    Bundle,
    /// `<output_dir>/<prefix>_<file>` with images under `<prefix>_images/`
    Flat,
}

/// Named thresholds for the clip builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// Margin added left, right and above the visual union (pt)
    pub caption_top_margin_pt: f32,

    /// Distance kept from the page bottom (pt)
    pub crop_bottom_margin_pt: f32,

    /// Minimum clip height as a fraction of page height
    pub min_crop_height_ratio: f32,

    /// Minimum image placement area as a fraction of page area
    pub image_area_ratio: f32,

    /// Minimum drawing area as a fraction of page area
    pub drawing_area_ratio: f32,

    /// Captions farther than this fraction of page height from every visual are ignored
    pub max_caption_gap_ratio: f32,

    /// Side tolerance as a fraction of page height
    pub side_tolerance_ratio: f32,

    /// Lower bound of the side tolerance (pt)
    pub min_side_tolerance_pt: f32,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            caption_top_margin_pt: 10.0,
            crop_bottom_margin_pt: 8.0,
            min_crop_height_ratio: 0.15,
            image_area_ratio: 0.002,
            drawing_area_ratio: 0.01,
            max_caption_gap_ratio: 0.25,
            side_tolerance_ratio: 0.01,
            min_side_tolerance_pt: 6.0,
        }
    }
}

impl ClipConfig {
    /// Side tolerance for a page of the given height.
    pub fn side_tolerance(&self, page_height: f32) -> f32 {
        self.min_side_tolerance_pt
            .max(self.side_tolerance_ratio * page_height)
    }
}

/// Options for a figure extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Image sources to produce
    pub image_mode: ImageMode,

    /// Page selection mode for renders
    pub figure_pages: FigurePages,

    /// Render resolution
    pub render_dpi: u32,

    /// Crop mode for renders
    pub crop_mode: CropMode,

    /// Clip builder thresholds
    #[serde(flatten)]
    pub clip: ClipConfig,

    /// Pages with more caption lines than this are presumed to be lists
    pub max_captions_per_render_page: usize,

    /// Minimum embedded image width (px)
    pub embedded_min_width: u32,

    /// Minimum embedded image height (px)
    pub embedded_min_height: u32,

    /// Minimum embedded image area (px²)
    pub embedded_min_area: u64,

    /// Keep embedded images on pages that are also rendered
    pub keep_embedded_on_rendered_pages: bool,

    /// Artifact layout
    pub layout: OutputLayout,

    /// Explicit bundle directory name
    pub bundle_name: Option<String>,

    /// Explicit file prefix
    pub prefix: Option<String>,

    /// Remove previous artifacts before writing
    pub clean: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image mode.
    pub fn with_image_mode(mut self, mode: ImageMode) -> Self {
        self.image_mode = mode;
        self
    }

    /// Set the figure page selection mode.
    pub fn with_figure_pages(mut self, pages: FigurePages) -> Self {
        self.figure_pages = pages;
        self
    }

    /// Set the render DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }

    /// Set the crop mode.
    pub fn with_crop_mode(mut self, mode: CropMode) -> Self {
        self.crop_mode = mode;
        self
    }

    /// Set the caption top margin in points.
    pub fn with_caption_top_margin(mut self, pt: f32) -> Self {
        self.clip.caption_top_margin_pt = pt;
        self
    }

    /// Set the crop bottom margin in points.
    pub fn with_crop_bottom_margin(mut self, pt: f32) -> Self {
        self.clip.crop_bottom_margin_pt = pt;
        self
    }

    /// Set the minimum crop height ratio.
    pub fn with_min_crop_height_ratio(mut self, ratio: f32) -> Self {
        self.clip.min_crop_height_ratio = ratio;
        self
    }

    /// Set the caption density limit for render pages.
    pub fn with_max_captions(mut self, max: usize) -> Self {
        self.max_captions_per_render_page = max;
        self
    }

    /// Set the embedded image size thresholds.
    pub fn with_embedded_min(mut self, width: u32, height: u32, area: u64) -> Self {
        self.embedded_min_width = width;
        self.embedded_min_height = height;
        self.embedded_min_area = area;
        self
    }

    /// Keep embedded images on rendered pages.
    pub fn keep_embedded_on_rendered_pages(mut self, keep: bool) -> Self {
        self.keep_embedded_on_rendered_pages = keep;
        self
    }

    /// Set the artifact layout.
    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set an explicit bundle name.
    pub fn with_bundle_name(mut self, name: impl Into<String>) -> Self {
        self.bundle_name = Some(name.into());
        self
    }

    /// Set an explicit file prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Remove previous artifacts first.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Render scale factor, never below 1.
    pub fn render_scale(&self) -> f32 {
        (self.render_dpi as f32 / 72.0).max(1.0)
    }

    /// Reject values outside their accepted domain.
    pub fn validate(&self) -> Result<()> {
        if self.render_dpi == 0 {
            return Err(Error::InvalidOption("render_dpi must be positive".into()));
        }
        let ratios = [
            ("min_crop_height_ratio", self.clip.min_crop_height_ratio),
            ("image_area_ratio", self.clip.image_area_ratio),
            ("drawing_area_ratio", self.clip.drawing_area_ratio),
            ("max_caption_gap_ratio", self.clip.max_caption_gap_ratio),
            ("side_tolerance_ratio", self.clip.side_tolerance_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidOption(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        let margins = [
            ("caption_top_margin_pt", self.clip.caption_top_margin_pt),
            ("crop_bottom_margin_pt", self.clip.crop_bottom_margin_pt),
        ];
        for (name, value) in margins {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidOption(format!(
                    "{} must be a finite, non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            image_mode: ImageMode::Hybrid,
            figure_pages: FigurePages::Caption,
            render_dpi: 220,
            crop_mode: CropMode::CaptionAware,
            clip: ClipConfig::default(),
            max_captions_per_render_page: 6,
            embedded_min_width: 400,
            embedded_min_height: 300,
            embedded_min_area: 120_000,
            keep_embedded_on_rendered_pages: false,
            layout: OutputLayout::Bundle,
            bundle_name: None,
            prefix: None,
            clean: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExtractOptions::default();
        assert_eq!(options.image_mode, ImageMode::Hybrid);
        assert_eq!(options.figure_pages, FigurePages::Caption);
        assert_eq!(options.render_dpi, 220);
        assert_eq!(options.crop_mode, CropMode::CaptionAware);
        assert_eq!(options.clip.caption_top_margin_pt, 10.0);
        assert_eq!(options.clip.crop_bottom_margin_pt, 8.0);
        assert_eq!(options.max_captions_per_render_page, 6);
        assert_eq!(options.embedded_min_area, 120_000);
        assert!(!options.keep_embedded_on_rendered_pages);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_extract_options_builder() {
        let options = ExtractOptions::new()
            .with_dpi(300)
            .with_image_mode(ImageMode::Render)
            .with_crop_mode(CropMode::None)
            .with_caption_top_margin(12.0)
            .with_embedded_min(10, 20, 200)
            .with_prefix("p");

        assert_eq!(options.render_dpi, 300);
        assert!(!options.image_mode.extracts_embedded());
        assert!(options.image_mode.renders_pages());
        assert_eq!(options.clip.caption_top_margin_pt, 12.0);
        assert_eq!(options.embedded_min_height, 20);
        assert_eq!(options.prefix.as_deref(), Some("p"));
    }

    #[test]
    fn test_render_scale_floor() {
        assert_eq!(ExtractOptions::new().with_dpi(36).render_scale(), 1.0);
        assert_eq!(ExtractOptions::new().with_dpi(144).render_scale(), 2.0);
    }

    #[test]
    fn test_side_tolerance() {
        let clip = ClipConfig::default();
        assert_eq!(clip.side_tolerance(300.0), 6.0);
        assert!((clip.side_tolerance(1000.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ExtractOptions::new().with_dpi(0).validate().is_err());
        let err = ExtractOptions::new()
            .with_min_crop_height_ratio(1.5)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
        assert!(ExtractOptions::new().with_min_crop_height_ratio(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_margins() {
        assert!(ExtractOptions::new().with_caption_top_margin(-1.0).validate().is_err());
        assert!(ExtractOptions::new().with_caption_top_margin(f32::NAN).validate().is_err());
        assert!(ExtractOptions::new().with_crop_bottom_margin(f32::NAN).validate().is_err());
        assert!(ExtractOptions::new().with_crop_bottom_margin(f32::INFINITY).validate().is_err());
        assert!(ExtractOptions::new().with_caption_top_margin(0.0).validate().is_ok());
    }

    #[test]
    fn test_options_serialize_kebab_case() {
        let json = serde_json::to_value(ExtractOptions::default()).unwrap();
        assert_eq!(json["image_mode"], "hybrid");
        assert_eq!(json["crop_mode"], "caption-aware");
        assert_eq!(json["render_dpi"], 220);
        assert_eq!(json["caption_top_margin_pt"], 10.0);
    }
}
