//! Page rasterization.
//!
//! Rendering goes through the [`Rasterizer`] capability so that extraction
//! keeps working (without renders) when no raster library can be bound.

use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;
use serde::Serialize;

use super::clip::{build_clip, ClipOutcome};
use crate::error::{Error, Result};
use crate::model::{ClipRegion, PageLayout, Rect};
use crate::options::{CropMode, ExtractOptions};

/// Capability flags recorded with every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// Page layout (text lines, image placements, drawings) is available
    pub geometry: bool,
    /// Pages can be rasterized
    pub raster: bool,
}

/// A source of page rasters.
pub trait Rasterizer {
    /// Open a document for rendering.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RasterDocument + 'a>>;
}

/// An open document that renders pages.
pub trait RasterDocument {
    fn page_count(&self) -> u32;

    /// Render a page (1-indexed) at `scale` pixels per point, cropped to
    /// `clip` when given.
    ///
    /// The raster shows the page as displayed, with `/Rotate` applied, and
    /// `clip` is expressed in that space (top-left origin).
    fn rasterize(&self, page: u32, scale: f32, clip: Option<&Rect>) -> Result<DynamicImage>;
}

/// [`Rasterizer`] backed by a runtime-bound PDFium library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind PDFium from the working directory, else from the system.
    pub fn bind() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Bind PDFium, logging and returning `None` when unavailable.
    pub fn probe() -> Option<Self> {
        match Self::bind() {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                log::info!("PDFium not available, page renders disabled: {}", e);
                None
            }
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RasterDocument + 'a>> {
        let document = self.pdfium.load_pdf_from_file(path, None)?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> u32 {
        self.document.pages().len() as u32
    }

    fn rasterize(&self, page: u32, scale: f32, clip: Option<&Rect>) -> Result<DynamicImage> {
        let count = self.page_count();
        if page == 0 || page > count {
            return Err(Error::PageOutOfRange(page, count));
        }
        let index = (page - 1)
            .try_into()
            .map_err(|_| Error::PageOutOfRange(page, count))?;
        let pdf_page = self.document.pages().get(index)?;

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .render_form_data(true)
            .render_annotations(true);
        let image = pdf_page.render_with_config(&config)?.as_image();

        Ok(match clip {
            Some(rect) => crop_to(&image, rect, scale),
            None => image,
        })
    }
}

/// Pixel window of a page-space rectangle, clamped to the image.
pub fn pixel_window(rect: &Rect, scale: f32, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let clamp_x = |v: f32| (v.max(0.0) as u32).min(width);
    let clamp_y = |v: f32| (v.max(0.0) as u32).min(height);
    let x0 = clamp_x((rect.x0 * scale).floor());
    let y0 = clamp_y((rect.y0 * scale).floor());
    let x1 = clamp_x((rect.x1 * scale).ceil()).max(x0 + 1).min(width);
    let y1 = clamp_y((rect.y1 * scale).ceil()).max(y0 + 1).min(height);
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

fn crop_to(image: &DynamicImage, rect: &Rect, scale: f32) -> DynamicImage {
    let (x, y, w, h) = pixel_window(rect, scale, image.width(), image.height());
    if w == 0 || h == 0 {
        return image.clone();
    }
    image.crop_imm(x, y, w, h)
}

/// Clip decision for a page render.
///
/// A page without layout renders in full; caption queries are consulted
/// only when the page has no caption line of its own.
pub fn clip_for_page(
    layout: Option<&PageLayout>,
    queries: &[String],
    options: &ExtractOptions,
) -> ClipOutcome {
    match (options.crop_mode, layout) {
        (CropMode::None, _) | (_, None) => ClipOutcome::disabled(),
        (CropMode::CaptionAware, Some(layout)) => build_clip(layout, queries, &options.clip),
    }
}

/// Render one page according to a clip decision.
pub fn render_page(
    document: &dyn RasterDocument,
    page: u32,
    clip: &ClipRegion,
    options: &ExtractOptions,
) -> Result<DynamicImage> {
    let image = document.rasterize(page, options.render_scale(), clip.rect().as_ref())?;
    log::debug!(
        "Rendered page {} at {} dpi: {}x{}{}",
        page,
        options.render_dpi,
        image.width(),
        image.height(),
        if clip.is_applied() { " (cropped)" } else { "" }
    );
    Ok(image)
}
