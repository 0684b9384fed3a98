//! # paperfigs
//!
//! Caption-aware figure and table extraction from scientific PDFs.
//!
//! Given a paper, paperfigs finds the pages that carry figures or tables,
//! renders them cropped to the caption's visual region, pulls out large
//! embedded raster images and writes a manifest describing every image.
//!
//! ## Quick Start
//!
//! ```no_run
//! use paperfigs::{extract_file, ExtractOptions};
//!
//! fn main() -> paperfigs::Result<()> {
//!     let options = ExtractOptions::new().with_dpi(300);
//!     let report = extract_file("paper.pdf", "out", options)?;
//!
//!     for entry in &report.manifest {
//!         println!("page {} -> {}", entry.page(), entry.path());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## How crops are found
//!
//! - **Page selection**: pages with caption lines in their text, minus
//!   caption-dense pages such as lists of figures
//! - **Captions**: `Figure 3:`, `Fig. 2.`, `TABLE 1 ...` lines located on the
//!   page, or search hits for the caption key when the line itself is split
//! - **Visuals**: placed images and painted vector paths above an area ratio
//! - **Association**: each caption takes the larger-area side (above or below)
//! - **Fallbacks**: thin or out-of-page crops render the full page instead
//!
//! Rendering needs the PDFium shared library at runtime. Without it, runs
//! still produce text artifacts and embedded images.

pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod options;
pub mod output;
pub mod parser;
pub mod scan;

// Re-export commonly used types
pub use engine::{Capabilities, ClipOutcome, PdfiumRasterizer, RasterDocument, Rasterizer};
pub use error::{Error, Result};
pub use extract::{ExtractionPlan, ExtractionReport, Extractor, PagePlan, RunNames};
pub use model::{
    CaptionCandidate, CaptionKind, ClipFallback, ClipRegion, EmbeddedEntry, ManifestEntry,
    PageLayout, PageSelection, Rect, RenderEntry, SelectionTier, VisualKind, VisualRegion,
};
pub use options::{ClipConfig, CropMode, ExtractOptions, FigurePages, ImageMode, OutputLayout};
pub use parser::{DocumentInfo, LopdfBackend, PdfBackend};
pub use scan::{CaptionLine, CaptionScan};

use std::path::Path;

/// Extract figures from a PDF file into `output_dir`.
///
/// Binds PDFium for page renders when it is available.
///
/// # Example
///
/// ```no_run
/// use paperfigs::{extract_file, ExtractOptions, OutputLayout};
///
/// let options = ExtractOptions::new().with_layout(OutputLayout::Flat);
/// let report = extract_file("paper.pdf", ".", options).unwrap();
/// println!("{} images", report.manifest.len());
/// ```
pub fn extract_file<P: AsRef<Path>, Q: AsRef<Path>>(
    pdf_path: P,
    output_dir: Q,
    options: ExtractOptions,
) -> Result<ExtractionReport> {
    Extractor::new(options).run(pdf_path, output_dir)
}

/// Compute page selection and crop decisions without rendering.
pub fn plan_file<P: AsRef<Path>>(pdf_path: P, options: ExtractOptions) -> Result<ExtractionPlan> {
    Extractor::without_rasterizer(options).plan(pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_file(
            dir.path().join("missing.pdf"),
            dir.path(),
            ExtractOptions::new().with_image_mode(ImageMode::Embedded),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_extract_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.pdf");
        std::fs::write(&path, "<!DOCTYPE html><html></html>").unwrap();
        let result = plan_file(&path, ExtractOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let result = plan_file("paper.pdf", ExtractOptions::new().with_dpi(0));
        assert!(matches!(result, Err(Error::InvalidOption(_))));
    }
}
