//! Error types for paperfigs.

use std::io;
use thiserror::Error;

/// Result type alias for paperfigs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting figures from a PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the document or writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input does not start with a PDF header.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// An embedded image could not be decoded or encoded.
    #[error("Image error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// An embedded image uses an encoding we cannot decode.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// The raster backend failed to render a page.
    #[error("Rasterization error: {0}")]
    Raster(String),

    /// Serializing an artifact failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An option value is out of its accepted domain.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<pdfium_render::prelude::PdfiumError> for Error {
    fn from(err: pdfium_render::prelude::PdfiumError) -> Self {
        Error::Raster(format!("{:?}", err))
    }
}
