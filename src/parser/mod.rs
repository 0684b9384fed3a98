//! PDF parsing module.

mod backend;
mod content;
mod images;
mod layout;

pub use backend::{DocumentInfo, LopdfBackend, PdfBackend};
pub use content::{decode_text_simple, ContentScan, ContentScanner, Matrix};
pub use images::{decode_image, image_info, DecodedImage, ImageInfo};
pub use layout::{
    build_lines, find_gutter, group_spans_into_lines, is_spaceless_script_char,
    PageBox, TextLine, TextSpan,
};
