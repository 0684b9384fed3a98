//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the page geometry and text the
//! engine consumes, isolating the concrete PDF library (lopdf).

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use serde::Serialize;

use super::content::{decode_text_simple, get_number, resolve_dict, stream_content, ContentScanner};
use super::images::{decode_image, image_info, DecodedImage, ImageInfo};
use super::layout::{build_lines, PageBox};
use crate::error::{Error, Result};
use crate::model::PageLayout;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Header bytes searched for the magic (some producers prepend junk).
const HEADER_WINDOW: usize = 1024;

/// Document information dictionary and file facts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentInfo {
    /// PDF version (e.g. "1.7")
    pub version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub created: Option<chrono::DateTime<chrono::Utc>>,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
    /// Every info entry rendered as text
    pub entries: BTreeMap<String, String>,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page geometry, page text and embedded images
/// without exposing any concrete PDF library types.
pub trait PdfBackend {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Text lines, image placements and drawings of a page (1-indexed).
    fn page_layout(&self, page: u32) -> Result<PageLayout>;

    /// Plain text of a page as produced by the text extractor.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Raster image XObjects referenced by a page, in resource order.
    fn page_images(&self, page: u32) -> Result<Vec<ImageInfo>>;

    /// Decode the image XObject with the given object number.
    fn decode_image(&self, xref: u32) -> Result<DecodedImage>;

    /// Document information.
    fn info(&self) -> DocumentInfo;
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        check_header(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self::from_document(doc))
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        let pages = doc.get_pages();
        Self { doc, pages }
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.pages.len() as u32))
    }

    /// Visible page area: CropBox, else MediaBox, else Letter.
    fn page_box(&self, page_id: ObjectId) -> PageBox {
        [b"CropBox".as_slice(), b"MediaBox".as_slice()]
            .iter()
            .find_map(|key| {
                let obj = self.resolve_inherited(page_id, key)?;
                let arr = match obj {
                    Object::Reference(id) => self.doc.get_object(*id).ok()?.as_array().ok()?,
                    other => other.as_array().ok()?,
                };
                if arr.len() < 4 {
                    return None;
                }
                let v: Vec<f32> = arr.iter().filter_map(get_number).collect();
                let page_box = PageBox::new(*v.first()?, *v.get(1)?, *v.get(2)?, *v.get(3)?);
                (page_box.width() > 0.0 && page_box.height() > 0.0).then_some(page_box)
            })
            .unwrap_or_else(PageBox::letter)
    }

    /// Page rotation normalized to 0, 90, 180 or 270.
    fn page_rotation(&self, page_id: ObjectId) -> u16 {
        self.resolve_inherited(page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .map(|r| r.rem_euclid(360) as u16 / 90 * 90)
            .unwrap_or(0)
    }

    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        self.resolve_inherited(page_id, b"Resources")
            .and_then(|obj| resolve_dict(&self.doc, obj))
    }

    /// Look up a page attribute, following /Parent for inheritable keys.
    fn resolve_inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current_id = page_id;
        // Bounded walk guards against /Parent cycles.
        for _ in 0..64 {
            let dict = self.doc.get_dictionary(current_id).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(obj) => obj,
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => stream_content(s),
                Object::Array(arr) => self.concat_streams(arr),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => self.concat_streams(arr),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for obj in refs {
            if let Ok(r) = obj.as_reference() {
                if let Ok(Object::Stream(s)) = self.doc.get_object(r) {
                    match stream_content(s) {
                        Ok(data) => {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                        Err(e) => log::warn!("Skipping unreadable content stream {:?}: {}", r, e),
                    }
                }
            }
        }
        Ok(content)
    }

    /// Collect image XObjects reachable from a resource dictionary,
    /// descending into form XObjects.
    fn collect_images(
        &self,
        resources: &Dictionary,
        seen: &mut HashSet<ObjectId>,
        out: &mut Vec<ImageInfo>,
        depth: usize,
    ) {
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve_dict(&self.doc, x))
        else {
            return;
        };

        for (_, obj) in xobjects.iter() {
            let Ok(id) = obj.as_reference() else { continue };
            if !seen.insert(id) {
                continue;
            }
            let Ok(stream) = self.doc.get_object(id).and_then(Object::as_stream) else {
                continue;
            };
            match stream.dict.get(b"Subtype").and_then(Object::as_name).ok() {
                Some(b"Image") => out.push(image_info(id.0, stream)),
                Some(b"Form") if depth < 8 => {
                    if let Some(form_resources) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|r| resolve_dict(&self.doc, r))
                    {
                        self.collect_images(form_resources, seen, out, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_layout(&self, page: u32) -> Result<PageLayout> {
        let page_id = self.page_id(page)?;
        let page_box = self.page_box(page_id);
        let content = self.page_content(page_id)?;
        let scan = ContentScanner::new(&self.doc).scan(&content, self.page_resources(page_id))?;

        let mut layout = PageLayout::new(page, page_box.width(), page_box.height());
        layout.rotation = self.page_rotation(page_id);
        layout.lines = build_lines(scan.spans, &page_box);
        for (xref, bbox) in scan.images {
            layout.add_image(xref, page_box.to_page_rect(&bbox));
        }
        for bbox in scan.drawings {
            layout.add_drawing(page_box.to_page_rect(&bbox));
        }

        log::debug!(
            "Page {}: {} lines, {} images, {} drawings",
            page,
            layout.lines.len(),
            layout.images.len(),
            layout.drawings.len()
        );
        Ok(layout)
    }

    fn page_text(&self, page: u32) -> Result<String> {
        self.page_id(page)?;
        Ok(self.doc.extract_text(&[page])?)
    }

    fn page_images(&self, page: u32) -> Result<Vec<ImageInfo>> {
        let page_id = self.page_id(page)?;
        let mut out = Vec::new();
        if let Some(resources) = self.page_resources(page_id) {
            let mut seen = HashSet::new();
            self.collect_images(resources, &mut seen, &mut out, 0);
        }
        Ok(out)
    }

    fn decode_image(&self, xref: u32) -> Result<DecodedImage> {
        let stream = self.doc.get_object((xref, 0))?.as_stream()?;
        decode_image(&self.doc, stream)
    }

    fn info(&self) -> DocumentInfo {
        let mut info = DocumentInfo {
            version: self.doc.version.to_string(),
            ..Default::default()
        };

        let Some(dict) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| resolve_dict(&self.doc, obj))
        else {
            return info;
        };

        info.title = get_string_from_dict(dict, b"Title");
        info.author = get_string_from_dict(dict, b"Author");
        info.subject = get_string_from_dict(dict, b"Subject");
        info.keywords = get_string_from_dict(dict, b"Keywords");
        info.creator = get_string_from_dict(dict, b"Creator");
        info.producer = get_string_from_dict(dict, b"Producer");
        info.created = get_string_from_dict(dict, b"CreationDate").and_then(|s| parse_pdf_date(&s));
        info.modified = get_string_from_dict(dict, b"ModDate").and_then(|s| parse_pdf_date(&s));

        for (key, _) in dict.iter() {
            if let Some(value) = get_string_from_dict(dict, key) {
                info.entries
                    .insert(format!("/{}", String::from_utf8_lossy(key)), value);
            }
        }
        info
    }
}

/// Reject input that does not carry a PDF header.
fn check_header(data: &[u8]) -> Result<()> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        Ok(())
    } else {
        Err(Error::UnknownFormat)
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}
