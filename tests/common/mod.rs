//! Synthetic papers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use paperfigs::engine::render::pixel_window;
use paperfigs::{RasterDocument, Rasterizer, Rect};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const TITLE: &str = "Caption Aware Figure Extraction";
pub const FIGURE_CAPTION: &str = "Figure 1: Overview of the pipeline";
pub const TABLE_CAPTION: &str = "Table 1: Results on all datasets";

/// One text line per BT/ET block at baseline `y` (PDF user space).
fn text_ops(lines: &[(f32, &str)]) -> String {
    lines
        .iter()
        .map(|(y, text)| format!("BT /F1 10 Tf 100 {} Td ({}) Tj ET\n", y, text))
        .collect()
}

/// Three-page paper:
///
/// 1. prose mentioning Figure 1
/// 2. a 500x400 image placed at (100, 400)-(500, 700) with its caption below
/// 3. a table caption and no visuals
pub fn paper() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let image_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 500i64,
            "Height" => 400i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8i64,
        },
        vec![128u8; 500 * 400],
    )));
    let text_resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let figure_resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im0" => image_id },
    });

    let contents = [
        (
            text_resources,
            text_ops(&[
                (720.0, "Introduction"),
                (700.0, "As Figure 1 shows, the pipeline has three stages."),
            ]),
        ),
        (
            figure_resources,
            format!(
                "q 400 0 0 300 100 400 cm /Im0 Do Q\n{}",
                text_ops(&[(370.0, FIGURE_CAPTION), (300.0, "The pipeline is shown above.")])
            ),
        ),
        (
            text_resources,
            text_ops(&[(720.0, TABLE_CAPTION), (700.0, "Accuracy improves on every dataset.")]),
        ),
    ];

    let mut kids: Vec<Object> = Vec::new();
    for (resources_id, content) in contents {
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.into_bytes(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(TITLE.as_bytes().to_vec(), StringFormat::Literal),
        "Author" => Object::String(b"A. Author".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Info", info_id);
    doc
}

/// Set `/Rotate` on one page (1-indexed).
pub fn rotate_page(doc: &mut Document, page: u32, degrees: i64) {
    let page_id = doc.get_pages()[&page];
    doc.get_dictionary_mut(page_id).unwrap().set("Rotate", degrees);
}

/// Save `doc` as `name` under `dir`.
pub fn write_pdf(doc: &mut Document, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Rasterizer producing blank pages of the page's point size times `scale`.
pub struct BlankRasterizer {
    pub pages: u32,
}

impl Rasterizer for BlankRasterizer {
    fn open<'a>(&'a self, _path: &Path) -> paperfigs::Result<Box<dyn RasterDocument + 'a>> {
        Ok(Box::new(BlankDocument { pages: self.pages }))
    }
}

struct BlankDocument {
    pages: u32,
}

impl RasterDocument for BlankDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn rasterize(&self, page: u32, scale: f32, clip: Option<&Rect>) -> paperfigs::Result<DynamicImage> {
        if page == 0 || page > self.pages {
            return Err(paperfigs::Error::PageOutOfRange(page, self.pages));
        }
        let width = (PAGE_WIDTH * scale).ceil() as u32;
        let height = (PAGE_HEIGHT * scale).ceil() as u32;
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255])));
        Ok(match clip {
            Some(rect) => {
                let (x, y, w, h) = pixel_window(rect, scale, width, height);
                image.crop_imm(x, y, w, h)
            }
            None => image,
        })
    }
}

/// Rasterizer whose documents fail to render one page.
pub struct FailingPageRasterizer {
    pub pages: u32,
    pub fail_page: u32,
}

impl Rasterizer for FailingPageRasterizer {
    fn open<'a>(&'a self, _path: &Path) -> paperfigs::Result<Box<dyn RasterDocument + 'a>> {
        Ok(Box::new(FailingPageDocument {
            inner: BlankDocument { pages: self.pages },
            fail_page: self.fail_page,
        }))
    }
}

struct FailingPageDocument {
    inner: BlankDocument,
    fail_page: u32,
}

impl RasterDocument for FailingPageDocument {
    fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    fn rasterize(&self, page: u32, scale: f32, clip: Option<&Rect>) -> paperfigs::Result<DynamicImage> {
        if page == self.fail_page {
            return Err(paperfigs::Error::Raster(format!("page {} is damaged", page)));
        }
        self.inner.rasterize(page, scale, clip)
    }
}

/// Rasterizer that cannot open anything.
pub struct BrokenRasterizer;

impl Rasterizer for BrokenRasterizer {
    fn open<'a>(&'a self, _path: &Path) -> paperfigs::Result<Box<dyn RasterDocument + 'a>> {
        Err(paperfigs::Error::Raster("no raster backend".to_string()))
    }
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}
