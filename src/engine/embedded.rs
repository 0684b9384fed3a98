//! Embedded raster image extraction.

use std::collections::HashSet;

use crate::error::Result;
use crate::model::EmbeddedKey;
use crate::options::ExtractOptions;
use crate::parser::{DecodedImage, PdfBackend};

/// A decoded embedded image that passed the size filter.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub key: EmbeddedKey,
    pub image: DecodedImage,
}

/// Size filter; every bound is inclusive.
pub fn passes_size_filter(width: u32, height: u32, options: &ExtractOptions) -> bool {
    width >= options.embedded_min_width
        && height >= options.embedded_min_height
        && u64::from(width) * u64::from(height) >= options.embedded_min_area
}

/// Decode every embedded image large enough to keep and hand it to `sink`.
///
/// Images are numbered per page from 1 in resource order, counting the
/// ones filtered out. Pages in `skip` are passed over. A failure to decode
/// or to store one image drops that image only.
///
/// Returns the number of images delivered.
pub fn extract_embedded<B, F>(
    backend: &B,
    options: &ExtractOptions,
    skip: &HashSet<u32>,
    mut sink: F,
) -> usize
where
    B: PdfBackend + ?Sized,
    F: FnMut(EmbeddedImage) -> Result<()>,
{
    let mut delivered = 0;

    for page in 1..=backend.page_count() {
        if skip.contains(&page) {
            continue;
        }
        let infos = match backend.page_images(page) {
            Ok(infos) => infos,
            Err(e) => {
                log::warn!("Page {}: cannot list images: {}", page, e);
                continue;
            }
        };

        for (i, info) in infos.iter().enumerate() {
            if !passes_size_filter(info.width, info.height, options) {
                log::debug!(
                    "Page {}: image xref {} {}x{} below size thresholds",
                    page,
                    info.xref,
                    info.width,
                    info.height
                );
                continue;
            }

            let key = EmbeddedKey {
                page,
                index: i as u32 + 1,
                xref: info.xref,
            };
            let image = match backend.decode_image(info.xref) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Page {}: skipping image xref {}: {}", page, info.xref, e);
                    continue;
                }
            };

            match sink(EmbeddedImage { key, image }) {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!("Page {}: failed to store image xref {}: {}", page, info.xref, e),
            }
        }
    }

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::PageLayout;
    use crate::parser::{DocumentInfo, ImageInfo};
    use image::{DynamicImage, RgbImage};

    /// Backend serving image headers only; pixels are synthesized.
    struct FakeBackend {
        pages: Vec<Vec<ImageInfo>>,
    }

    fn info(xref: u32, width: u32, height: u32) -> ImageInfo {
        ImageInfo {
            xref,
            width,
            height,
            bits_per_component: 8,
            colorspace: "DeviceRGB".to_string(),
            filters: vec![],
        }
    }

    impl PdfBackend for FakeBackend {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_layout(&self, page: u32) -> Result<PageLayout> {
            Ok(PageLayout::letter(page))
        }

        fn page_text(&self, _page: u32) -> Result<String> {
            Ok(String::new())
        }

        fn page_images(&self, page: u32) -> Result<Vec<ImageInfo>> {
            Ok(self.pages[page as usize - 1].clone())
        }

        fn decode_image(&self, xref: u32) -> Result<DecodedImage> {
            if xref == 99 {
                return Err(Error::UnsupportedImage("JPXDecode".to_string()));
            }
            let info = self
                .pages
                .iter()
                .flatten()
                .find(|i| i.xref == xref)
                .ok_or_else(|| Error::PdfParse("missing".to_string()))?;
            Ok(DecodedImage {
                image: DynamicImage::ImageRgb8(RgbImage::new(info.width, info.height)),
                colorspace: "DeviceRGB".to_string(),
                alpha: false,
            })
        }

        fn info(&self) -> DocumentInfo {
            DocumentInfo::default()
        }
    }

    #[test]
    fn test_size_filter_inclusive() {
        let options = ExtractOptions::default();
        assert!(passes_size_filter(400, 300, &options));
        assert!(!passes_size_filter(399, 300, &options));
        assert!(!passes_size_filter(400, 299, &options));

        let options = ExtractOptions::new().with_embedded_min(10, 10, 400);
        assert!(passes_size_filter(20, 20, &options));
        assert!(!passes_size_filter(20, 19, &options));
    }

    #[test]
    fn test_extract_numbers_per_page() {
        let backend = FakeBackend {
            pages: vec![
                vec![info(4, 100, 100), info(5, 800, 600)],
                vec![info(9, 640, 480), info(99, 900, 900)],
            ],
        };
        let mut keys = Vec::new();
        let count = extract_embedded(&backend, &ExtractOptions::default(), &HashSet::new(), |img| {
            keys.push(img.key);
            Ok(())
        });

        assert_eq!(count, 2);
        assert_eq!(
            keys,
            vec![
                EmbeddedKey { page: 1, index: 2, xref: 5 },
                EmbeddedKey { page: 2, index: 1, xref: 9 },
            ]
        );
    }

    #[test]
    fn test_skip_pages_and_sink_failures() {
        let backend = FakeBackend {
            pages: vec![vec![info(5, 800, 600)], vec![info(9, 640, 480)]],
        };
        let skip: HashSet<u32> = [1].into_iter().collect();
        let mut seen = 0;
        let count = extract_embedded(&backend, &ExtractOptions::default(), &skip, |img| {
            seen += 1;
            assert_eq!(img.key.page, 2);
            Ok(())
        });
        assert_eq!((count, seen), (1, 1));

        let count = extract_embedded(&backend, &ExtractOptions::default(), &HashSet::new(), |_| {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        });
        assert_eq!(count, 0);
    }
}
