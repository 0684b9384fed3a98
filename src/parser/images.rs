//! Embedded raster image decoding.
//!
//! Turns image XObject streams into `DynamicImage`s. Supported encodings are
//! DCT (JPEG) and raw samples behind Flate/LZW or no filter; anything else is
//! reported as unsupported so the caller can skip the item.

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use lopdf::{Document as LopdfDocument, Object, Stream};

use super::content::{get_number, stream_content};
use crate::error::{Error, Result};

/// Header facts about an image XObject, read without decoding pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Object number
    pub xref: u32,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    /// Color space family name (e.g. "DeviceRGB", "ICCBased")
    pub colorspace: String,
    /// Filter chain, outermost first
    pub filters: Vec<String>,
}

/// A decoded image ready to be written out.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Color space of the stored pixels ("DeviceGray" or "DeviceRGB")
    pub colorspace: String,
    /// Whether a soft mask was applied
    pub alpha: bool,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Resolved color space of raw samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup into a Gray/RGB/CMYK base
    Indexed {
        base: Box<ColorModel>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
            ColorModel::Indexed { .. } => 1,
        }
    }
}

/// Read the header of an image XObject.
pub fn image_info(xref: u32, stream: &Stream) -> ImageInfo {
    let dict = &stream.dict;

    let image_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let colorspace = if image_mask {
        "ImageMask".to_string()
    } else {
        match dict.get(b"ColorSpace") {
            Ok(Object::Name(n)) => String::from_utf8_lossy(n).to_string(),
            Ok(Object::Array(arr)) => arr
                .first()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_default(),
            Ok(Object::Reference(_)) => "Indirect".to_string(),
            _ => String::new(),
        }
    };

    ImageInfo {
        xref,
        width: dict_int(dict, b"Width").unwrap_or(0).max(0) as u32,
        height: dict_int(dict, b"Height").unwrap_or(0).max(0) as u32,
        bits_per_component: if image_mask {
            1
        } else {
            dict_int(dict, b"BitsPerComponent").unwrap_or(8).clamp(1, 16) as u8
        },
        colorspace,
        filters: filter_names(stream),
    }
}

fn dict_int(dict: &lopdf::Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|o| o.as_i64().ok())
}

fn filter_names(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode an image XObject to pixels, applying a matching soft mask.
pub fn decode_image(doc: &LopdfDocument, stream: &Stream) -> Result<DecodedImage> {
    let info = image_info(0, stream);
    let base = decode_base(doc, stream, &info)?;

    let mask = stream
        .dict
        .get(b"SMask")
        .ok()
        .and_then(|o| o.as_reference().ok())
        .and_then(|id| doc.get_object(id).ok())
        .and_then(|o| o.as_stream().ok());

    if let Some(mask_stream) = mask {
        let mask_info = image_info(0, mask_stream);
        match decode_base(doc, mask_stream, &mask_info) {
            Ok(mask)
                if mask.image.width() == base.image.width()
                    && mask.image.height() == base.image.height() =>
            {
                return Ok(apply_mask(base, &mask.image.to_luma8()));
            }
            Ok(_) => log::debug!("Soft mask size differs from image, ignoring"),
            Err(e) => log::debug!("Soft mask not decodable: {}", e),
        }
    }

    Ok(base)
}

fn decode_base(doc: &LopdfDocument, stream: &Stream, info: &ImageInfo) -> Result<DecodedImage> {
    if info.width == 0 || info.height == 0 {
        return Err(Error::UnsupportedImage("zero-sized image".to_string()));
    }

    let filters: Vec<&str> = info.filters.iter().map(String::as_str).collect();
    match filters.as_slice() {
        ["DCTDecode"] | ["DCT"] => {
            let image = image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)?;
            Ok(normalize(image))
        }
        _ if filters
            .iter()
            .all(|f| matches!(*f, "FlateDecode" | "Fl" | "LZWDecode" | "LZW")) =>
        {
            let data = stream_content(stream)?;
            let model = if info.colorspace == "ImageMask" {
                ColorModel::Gray
            } else {
                resolve_color_model(doc, stream.dict.get(b"ColorSpace").ok())?
            };
            let mut image = decode_samples(&data, info, &model)?;
            if decode_inverted(stream) {
                image.invert();
            }
            Ok(normalize(image))
        }
        _ => Err(Error::UnsupportedImage(info.filters.join("+"))),
    }
}

/// Reduce to 8-bit Gray or RGB.
fn normalize(image: DynamicImage) -> DecodedImage {
    let (image, colorspace) = match image {
        DynamicImage::ImageLuma8(_) => (image, "DeviceGray"),
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            (DynamicImage::ImageLuma8(image.to_luma8()), "DeviceGray")
        }
        DynamicImage::ImageRgb8(_) => (image, "DeviceRGB"),
        other => (DynamicImage::ImageRgb8(other.to_rgb8()), "DeviceRGB"),
    };
    DecodedImage {
        image,
        colorspace: colorspace.to_string(),
        alpha: false,
    }
}

fn apply_mask(base: DecodedImage, mask: &GrayImage) -> DecodedImage {
    let image = match base.image {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = GrayAlphaImage::new(gray.width(), gray.height());
            for (x, y, px) in out.enumerate_pixels_mut() {
                *px = image::LumaA([gray.get_pixel(x, y).0[0], mask.get_pixel(x, y).0[0]]);
            }
            DynamicImage::ImageLumaA8(out)
        }
        other => {
            let rgb = other.to_rgb8();
            let mut out = RgbaImage::new(rgb.width(), rgb.height());
            for (x, y, px) in out.enumerate_pixels_mut() {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                *px = image::Rgba([r, g, b, mask.get_pixel(x, y).0[0]]);
            }
            DynamicImage::ImageRgba8(out)
        }
    };
    DecodedImage {
        image,
        colorspace: base.colorspace,
        alpha: true,
    }
}

fn decode_inverted(stream: &Stream) -> bool {
    match stream.dict.get(b"Decode") {
        Ok(Object::Array(arr)) if arr.len() == 2 => {
            let first = get_number(&arr[0]).unwrap_or(0.0);
            let second = get_number(&arr[1]).unwrap_or(1.0);
            first > second
        }
        _ => false,
    }
}

fn resolve_color_model(doc: &LopdfDocument, obj: Option<&Object>) -> Result<ColorModel> {
    let obj = match obj {
        Some(Object::Reference(id)) => Some(doc.get_object(*id)?),
        other => other,
    };

    match obj {
        None => Ok(ColorModel::Gray),
        Some(Object::Name(name)) => color_model_from_name(name),
        Some(Object::Array(arr)) => {
            let family = arr.first().and_then(|o| o.as_name().ok());
            match family {
                Some(b"ICCBased") => {
                    let n = arr
                        .get(1)
                        .and_then(|o| o.as_reference().ok())
                        .and_then(|id| doc.get_object(id).ok())
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").ok())
                        .and_then(|n| n.as_i64().ok())
                        .unwrap_or(3);
                    match n {
                        1 => Ok(ColorModel::Gray),
                        3 => Ok(ColorModel::Rgb),
                        4 => Ok(ColorModel::Cmyk),
                        _ => Err(Error::UnsupportedImage(format!("ICCBased with {} components", n))),
                    }
                }
                Some(b"Indexed") | Some(b"I") => {
                    let base = resolve_color_model(doc, arr.get(1))?;
                    let hival = arr.get(2).and_then(|o| o.as_i64().ok()).unwrap_or(255).clamp(0, 255) as usize;
                    let lookup = match arr.get(3) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Reference(id)) => match doc.get_object(*id)? {
                            Object::Stream(s) => stream_content(s)?,
                            Object::String(bytes, _) => bytes.clone(),
                            _ => return Err(Error::UnsupportedImage("Indexed lookup".to_string())),
                        },
                        Some(Object::Stream(s)) => stream_content(s)?,
                        _ => return Err(Error::UnsupportedImage("Indexed lookup".to_string())),
                    };
                    if matches!(base, ColorModel::Indexed { .. }) {
                        return Err(Error::UnsupportedImage("nested Indexed".to_string()));
                    }
                    Ok(ColorModel::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                Some(b"CalRGB") => Ok(ColorModel::Rgb),
                Some(b"CalGray") => Ok(ColorModel::Gray),
                Some(other) => Err(Error::UnsupportedImage(format!(
                    "color space {}",
                    String::from_utf8_lossy(other)
                ))),
                None => Err(Error::UnsupportedImage("malformed color space".to_string())),
            }
        }
        Some(_) => Err(Error::UnsupportedImage("malformed color space".to_string())),
    }
}

fn color_model_from_name(name: &[u8]) -> Result<ColorModel> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorModel::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorModel::Rgb),
        b"DeviceCMYK" | b"CMYK" => Ok(ColorModel::Cmyk),
        other => Err(Error::UnsupportedImage(format!(
            "color space {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Unpack rows of `bits`-deep samples into one byte per sample.
///
/// Values are scaled to 0..=255 unless `raw` is set (palette indices).
fn unpack_samples(data: &[u8], width: usize, height: usize, comps: usize, bits: u8, raw: bool) -> Result<Vec<u8>> {
    let bits = bits as usize;
    let row_bytes = (width * comps * bits + 7) / 8;
    if data.len() < row_bytes * height {
        return Err(Error::UnsupportedImage(format!(
            "sample data too short: {} < {}",
            data.len(),
            row_bytes * height
        )));
    }

    let mut out = Vec::with_capacity(width * height * comps);
    for row in data.chunks(row_bytes).take(height) {
        match bits {
            8 => out.extend_from_slice(&row[..width * comps]),
            16 => out.extend(row.chunks(2).take(width * comps).map(|c| c[0])),
            1 | 2 | 4 => {
                let max = (1u16 << bits) - 1;
                for i in 0..width * comps {
                    let bit_pos = i * bits;
                    let byte = row[bit_pos / 8];
                    let shift = 8 - bits - (bit_pos % 8);
                    let v = ((byte >> shift) as u16) & max;
                    out.push(if raw { v as u8 } else { (v * 255 / max) as u8 });
                }
            }
            _ => return Err(Error::UnsupportedImage(format!("{} bits per component", bits))),
        }
    }
    Ok(out)
}

fn decode_samples(data: &[u8], info: &ImageInfo, model: &ColorModel) -> Result<DynamicImage> {
    let (w, h) = (info.width as usize, info.height as usize);
    let raw = matches!(model, ColorModel::Indexed { .. });
    let samples = unpack_samples(data, w, h, model.components(), info.bits_per_component, raw)?;

    let rgb = match model {
        ColorModel::Gray => {
            let image = GrayImage::from_raw(info.width, info.height, samples)
                .ok_or_else(|| Error::UnsupportedImage("gray buffer size".to_string()))?;
            return Ok(DynamicImage::ImageLuma8(image));
        }
        ColorModel::Rgb => samples,
        ColorModel::Cmyk => samples.chunks(4).flat_map(|c| cmyk_to_rgb(c[0], c[1], c[2], c[3])).collect(),
        ColorModel::Indexed { base, hival, lookup } => {
            let n = base.components();
            let mut out = Vec::with_capacity(w * h * 3);
            for &index in &samples {
                let i = (index as usize).min(*hival) * n;
                let entry = lookup.get(i..i + n).unwrap_or(&[0, 0, 0, 0][..n]);
                match **base {
                    ColorModel::Gray => out.extend([entry[0]; 3]),
                    ColorModel::Cmyk => out.extend(cmyk_to_rgb(entry[0], entry[1], entry[2], entry[3])),
                    _ => out.extend_from_slice(entry),
                }
            }
            out
        }
    };

    let image = RgbImage::from_raw(info.width, info.height, rgb)
        .ok_or_else(|| Error::UnsupportedImage("rgb buffer size".to_string()))?;
    Ok(DynamicImage::ImageRgb8(image))
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let k = 255 - k as u16;
    [
        ((255 - c as u16) * k / 255) as u8,
        ((255 - m as u16) * k / 255) as u8,
        ((255 - y as u16) * k / 255) as u8,
    ]
}
