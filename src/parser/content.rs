//! Content stream interpretation.
//!
//! Walks the operators of a page once and records where text is shown,
//! where image XObjects are placed and where vector paths are painted.
//! Everything is reported in PDF user space (origin bottom-left).

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object};

use super::layout::{is_spaceless_script_char, TextSpan};
use crate::error::{Error, Result};
use crate::model::Rect;

/// Maximum nesting of form XObjects.
const MAX_FORM_DEPTH: usize = 8;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f32 = 0.5;

/// Affine transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Build from six numeric operands.
    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        Some(Self::new(
            get_number(&operands[0])?,
            get_number(&operands[1])?,
            get_number(&operands[2])?,
            get_number(&operands[3])?,
            get_number(&operands[4])?,
            get_number(&operands[5])?,
        ))
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed unit x vector.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed unit y vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Bounding box of the transformed unit square.
    pub fn unit_square_bbox(&self) -> Option<Rect> {
        Rect::from_points([
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ])
    }
}

/// Result of scanning one page.
#[derive(Debug, Default)]
pub struct ContentScan {
    /// Text shown on the page
    pub spans: Vec<TextSpan>,

    /// Image XObject placements: (object number, bbox in user space)
    pub images: Vec<(u32, Rect)>,

    /// Bounding boxes of painted paths in user space
    pub drawings: Vec<Rect>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font_key: Vec<u8>,
    font_size: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font_key: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Single-pass interpreter collecting text, images and drawings.
pub struct ContentScanner<'a> {
    doc: &'a LopdfDocument,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<(f32, f32)>,
    output: ContentScan,
}

impl<'a> ContentScanner<'a> {
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self {
            doc,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            output: ContentScan::default(),
        }
    }

    /// Scan decoded content bytes with the given resource dictionary.
    pub fn scan(mut self, content: &[u8], resources: Option<&'a Dictionary>) -> Result<ContentScan> {
        let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;
        self.run(&content.operations, resources, 0);
        Ok(self.output)
    }

    fn run(&mut self, operations: &[Operation], resources: Option<&'a Dictionary>, depth: usize) {
        for op in operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                // Graphics state
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(state) = self.stack.pop() {
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.state.ctm = m.then(&self.state.ctm);
                    }
                }

                // Text objects and state
                "BT" => {
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Object::Name(name) = &operands[0] {
                            self.state.font_key = name.clone();
                        }
                        self.state.font_size = get_number(&operands[1]).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(v) = operands.first().and_then(get_number) {
                        self.state.leading = v;
                    }
                }
                "Ts" => {
                    if let Some(v) = operands.first().and_then(get_number) {
                        self.state.rise = v;
                    }
                }
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number(&operands[0]).unwrap_or(0.0);
                        let ty = get_number(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            self.state.leading = -ty;
                        }
                        self.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "T*" => self.next_line(),

                // Text showing
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let text = self.decode(resources, bytes);
                        let advance = text.chars().count() as f32 * GLYPH_ADVANCE;
                        self.show(text, advance);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let text = self.decode(resources, bytes);
                        let advance = text.chars().count() as f32 * GLYPH_ADVANCE;
                        self.show(text, advance);
                    }
                }
                "\"" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        let text = self.decode(resources, bytes);
                        let advance = text.chars().count() as f32 * GLYPH_ADVANCE;
                        self.show(text, advance);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let (text, advance) = self.decode_array(resources, items);
                        self.show(text, advance);
                    }
                }

                // XObjects
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.invoke_xobject(resources, name, depth);
                    }
                }

                // Path construction
                "m" | "l" => {
                    if let Some((x, y)) = point(operands, 0) {
                        self.path.push(self.state.ctm.apply(x, y));
                    }
                }
                "c" | "v" | "y" => {
                    // Control points are kept: the hull bounds the curve.
                    let mut i = 0;
                    while let Some((x, y)) = point(operands, i) {
                        self.path.push(self.state.ctm.apply(x, y));
                        i += 2;
                    }
                }
                "re" => {
                    if operands.len() >= 4 {
                        let x = get_number(&operands[0]).unwrap_or(0.0);
                        let y = get_number(&operands[1]).unwrap_or(0.0);
                        let w = get_number(&operands[2]).unwrap_or(0.0);
                        let h = get_number(&operands[3]).unwrap_or(0.0);
                        let ctm = self.state.ctm;
                        self.path.extend([
                            ctm.apply(x, y),
                            ctm.apply(x + w, y),
                            ctm.apply(x + w, y + h),
                            ctm.apply(x, y + h),
                        ]);
                    }
                }
                "h" => {}

                // Path painting
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => self.paint_path(),
                "n" => self.discard_path(),

                _ => {}
            }
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    /// Record a span at the current text position and advance past it.
    ///
    /// `advance` is in unscaled text space units (multiples of the font size).
    fn show(&mut self, text: String, advance: f32) {
        let size = self.state.font_size;
        let trm = self.text_matrix.then(&self.state.ctm);

        if !text.trim().is_empty() {
            let (x, y) = trm.apply(0.0, self.state.rise);
            let effective_size = (size * trm.vertical_scale()).abs();
            let width = (advance * size * trm.horizontal_scale()).abs();
            self.output
                .spans
                .push(TextSpan::new(text, x, y, width, effective_size));
        }

        let tx = advance * size;
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    /// Decode a TJ array, inserting spaces at large negative adjustments.
    fn decode_array(&self, resources: Option<&Dictionary>, items: &[Object]) -> (String, f32) {
        // Adjustments are in thousandths of a text space unit.
        let space_threshold = 200.0;
        let mut combined = String::new();
        let mut advance = 0.0;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = self.decode(resources, bytes);
                    advance += decoded.chars().count() as f32 * GLYPH_ADVANCE;
                    combined.push_str(&decoded);
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = -get_number(item).unwrap_or(0.0);
                    advance += adjustment / 1000.0;
                    if adjustment > space_threshold
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                        && !combined.ends_with('\u{00A0}')
                    {
                        if let Some(c) = combined.chars().last() {
                            if !is_spaceless_script_char(c) {
                                combined.push(' ');
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        (combined, advance)
    }

    fn decode(&self, resources: Option<&Dictionary>, bytes: &[u8]) -> String {
        let font = resources
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|fonts| resolve_dict(self.doc, fonts))
            .and_then(|fonts| fonts.get(&self.state.font_key).ok())
            .and_then(|font| resolve_dict(self.doc, font));

        if let Some(font) = font {
            if let Ok(encoding) = font.get_font_encoding(self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn invoke_xobject(&mut self, resources: Option<&'a Dictionary>, name: &[u8], depth: usize) {
        let Some(xobject_ref) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|xobjects| resolve_dict(self.doc, xobjects))
            .and_then(|xobjects| xobjects.get(name).ok())
        else {
            log::debug!("XObject /{} not found", String::from_utf8_lossy(name));
            return;
        };

        let (object_id, stream) = match xobject_ref {
            Object::Reference(id) => match self.doc.get_object(*id).and_then(Object::as_stream) {
                Ok(stream) => (id.0, stream),
                Err(_) => return,
            },
            _ => return,
        };

        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();

        match subtype {
            Some(b"Image") => {
                if let Some(bbox) = self.state.ctm.unit_square_bbox() {
                    self.output.images.push((object_id, bbox));
                }
            }
            Some(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    log::warn!("Form XObject nesting exceeds {}, skipping", MAX_FORM_DEPTH);
                    return;
                }
                let content = match stream_content(stream) {
                    Ok(content) => content,
                    Err(e) => {
                        log::debug!("Skipping form XObject {}: {}", object_id, e);
                        return;
                    }
                };
                let operations = match Content::decode(&content) {
                    Ok(content) => content.operations,
                    Err(e) => {
                        log::debug!("Skipping form XObject {}: {}", object_id, e);
                        return;
                    }
                };
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| Matrix::from_operands(m))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(self.doc, r))
                    .or(resources);

                let saved_state = self.state.clone();
                let saved_depth = self.stack.len();
                self.state.ctm = form_matrix.then(&self.state.ctm);
                self.run(&operations, form_resources, depth + 1);
                self.stack.truncate(saved_depth);
                self.state = saved_state;
            }
            _ => {}
        }
    }

    fn paint_path(&mut self) {
        if let Some(bbox) = Rect::from_points(self.path.drain(..)) {
            self.output.drawings.push(bbox);
        }
    }

    fn discard_path(&mut self) {
        self.path.clear();
    }
}

/// Resolve a dictionary that may be stored inline or behind a reference.
pub(crate) fn resolve_dict<'d>(doc: &'d LopdfDocument, obj: &'d Object) -> Option<&'d Dictionary> {
    match obj {
        Object::Reference(r) => doc.get_dictionary(*r).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Stream bytes, decompressed only when a filter is declared.
pub(crate) fn stream_content(stream: &lopdf::Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| Error::PdfParse(e.to_string()))
    } else {
        Ok(stream.content.clone())
    }
}

/// Helper to extract number from PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn point(operands: &[Object], i: usize) -> Option<(f32, f32)> {
    Some((
        get_number(operands.get(i)?)?,
        get_number(operands.get(i + 1)?)?,
    ))
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    // Try UTF-8
    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> ContentScan {
        let doc = LopdfDocument::with_version("1.5");
        ContentScanner::new(&doc)
            .scan(content.as_bytes(), None)
            .unwrap()
    }

    #[test]
    fn test_matrix_then() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 20.0);
        // Scale first, then shift.
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 22.0));
        // Shift first, then scale.
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 42.0));
    }

    #[test]
    fn test_unit_square_bbox() {
        let m = Matrix::new(200.0, 0.0, 0.0, 150.0, 100.0, 300.0);
        assert_eq!(
            m.unit_square_bbox(),
            Some(Rect::new(100.0, 300.0, 300.0, 450.0))
        );
    }

    #[test]
    fn test_scan_text_position() {
        let out = scan("BT /F1 10 Tf 72 700 Td (Figure 1: Results) Tj ET");
        assert_eq!(out.spans.len(), 1);
        let span = &out.spans[0];
        assert_eq!(span.text, "Figure 1: Results");
        assert_eq!(span.x, 72.0);
        assert_eq!(span.y, 700.0);
        assert_eq!(span.font_size, 10.0);
        // 17 chars at half the font size each.
        assert!((span.width - 85.0).abs() < 1e-3);
    }

    #[test]
    fn test_scan_text_leading() {
        let out = scan("BT /F1 10 Tf 14 TL 72 700 Td (one) Tj T* (two) Tj ET");
        assert_eq!(out.spans.len(), 2);
        assert_eq!(out.spans[1].x, 72.0);
        assert_eq!(out.spans[1].y, 686.0);
    }

    #[test]
    fn test_scan_text_under_ctm() {
        let out = scan("q 2 0 0 2 10 10 cm BT /F1 5 Tf 1 1 Td (x) Tj ET Q");
        let span = &out.spans[0];
        assert_eq!((span.x, span.y), (12.0, 12.0));
        assert_eq!(span.font_size, 10.0);
    }

    #[test]
    fn test_scan_tj_array_spacing() {
        let out = scan("BT /F1 10 Tf 0 0 Td [(Fig.) -300 (2:) -250 (plot)] TJ ET");
        assert_eq!(out.spans[0].text, "Fig. 2: plot");
    }

    #[test]
    fn test_scan_paths() {
        let out = scan("10 20 m 110 20 l 110 70 l S 0 0 100 100 re W n 5 5 50 40 re f");
        assert_eq!(
            out.drawings,
            vec![
                Rect::new(10.0, 20.0, 110.0, 70.0),
                Rect::new(5.0, 5.0, 55.0, 45.0)
            ]
        );
    }

    #[test]
    fn test_scan_restores_state() {
        let out = scan("q 1 0 0 1 50 50 cm Q 0 0 10 10 re f");
        assert_eq!(out.drawings, vec![Rect::new(0.0, 0.0, 10.0, 10.0)]);
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0x48, 0x65, 0x6C, 0x6C, 0xE9]), "Hellé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }
}
