//! Line layout for PDF pages.
//!
//! Groups positioned text spans into lines (respecting two-column layouts)
//! and maps PDF user space onto the top-left page space used by the engine.

use crate::model::{LayoutLine, Rect};

/// A text span with position information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a new text span.
    pub fn new(text: String, x: f32, y: f32, width: f32, font_size: f32) -> Self {
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2 // Approximate descender
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8 // Approximate ascender
    }
}

/// Spans sharing a baseline, ordered left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    /// Baseline (PDF user space)
    pub y: f32,
    /// Left edge of the first span
    pub x: f32,
}

impl TextLine {
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));
        let (x, y) = spans.first().map_or((0.0, 0.0), |s| (s.x, s.y));
        Self { spans, y, x }
    }

    /// Span texts joined with a space wherever the horizontal gap is wider
    /// than a fifth of a glyph, except between ideographs.
    pub fn text(&self) -> String {
        let mut result = String::new();
        let mut prev: Option<&TextSpan> = None;

        for span in &self.spans {
            if let Some(prev) = prev {
                if needs_space(prev, span) {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
            prev = Some(span);
        }
        result
    }

    /// Bounding box in PDF user space (y up), or `None` for an empty line.
    pub fn bbox(&self) -> Option<Rect> {
        self.spans
            .iter()
            .map(|s| Rect::new(s.x, s.bottom(), s.x + s.width, s.top()))
            .reduce(|a, b| a.union(&b))
    }
}

fn needs_space(prev: &TextSpan, span: &TextSpan) -> bool {
    let is_blank = |c: char| c == ' ' || c == '\u{00A0}';
    if prev.text.ends_with(is_blank) || span.text.starts_with(is_blank) {
        return false;
    }

    let glyphs = span.text.chars().count();
    let glyph_width = if glyphs > 0 && span.width > 0.0 {
        span.width / glyphs as f32
    } else {
        span.font_size * 0.5
    };
    let gap = span.x - (prev.x + prev.width);
    if gap <= glyph_width * 0.2 {
        return false;
    }

    let joins_ideographs = prev.text.chars().last().is_some_and(is_spaceless_script_char)
        && span.text.chars().next().is_some_and(is_spaceless_script_char);
    !joins_ideographs
}

/// Visible page area in PDF user space (CropBox, else MediaBox).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// Normalize corners so that `ll` is lower-left.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        }
    }

    /// US Letter, used when a page declares no usable box.
    pub fn letter() -> Self {
        Self::new(0.0, 0.0, 612.0, 792.0)
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Map a user-space rectangle to top-left page space.
    pub fn to_page_rect(&self, r: &Rect) -> Rect {
        Rect::new(
            r.x0 - self.llx,
            self.ury - r.y1,
            r.x1 - self.llx,
            self.ury - r.y0,
        )
    }
}

/// Width of the occupancy bins used to look for a gutter (pt).
const GUTTER_BIN: f32 = 3.0;

/// X coordinate splitting a two-column text block, if there is one.
///
/// The gutter is the widest empty vertical band in the middle 70% of the
/// text extent. It must be at least 12pt wide, leave 80pt on either side,
/// and both sides must hold a tenth of the spans.
pub fn find_gutter(spans: &[TextSpan]) -> Option<f32> {
    let min_x = spans.iter().map(|s| s.x).reduce(f32::min)?;
    let max_x = spans.iter().map(|s| s.x + s.width).reduce(f32::max)?;
    let extent = max_x - min_x;
    if extent < 250.0 {
        return None;
    }

    let bins = (extent / GUTTER_BIN) as usize + 1;
    let mut occupied = vec![false; bins];
    for span in spans {
        let first = ((span.x - min_x) / GUTTER_BIN) as usize;
        let last = ((span.x + span.width - min_x) / GUTTER_BIN) as usize;
        for bin in first..=last.min(bins - 1) {
            occupied[bin] = true;
        }
    }

    // (start, len) of empty runs inside the search window
    let window = bins * 15 / 100..bins * 85 / 100;
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start = None;
    for bin in window.clone() {
        match (occupied[bin], run_start) {
            (false, None) => run_start = Some(bin),
            (true, Some(start)) => {
                runs.push((start, bin - start));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push((start, window.end - start));
    }

    // Widest run, ties broken by distance to the centre.
    let centre = bins as f32 / 2.0;
    let (start, len) = runs.into_iter().max_by(|a, b| {
        let dist = |r: &(usize, usize)| (r.0 as f32 + r.1 as f32 / 2.0 - centre).abs();
        a.1.cmp(&b.1).then(dist(b).total_cmp(&dist(a)))
    })?;
    if len as f32 * GUTTER_BIN < 12.0 {
        return None;
    }

    let gutter = min_x + (start as f32 + len as f32 / 2.0) * GUTTER_BIN;
    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        return None;
    }

    let left = spans.iter().filter(|s| s.x + s.width / 2.0 < gutter).count();
    let right = spans.len() - left;
    let min_share = (spans.len() / 10).max(2);
    if left < min_share || right < min_share {
        log::debug!("Gutter at {:.1} rejected: {} / {} spans", gutter, left, right);
        return None;
    }
    Some(gutter)
}

/// Group spans into lines by baseline, never joining spans across a gutter.
pub fn group_spans_into_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    let Some(gutter) = find_gutter(&spans) else {
        return group_by_baseline(spans);
    };

    let (left, right): (Vec<TextSpan>, Vec<TextSpan>) =
        spans.into_iter().partition(|s| s.x + s.width / 2.0 < gutter);
    let mut lines: Vec<(usize, TextLine)> = group_by_baseline(left)
        .into_iter()
        .map(|l| (0, l))
        .chain(group_by_baseline(right).into_iter().map(|l| (1, l)))
        .collect();

    // Top to bottom (PDF y is bottom-up), then left column first
    lines.sort_by(|(ca, a), (cb, b)| b.y.total_cmp(&a.y).then(ca.cmp(cb)));
    lines.into_iter().map(|(_, line)| line).collect()
}

/// Spans within 30% of a font size of the running baseline share a line.
fn group_by_baseline(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    for span in spans {
        let same_line = current
            .first()
            .is_some_and(|first| (span.y - first.y).abs() <= span.font_size * 0.3);
        if !same_line && !current.is_empty() {
            lines.push(TextLine::from_spans(std::mem::take(&mut current)));
        }
        current.push(span);
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }
    lines
}

/// Build page-space layout lines from user-space spans.
pub fn build_lines(spans: Vec<TextSpan>, page_box: &PageBox) -> Vec<LayoutLine> {
    group_spans_into_lines(spans)
        .into_iter()
        .filter_map(|line| {
            let text = line.text().trim().to_string();
            if text.is_empty() {
                return None;
            }
            let bbox = line.bbox()?;
            Some(LayoutLine::new(text, page_box.to_page_rect(&bbox)))
        })
        .collect()
}

/// Ideographic and kana characters, which are not separated by spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{30FF}'     // CJK punctuation, hiragana, katakana
        | '\u{3400}'..='\u{4DBF}'   // extension A
        | '\u{4E00}'..='\u{9FFF}'   // unified ideographs
        | '\u{20000}'..='\u{2EBEF}' // extensions B-F
    )
}
