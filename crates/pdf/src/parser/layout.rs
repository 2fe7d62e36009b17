//! Text extraction, line grouping and block assembly.
//!
//! Transforms raw PDF content-stream operators into the page → block → line
//! → span structure consumed by feature extraction.  Every public function is
//! a pure transformation; I/O lives behind the [`PdfBackend`] trait.
//!
//! # Pipeline
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  TextLine[]  ->  TextBlock[]
//!   (per page)      extract         group_spans     group_lines
//! ```

use std::collections::HashMap;

use super::backend::{get_number_from_value, BackendFontInfo, PageId, PdfBackend, PdfValue};
use crate::types::Page;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A run of text sharing one font, size and fill colour.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
    /// Fill colour packed as `0xRRGGBB`.
    pub color: u32,
}

/// A horizontal line of text assembled from one or more [`TextSpan`]s that
/// share (approximately) the same baseline.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
    pub x: f32,
    /// Size covering the most characters; used for block gap detection.
    pub font_size: f32,
}

impl TextLine {
    /// Concatenate all span texts with a single space separator.
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A vertical run of consecutive [`TextLine`]s without a paragraph-sized gap.
#[derive(Debug, Clone, Default)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Two spans whose Y coordinates differ by less than this are treated as
/// belonging to the same line.
const Y_TOLERANCE: f32 = 1.0;

/// Approximate character width as a fraction of font size when no glyph
/// metrics are available.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Minimum gap (in points) between adjacent spans before we insert a space.
const MIN_WORD_GAP: f32 = 1.5;

/// A vertical gap larger than this multiple of the line's font size starts a
/// new block.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// Sizes closer than this are the same size for span merging.
const SIZE_EPSILON: f32 = 0.01;

/// Initial fill colour of every graphics state (black).
const DEFAULT_FILL: u32 = 0x000000;

// ---------------------------------------------------------------------------
// CJK / spaceless-script helper
// ---------------------------------------------------------------------------

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces (CJK ideographs, kana, Hangul, Thai and neighbours).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0xF900..=0xFAFF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x31F0..=0x31FF
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF
        | 0x0E00..=0x0EFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
        | 0x0F00..=0x0FFF
    )
}

// ---------------------------------------------------------------------------
// Colour helpers
// ---------------------------------------------------------------------------

/// Pack three `0.0..=1.0` components into `0xRRGGBB`.
pub fn pack_rgb(r: f32, g: f32, b: f32) -> u32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

/// Naive CMYK → RGB conversion, `1 - min(1, c + k)` per channel.
pub fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> u32 {
    pack_rgb(
        1.0 - (c + k).min(1.0),
        1.0 - (m + k).min(1.0),
        1.0 - (y + k).min(1.0),
    )
}

/// Interpret numeric colour operands by their count: 1 = gray, 3 = RGB,
/// 4 = CMYK.  Pattern names and other shapes yield `None`.
fn color_from_operands(operands: &[PdfValue]) -> Option<u32> {
    let comps: Vec<f32> = operands.iter().filter_map(get_number_from_value).collect();
    if comps.len() != operands.len() {
        return None;
    }
    match comps.as_slice() {
        [gray] => Some(pack_rgb(*gray, *gray, *gray)),
        [r, g, b] => Some(pack_rgb(*r, *g, *b)),
        [c, m, y, k] => Some(cmyk_to_rgb(*c, *m, *y, *k)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Mutable state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key).
    font_key: Vec<u8>,
    /// Resolved base-font name for the current font.
    font_name: String,
    font_size: f32,
    /// Elements [a, b, c, d, tx, ty] of the current text matrix.
    text_matrix: [f32; 6],
    /// Text line matrix, set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
    /// Non-stroking colour, `0xRRGGBB`.
    fill_color: u32,
    /// Current transformation matrix, user space to device space.
    ctm: [f32; 6],
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
            fill_color: DEFAULT_FILL,
            ctm: IDENTITY_MATRIX,
        }
    }
}

/// The identity 2x3 matrix: [a, b, c, d, tx, ty].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m1 x m2` for PDF's row-vector 2x3 matrices, so `m1` applies first.
fn multiply(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn matrix_from_operands(operands: &[PdfValue]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    match vals.as_slice() {
        &[a, b, c, d, e, f] => Some([a, b, c, d, e, f]),
        _ => None,
    }
}

impl TextState {
    /// Text matrix followed by the CTM: text space to device space.
    fn rendering_matrix(&self) -> [f32; 6] {
        multiply(&self.text_matrix, &self.ctm)
    }

    /// Device-space position of the current text origin, rise included.
    fn origin(&self) -> (f32, f32) {
        let m = self.rendering_matrix();
        (
            m[2] * self.text_rise + m[4],
            m[3] * self.text_rise + m[5],
        )
    }

    /// Rendered size: `font_size * sqrt(b^2 + d^2)` of the rendering matrix.
    fn effective_font_size(&self) -> f32 {
        let m = self.rendering_matrix();
        (self.font_size * (m[1].powi(2) + m[3].powi(2)).sqrt()).abs()
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (Td / TD / T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn set_font(&mut self, key: Vec<u8>, base_font: &str, size: f32) {
        self.font_key = key;
        self.font_size = size;
        self.font_name = base_font.to_string();
    }

    fn span(&self, text: String, (x, y): (f32, f32)) -> TextSpan {
        let m = self.rendering_matrix();
        let width = estimate_text_width(&text, self) * (m[0].powi(2) + m[1].powi(2)).sqrt();
        TextSpan {
            text,
            x,
            y,
            width,
            font_size: self.effective_font_size(),
            font_name: self.font_name.clone(),
            color: self.fill_color,
        }
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

fn estimate_text_width(text: &str, state: &TextState) -> f32 {
    let n = text.chars().count() as f32;
    n * state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale
}

/// Advance the text matrix after rendering `text`.
fn advance_after_show(text: &str, state: &mut TextState) {
    let char_w = state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale;
    let mut total_dx: f32 = 0.0;
    for ch in text.chars() {
        total_dx += char_w + state.char_spacing;
        if ch == ' ' {
            total_dx += state.word_spacing;
        }
    }
    state.advance_x(total_dx);
}

fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                super::backend::decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Public API: span extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce a flat list of
/// [`TextSpan`]s in stream order.
///
/// | Operator              | Action |
/// |-----------------------|--------|
/// | `BT` / `ET`           | Begin / end text object |
/// | `Tf`                  | Set font and size |
/// | `Tm` `Td` `TD` `T*`   | Position |
/// | `TL` `Tc` `Tw` `Tz` `Ts` | Text state parameters |
/// | `Tj` `TJ` `'` `"`     | Show text |
/// | `g` `rg` `k` `sc` `scn` `cs` | Fill colour |
/// | `cm`                  | Concatenate onto the CTM |
/// | `q` / `Q`             | Save / restore fill colour and CTM |
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut state = TextState::default();
    let mut saved_states: Vec<(u32, [f32; 6])> = Vec::new();
    let mut spans: Vec<TextSpan> = Vec::new();

    for op in &ops {
        let first_number = || op.operands.first().and_then(get_number_from_value);
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}

            "q" => saved_states.push((state.fill_color, state.ctm)),
            "Q" => {
                if let Some((fill, ctm)) = saved_states.pop() {
                    state.fill_color = fill;
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from_operands(&op.operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }

            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(color) = color_from_operands(&op.operands) {
                    state.fill_color = color;
                }
            }
            "cs" => state.fill_color = DEFAULT_FILL,

            "Tf" => handle_tf(&op.operands, &fonts, &mut state),

            "Tm" => handle_tm(&op.operands, &mut state),
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.translate_line(0.0, -state.leading),
            "TL" => {
                if let Some(v) = first_number() {
                    state.leading = v;
                }
            }

            "Tc" => {
                if let Some(v) = first_number() {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = first_number() {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = first_number() {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = first_number() {
                    state.text_rise = v;
                }
            }

            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    handle_tj_array(arr, backend, page_id, &mut state, &mut spans);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    emit_show_string(&op.operands[2], backend, page_id, &mut state, &mut spans);
                }
            }

            _ => {}
        }
    }

    Ok(spans)
}

fn handle_tf(operands: &[PdfValue], fonts: &[BackendFontInfo], state: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) => n.clone(),
        PdfValue::Str(s) => s.clone(),
        _ => return,
    };
    let size = get_number_from_value(&operands[1]).unwrap_or(0.0);
    match resolve_font(&key, fonts).and_then(|info| info.base_font.clone()) {
        Some(base) => state.set_font(key, &base, size),
        None => {
            // Not in the resource dictionary: fall back to the key itself.
            let name = String::from_utf8_lossy(&key).to_string();
            state.set_font(key, &name, size);
        }
    }
}

fn handle_tm(operands: &[PdfValue], state: &mut TextState) {
    if let Some(m) = matrix_from_operands(operands) {
        state.text_matrix = m;
        state.line_matrix = m;
    }
}

/// Shared by `Tj`, `'` and `"`.
fn emit_show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    let span = state.span(text, state.origin());
    advance_after_show(&span.text, state);
    spans.push(span);
}

/// Process a `TJ` array of strings and kerning adjustments (thousandths of
/// a text-space unit).  Large negative adjustments become spaces.
fn handle_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let mut buf = String::new();
    let mut span_origin = state.origin();

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &state.font_key);
                if buf.is_empty() {
                    span_origin = state.origin();
                }
                buf.push_str(&fragment);
                advance_after_show(&fragment, state);
            }
            val => {
                if let Some(adj) = get_number_from_value(val) {
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
                    let gap_threshold =
                        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
                    if dx > gap_threshold && !buf.is_empty() {
                        buf.push(' ');
                    }
                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        spans.push(state.span(trimmed.to_string(), span_origin));
    }
}

/// Extract text spans from every page, as `(page_number, spans)` pairs with
/// 1-based page numbers in document order.
pub fn extract_all_pages(
    backend: &dyn PdfBackend,
) -> Result<Vec<(usize, Vec<TextSpan>)>, PdfError> {
    let page_map = backend.pages();
    let mut result: Vec<(usize, Vec<TextSpan>)> = Vec::with_capacity(page_map.len());

    for (&page_num, &page_id) in &page_map {
        let spans = extract_page_spans(backend, page_id)?;
        log::trace!("page {}: {} raw spans", page_num, spans.len());
        result.push((page_num as usize, spans));
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Public API: span -> line grouping
// ---------------------------------------------------------------------------

/// Group a flat list of [`TextSpan`]s into [`TextLine`]s in reading order
/// (top of page first, then left to right).
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return Vec::new();
    }

    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_spans: Vec<TextSpan> = Vec::new();
    let mut current_y = spans[0].y;

    for span in spans {
        if (span.y - current_y).abs() > Y_TOLERANCE && !current_spans.is_empty() {
            lines.push(assemble_line(std::mem::take(&mut current_spans)));
            current_y = span.y;
        }
        current_spans.push(span);
    }

    if !current_spans.is_empty() {
        lines.push(assemble_line(current_spans));
    }

    lines
}

/// Two spans belong to the same run when font, size and colour all match.
fn same_run(a: &TextSpan, b: &TextSpan) -> bool {
    a.font_name == b.font_name
        && (a.font_size - b.font_size).abs() < SIZE_EPSILON
        && a.color == b.color
}

/// Build a [`TextLine`] from spans known to share the same baseline,
/// merging adjacent spans of the same run.
fn assemble_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut merged: Vec<TextSpan> = Vec::with_capacity(spans.len());

    for span in spans {
        if let Some(prev) = merged.last_mut() {
            let gap = span.x - (prev.x + prev.width);

            if same_run(prev, &span) && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                if gap >= MIN_WORD_GAP && !boundary_is_spaceless(prev, &span) {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.width = (span.x + span.width) - prev.x;
                continue;
            }
        }

        merged.push(span);
    }

    TextLine {
        y: merged.first().map(|s| s.y).unwrap_or(0.0),
        x: merged.first().map(|s| s.x).unwrap_or(0.0),
        font_size: dominant_font_size(&merged),
        spans: merged,
    }
}

/// The font size that covers the most characters in the spans.
fn dominant_font_size(spans: &[TextSpan]) -> f32 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for s in spans {
        let key = (s.font_size * 100.0).round() as i32;
        *counts.entry(key).or_insert(0) += s.text.chars().count();
    }
    counts
        .into_iter()
        .max_by_key(|&(k, c)| (c, k))
        .map(|(k, _)| k as f32 / 100.0)
        .unwrap_or(0.0)
}

fn boundary_is_spaceless(prev: &TextSpan, next: &TextSpan) -> bool {
    match (prev.text.chars().next_back(), next.text.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Public API: line -> block grouping
// ---------------------------------------------------------------------------

/// Group consecutive [`TextLine`]s into [`TextBlock`]s, starting a new block
/// whenever the vertical gap exceeds [`BLOCK_GAP_FACTOR`] × font size.
pub fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current = TextBlock::default();

    for line in lines {
        let gap_break = current.lines.last().is_some_and(|prev| {
            let threshold = prev.font_size.max(line.font_size) * BLOCK_GAP_FACTOR;
            (prev.y - line.y).abs() > threshold
        });

        if gap_break {
            blocks.push(std::mem::take(&mut current));
        }
        current.lines.push(line);
    }

    if !current.lines.is_empty() {
        blocks.push(current);
    }

    blocks
}

// ---------------------------------------------------------------------------
// Public API: full pipeline
// ---------------------------------------------------------------------------

/// Run line and block grouping for every page of pre-extracted spans.
pub fn analyze(pages: Vec<(usize, Vec<TextSpan>)>) -> Vec<Page> {
    pages
        .into_iter()
        .map(|(number, spans)| {
            let lines = group_spans_into_lines(spans);
            Page {
                number,
                blocks: group_lines_into_blocks(lines),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
