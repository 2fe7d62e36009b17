//! Heading candidates from a laid-out document.
//!
//! The body size of a document is the most common span font size. Every line
//! whose mean span size is strictly above it becomes a [`FeatureRecord`]; the
//! rest is body text and never reaches the classifier.

use std::collections::HashMap;

use pdf::{Document, TextLine, TextSpan};
use serde::{Deserialize, Serialize};

use crate::config::Heuristics;
use crate::script::{detect_script, Script};

/// One candidate line, as the classifier sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub text: String,
    pub font_size: f64,
    pub font_name: String,
    pub is_bold: u8,
    pub is_caps: u8,
    pub page_number: usize,
    pub line_length: usize,
    pub color_rgb: String,
    pub script_type: Script,
}

// ---------------------------------------------------------------------------
// Body size
// ---------------------------------------------------------------------------

/// Statistical mode of `sizes`. Ties go to the value seen first.
pub fn body_size<I>(sizes: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut order: Vec<f32> = Vec::new();
    for size in sizes {
        let count = counts.entry(size.to_bits()).or_insert(0);
        if *count == 0 {
            order.push(size);
        }
        *count += 1;
    }

    let mut best: Option<(f32, usize)> = None;
    for size in order {
        let count = counts.get(&size.to_bits()).copied().unwrap_or(0);
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((size, count));
        }
    }
    best.map(|(size, _)| size)
}

// ---------------------------------------------------------------------------
// Line summaries
// ---------------------------------------------------------------------------

struct LineSummary<'a> {
    text: String,
    mean_size: f64,
    font_name: &'a str,
    is_bold: bool,
    color: u32,
}

/// Summarize the non-blank spans of `line`, or `None` if it has no text.
fn summarize_line<'a>(line: &'a TextLine, bold_marker: &str) -> Option<LineSummary<'a>> {
    let spans: Vec<&TextSpan> = line
        .spans
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    let last = spans.last()?;

    let mut text = String::new();
    for span in &spans {
        text.push_str(span.text.trim());
        text.push(' ');
    }
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let total: f64 = spans.iter().map(|s| f64::from(s.font_size)).sum();
    let mean_size = total / spans.len() as f64;
    let fonts: Vec<&str> = spans.iter().map(|s| s.font_name.as_str()).collect();

    Some(LineSummary {
        text,
        mean_size,
        font_name: dominant_font(&fonts),
        is_bold: spans.iter().any(|s| s.font_name.contains(bold_marker)),
        color: last.color,
    })
}

/// Most frequent font name, first one wins on ties.
fn dominant_font<'a>(fonts: &[&'a str]) -> &'a str {
    let mut best: (&str, usize) = ("", 0);
    for (i, font) in fonts.iter().enumerate() {
        if fonts[..i].contains(font) {
            continue;
        }
        let count = fonts.iter().filter(|f| *f == font).count();
        if count > best.1 {
            best = (font, count);
        }
    }
    best.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `0xRRGGBB` as `#RRGGBB`.
pub fn rgb_to_hex(color: u32) -> String {
    format!(
        "#{:02X}{:02X}{:02X}",
        (color >> 16) & 0xFF,
        (color >> 8) & 0xFF,
        color & 0xFF
    )
}

/// ALL-CAPS is only meaningful for Latin text.
fn is_caps(text: &str, script: Script) -> bool {
    script == Script::Latin && text.to_uppercase() == text
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Candidate heading lines of `doc` in page and reading order.
///
/// Returns an empty list when the document has no spans or no line above the
/// body size.
pub fn extract_features(doc: &Document, heuristics: &Heuristics) -> Vec<FeatureRecord> {
    let Some(body) = body_size(doc.spans().map(|s| s.font_size)) else {
        log::debug!("document has no text spans");
        return Vec::new();
    };
    let body = f64::from(body);

    let mut records = Vec::new();
    for page in &doc.pages {
        for line in page.lines() {
            let Some(summary) = summarize_line(line, &heuristics.bold_marker) else {
                continue;
            };
            let font_size = round2(summary.mean_size);
            if font_size <= body || summary.mean_size <= body {
                continue;
            }

            let script = detect_script(&summary.text);
            records.push(FeatureRecord {
                font_size,
                font_name: summary.font_name.to_string(),
                is_bold: u8::from(summary.is_bold),
                is_caps: u8::from(is_caps(&summary.text, script)),
                page_number: page.number,
                line_length: summary.text.chars().count(),
                color_rgb: rgb_to_hex(summary.color),
                script_type: script,
                text: summary.text,
            });
        }
    }

    log::debug!(
        "body size {body}pt, {} candidate line(s) over {} page(s)",
        records.len(),
        doc.page_count()
    );
    records
}
