//! Turning labelled candidate lines into the document outline.

use serde::{Deserialize, Serialize};

use crate::classifier::Label;
use crate::features::FeatureRecord;

/// A candidate line with the label the classifier gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: FeatureRecord,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: Label,
    pub text: String,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

impl Outline {
    /// JSON with 4-space indentation; non-ASCII text is written as is.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever writes valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Pair records with their predicted labels, in order.
pub fn label_records(records: Vec<FeatureRecord>, labels: Vec<Label>) -> Vec<LabeledRecord> {
    records
        .into_iter()
        .zip(labels)
        .map(|(record, label)| LabeledRecord { record, label })
        .collect()
}

/// Whether a line labelled `label` belongs in the outline.
///
/// "H3" is the noisiest class, so it is kept only at exactly
/// `h3_word_count` whitespace-separated words.
pub fn accepts(label: &Label, text: &str, h3_word_count: usize) -> bool {
    match label {
        Label::H1 | Label::H2 => true,
        Label::H3 => text.split_whitespace().count() == h3_word_count,
        Label::Other(_) => false,
    }
}

/// Build the outline in encounter order, titled `title`.
pub fn assemble_outline(
    title: impl Into<String>,
    labeled: &[LabeledRecord],
    h3_word_count: usize,
) -> Outline {
    let outline = labeled
        .iter()
        .filter(|l| accepts(&l.label, &l.record.text, h3_word_count))
        .map(|l| OutlineEntry {
            level: l.label.clone(),
            text: l.record.text.clone(),
            page: l.record.page_number,
        })
        .collect();

    Outline {
        title: title.into(),
        outline,
    }
}
