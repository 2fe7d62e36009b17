//! Feature matrix construction against a trained column schema.
//!
//! Records are encoded one row each: eight numeric base columns, then one-hot
//! `font_<name>` and `lang_<script>` columns. Names are sanitized to
//! identifier-safe form, schema columns this batch never produced are
//! zero-filled, and the result is selected in exactly the schema's order.
//! No value of a row depends on other rows, so a record always encodes to the
//! same vector.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureRecord;

/// Version of the encoding rules. Bumped when column derivation changes.
pub const SCHEMA_VERSION: u32 = 1;

pub const FONT_PREFIX: &str = "font_";
pub const LANG_PREFIX: &str = "lang_";

/// Numeric columns, in build order.
pub const BASE_COLUMNS: [&str; 8] = [
    "font_size",
    "is_bold",
    "is_caps",
    "page_number",
    "line_length",
    "r",
    "g",
    "b",
];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("schema has {schema} columns but the model expects {model}")]
    ColumnCount { schema: usize, model: usize },
    #[error("schema column {index} is `{schema}` but the model expects `{model}`")]
    ColumnMismatch {
        index: usize,
        schema: String,
        model: String,
    },
    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered column names a classifier was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns,
        }
    }

    pub fn from_json(s: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(s)?;
        if schema.version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                found: schema.version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(schema)
    }

    /// Fail on the first difference between this schema and `model_columns`.
    pub fn verify_against(&self, model_columns: &[String]) -> Result<(), SchemaError> {
        if self.columns.len() != model_columns.len() {
            return Err(SchemaError::ColumnCount {
                schema: self.columns.len(),
                model: model_columns.len(),
            });
        }
        for (index, (ours, theirs)) in self.columns.iter().zip(model_columns).enumerate() {
            if ours != theirs {
                return Err(SchemaError::ColumnMismatch {
                    index,
                    schema: ours.clone(),
                    model: theirs.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Dense row-major matrix with named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index).copied()
    }
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w]").expect("static pattern"))
}

/// Replace every character that is not alphanumeric or `_` with `_`.
pub fn sanitize_column_name(name: &str) -> String {
    non_word_regex().replace_all(name, "_").into_owned()
}

/// Channels of a `#RRGGBB` string. Unparseable channels are 0.
pub fn parse_hex_color(hex: &str) -> (u8, u8, u8) {
    let digits = hex.split_once('#').map(|(_, rest)| rest).unwrap_or("");
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0)
    };
    (channel(0), channel(2), channel(4))
}

fn base_values(record: &FeatureRecord) -> [f64; 8] {
    let (r, g, b) = parse_hex_color(&record.color_rgb);
    [
        record.font_size,
        f64::from(record.is_bold),
        f64::from(record.is_caps),
        record.page_number as f64,
        record.line_length as f64,
        f64::from(r),
        f64::from(g),
        f64::from(b),
    ]
}

/// Columns as built from the records, before alignment to a schema.
#[derive(Default)]
struct BuiltColumns {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
}

impl BuiltColumns {
    fn push(&mut self, name: &str, column: Vec<f64>) {
        let name = sanitize_column_name(name);
        match self.index.get(&name) {
            // Two categories sanitized to one name: a row is hot if either is.
            Some(&i) => {
                for (existing, new) in self.values[i].iter_mut().zip(column) {
                    *existing = existing.max(new);
                }
            }
            None => {
                self.index.insert(name.clone(), self.names.len());
                self.names.push(name);
                self.values.push(column);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&Vec<f64>> {
        self.index.get(name).map(|&i| &self.values[i])
    }

    fn one_hot<'r, F>(&mut self, records: &'r [FeatureRecord], prefix: &str, category: F)
    where
        F: Fn(&'r FeatureRecord) -> &'r str,
    {
        let categories: BTreeSet<&str> = records.iter().map(&category).collect();
        for value in categories {
            let column = records
                .iter()
                .map(|r| if category(r) == value { 1.0 } else { 0.0 })
                .collect();
            self.push(&format!("{prefix}{value}"), column);
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `records` into exactly the columns of `schema`, in its order.
pub fn encode(records: &[FeatureRecord], schema: &[String]) -> FeatureMatrix {
    let mut built = BuiltColumns::default();
    for (i, name) in BASE_COLUMNS.iter().enumerate() {
        let column = records.iter().map(|r| base_values(r)[i]).collect();
        built.push(name, column);
    }
    built.one_hot(records, FONT_PREFIX, |r| r.font_name.as_str());
    built.one_hot(records, LANG_PREFIX, |r| r.script_type.as_str());

    let mut zero_filled = Vec::new();
    let columns: Vec<Option<&Vec<f64>>> = schema
        .iter()
        .map(|name| {
            let column = built.get(name);
            if column.is_none() {
                zero_filled.push(name.as_str());
            }
            column
        })
        .collect();

    let dropped: Vec<&str> = built
        .names
        .iter()
        .filter(|name| !schema.contains(*name))
        .map(String::as_str)
        .collect();
    if !zero_filled.is_empty() {
        log::debug!("zero-filled schema columns: {}", zero_filled.join(", "));
    }
    if !dropped.is_empty() {
        log::debug!("dropped columns outside the schema: {}", dropped.join(", "));
    }

    let rows = (0..records.len())
        .map(|row| {
            columns
                .iter()
                .map(|column| column.and_then(|c| c.get(row)).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    FeatureMatrix {
        columns: schema.to_vec(),
        rows,
    }
}

/// The category whose `prefix` column is hot in `row`, if any.
pub fn decode_one_hot<'m>(matrix: &'m FeatureMatrix, row: usize, prefix: &str) -> Option<&'m str> {
    let values = matrix.rows.get(row)?;
    matrix
        .columns
        .iter()
        .zip(values)
        .filter(|(name, _)| !BASE_COLUMNS.contains(&name.as_str()))
        .find(|(name, value)| name.starts_with(prefix) && **value == 1.0)
        .map(|(name, _)| &name[prefix.len()..])
}
