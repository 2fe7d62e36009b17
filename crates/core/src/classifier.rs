//! The seam between feature encoding and whatever model labels the lines.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::{FeatureMatrix, FeatureSchema};

/// Predicted class of a candidate line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    H1,
    H2,
    H3,
    /// Any non-heading class, kept verbatim.
    Other(String),
}

impl Label {
    pub fn parse(s: &str) -> Self {
        match s {
            "H1" => Label::H1,
            "H2" => Label::H2,
            "H3" => Label::H3,
            other => Label::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::H1 => "H1",
            Label::H2 => "H2",
            Label::H3 => "H3",
            Label::Other(s) => s,
        }
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::parse(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("matrix has {found} columns but the classifier expects {expected}")]
    ColumnCount { expected: usize, found: usize },
    #[error("matrix column {index} is `{found}` but the classifier expects `{expected}`")]
    ColumnMismatch {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A trained heading classifier.
///
/// Implementations are immutable once loaded; one instance serves every
/// document of a run.
pub trait HeadingClassifier {
    /// Columns the model was trained on, in order.
    fn feature_names(&self) -> &[String];

    /// One label per matrix row.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, ClassifierError>;

    fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.feature_names().to_vec())
    }
}

/// Check that `matrix` has exactly the columns in `expected`, in order, and
/// that every row is as wide.
pub fn check_matrix(expected: &[String], matrix: &FeatureMatrix) -> Result<(), ClassifierError> {
    if matrix.columns.len() != expected.len() {
        return Err(ClassifierError::ColumnCount {
            expected: expected.len(),
            found: matrix.columns.len(),
        });
    }
    for (index, (want, got)) in expected.iter().zip(&matrix.columns).enumerate() {
        if want != got {
            return Err(ClassifierError::ColumnMismatch {
                index,
                expected: want.clone(),
                found: got.clone(),
            });
        }
    }
    for (row, values) in matrix.rows.iter().enumerate() {
        if values.len() != expected.len() {
            return Err(ClassifierError::RowWidth {
                row,
                expected: expected.len(),
                found: values.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_label_parse_and_display() {
        assert_eq!(Label::parse("H1"), Label::H1);
        assert_eq!(Label::parse("H3"), Label::H3);
        assert_eq!(Label::parse("other"), Label::Other("other".to_string()));
        assert_eq!(Label::parse("h1"), Label::Other("h1".to_string()));
        assert_eq!(Label::H2.to_string(), "H2");
        assert_eq!(Label::Other("body".to_string()).to_string(), "body");
    }

    #[test]
    fn test_label_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Label::H1).unwrap(), "\"H1\"");
        let label: Label = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(label, Label::Other("other".to_string()));
    }

    #[test]
    fn test_check_matrix() {
        let expected = names(&["a", "b"]);
        let ok = FeatureMatrix {
            columns: names(&["a", "b"]),
            rows: vec![vec![1.0, 2.0]],
        };
        assert!(check_matrix(&expected, &ok).is_ok());

        let swapped = FeatureMatrix {
            columns: names(&["b", "a"]),
            rows: vec![],
        };
        assert!(matches!(
            check_matrix(&expected, &swapped),
            Err(ClassifierError::ColumnMismatch { index: 0, .. })
        ));

        let narrow = FeatureMatrix {
            columns: names(&["a"]),
            rows: vec![],
        };
        assert!(matches!(
            check_matrix(&expected, &narrow),
            Err(ClassifierError::ColumnCount { expected: 2, found: 1 })
        ));

        let ragged = FeatureMatrix {
            columns: names(&["a", "b"]),
            rows: vec![vec![1.0, 2.0], vec![1.0]],
        };
        assert!(matches!(
            check_matrix(&expected, &ragged),
            Err(ClassifierError::RowWidth { row: 1, .. })
        ));
    }
}
