//! Document to outline, end to end.

use pdf::Document;
use thiserror::Error;

use crate::classifier::{ClassifierError, HeadingClassifier};
use crate::config::Heuristics;
use crate::encoding::encode;
use crate::features::extract_features;
use crate::outline::{assemble_outline, label_records, Outline};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("classifier returned {found} labels for {expected} lines")]
    LabelCount { expected: usize, found: usize },
}

/// Extract, encode, classify and assemble one document.
///
/// `Ok(None)` means the document has no heading candidates and no output
/// should be written for it.
pub fn process_document(
    doc: &Document,
    title: &str,
    classifier: &dyn HeadingClassifier,
    heuristics: &Heuristics,
) -> Result<Option<Outline>, PipelineError> {
    let records = extract_features(doc, heuristics);
    if records.is_empty() {
        return Ok(None);
    }

    let matrix = encode(&records, classifier.feature_names());
    let labels = classifier.predict(&matrix)?;
    if labels.len() != records.len() {
        return Err(PipelineError::LabelCount {
            expected: records.len(),
            found: labels.len(),
        });
    }

    let labeled = label_records(records, labels);
    let outline = assemble_outline(title, &labeled, heuristics.h3_word_count);
    log::info!(
        "{title}: {} of {} candidate line(s) kept",
        outline.outline.len(),
        labeled.len()
    );
    Ok(Some(outline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Label;
    use crate::encoding::FeatureMatrix;
    use crate::features::tests::{document, line, span};

    /// Labels rows from the `font_size` column: >= 20 is H1, >= 16 is H3.
    struct SizeClassifier {
        names: Vec<String>,
    }

    impl SizeClassifier {
        fn new() -> Self {
            Self {
                names: ["font_size", "is_bold", "lang_latin", "font_Helvetica_Bold"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }
        }
    }

    impl HeadingClassifier for SizeClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, ClassifierError> {
            Ok(matrix
                .rows
                .iter()
                .map(|row| match row[0] {
                    s if s >= 20.0 => Label::H1,
                    s if s >= 16.0 => Label::H3,
                    _ => Label::Other("other".to_string()),
                })
                .collect())
        }
    }

    struct ShortClassifier;

    impl HeadingClassifier for ShortClassifier {
        fn feature_names(&self) -> &[String] {
            &[]
        }

        fn predict(&self, _matrix: &FeatureMatrix) -> Result<Vec<Label>, ClassifierError> {
            Ok(vec![])
        }
    }

    fn body(text: &str) -> pdf::TextLine {
        line(vec![span(text, 10.0, "Times-Roman", 0)])
    }

    #[test]
    fn test_single_heading_document() {
        let doc = document(vec![vec![
            line(vec![span("INTRODUCTION", 24.0, "Helvetica-Bold", 0)]),
            body("Body text one."),
            body("Body text two."),
        ]]);
        let outline = process_document(&doc, "sample", &SizeClassifier::new(), &Heuristics::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            outline.to_json_pretty().unwrap(),
            r#"{
    "title": "sample",
    "outline": [
        {
            "level": "H1",
            "text": "INTRODUCTION",
            "page": 1
        }
    ]
}"#
        );
    }

    #[test]
    fn test_empty_document_yields_none() {
        let doc = document(vec![vec![]]);
        let result =
            process_document(&doc, "empty", &SizeClassifier::new(), &Heuristics::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_body_only_document_yields_none() {
        let doc = document(vec![vec![body("a"), body("b")]]);
        let result =
            process_document(&doc, "plain", &SizeClassifier::new(), &Heuristics::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_h3_word_count_filter() {
        let doc = document(vec![
            vec![body("a"), body("b"), body("c")],
            vec![
                line(vec![span("Six words in this heading line", 16.0, "Arial", 0)]),
                line(vec![span("Seven words in this heading line too", 16.0, "Arial", 0)]),
            ],
        ]);
        let outline = process_document(&doc, "doc", &SizeClassifier::new(), &Heuristics::default())
            .unwrap()
            .unwrap();
        assert_eq!(outline.outline.len(), 1);
        assert_eq!(outline.outline[0].level, Label::H3);
        assert_eq!(outline.outline[0].text, "Six words in this heading line");
        assert_eq!(outline.outline[0].page, 2);
    }

    #[test]
    fn test_candidates_but_no_headings_is_empty_outline() {
        let doc = document(vec![vec![
            body("a"),
            body("b"),
            line(vec![span("Slightly larger", 12.0, "Arial", 0)]),
        ]]);
        let outline = process_document(&doc, "doc", &SizeClassifier::new(), &Heuristics::default())
            .unwrap()
            .unwrap();
        assert!(outline.outline.is_empty());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let doc = document(vec![vec![
            line(vec![span("第1章 概要", 22.0, "MS-Gothic", 0x333333)]),
            body("本文"),
            body("本文"),
            line(vec![span("Six words in this heading line", 16.0, "Arial", 0)]),
        ]]);
        let classifier = SizeClassifier::new();
        let run = || {
            process_document(&doc, "doc", &classifier, &Heuristics::default())
                .unwrap()
                .unwrap()
                .to_json_pretty()
                .unwrap()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.contains("第1章 概要"));
    }

    #[test]
    fn test_label_count_mismatch_is_error() {
        let doc = document(vec![vec![
            body("a"),
            body("b"),
            line(vec![span("Heading", 20.0, "Arial", 0)]),
        ]]);
        let err =
            process_document(&doc, "doc", &ShortClassifier, &Heuristics::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::LabelCount {
                expected: 1,
                found: 0
            }
        ));
    }
}
