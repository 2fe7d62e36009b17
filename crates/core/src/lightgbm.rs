//! Evaluator for LightGBM models saved in text format (`Booster.save_model`).
//!
//! Only what prediction needs is read: the header's class and feature
//! layout, and each tree's split arrays. The text dump carries no class
//! labels, so they are supplied by the caller in the trainer's label order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::classifier::{check_matrix, ClassifierError, HeadingClassifier, Label};
use crate::encoding::FeatureMatrix;

/// Values this close to zero count as zero for zero-as-missing splits.
const ZERO_THRESHOLD: f64 = 1e-35;

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{section}: missing `{key}`")]
    MissingKey { section: String, key: &'static str },
    #[error("{section}: invalid `{key}` value `{value}`")]
    InvalidValue {
        section: String,
        key: &'static str,
        value: String,
    },
    #[error("{section}: {message}")]
    Malformed { section: String, message: String },
    #[error("model has no trees")]
    NoTrees,
    #[error("model predicts {expected} classes but {found} labels were configured")]
    ClassCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

// ---------------------------------------------------------------------------
// Text sections
// ---------------------------------------------------------------------------

/// `key=value` lines of the header or of one `Tree=N` block.
struct Section<'a> {
    name: String,
    entries: HashMap<&'a str, &'a str>,
}

impl<'a> Section<'a> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    fn raw(&self, key: &'static str) -> Result<&'a str, ModelError> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| ModelError::MissingKey {
                section: self.name.clone(),
                key,
            })
    }

    fn invalid(&self, key: &'static str, value: &str) -> ModelError {
        ModelError::InvalidValue {
            section: self.name.clone(),
            key,
            value: value.to_string(),
        }
    }

    fn value<T: FromStr>(&self, key: &'static str) -> Result<T, ModelError> {
        let raw = self.raw(key)?;
        raw.trim().parse().map_err(|_| self.invalid(key, raw))
    }

    fn list<T: FromStr>(&self, key: &'static str) -> Result<Vec<T>, ModelError> {
        self.raw(key)?
            .split_whitespace()
            .map(|item| item.parse().map_err(|_| self.invalid(key, item)))
            .collect()
    }

    /// Like [`Section::list`], empty when the key is absent.
    fn list_or_empty<T: FromStr>(&self, key: &'static str) -> Result<Vec<T>, ModelError> {
        if self.entries.contains_key(key) {
            self.list(key)
        } else {
            Ok(Vec::new())
        }
    }

    fn malformed(&self, message: impl Into<String>) -> ModelError {
        ModelError::Malformed {
            section: self.name.clone(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
    cat_boundaries: Vec<usize>,
    cat_threshold: Vec<u32>,
}

impl Tree {
    fn parse(section: &Section<'_>, num_features: usize) -> Result<Self, ModelError> {
        let num_leaves: usize = section.value("num_leaves")?;
        let leaf_value: Vec<f64> = section.list("leaf_value")?;
        if num_leaves == 0 || leaf_value.len() != num_leaves {
            return Err(section.malformed(format!(
                "{} leaf values for {num_leaves} leaves",
                leaf_value.len()
            )));
        }
        if num_leaves == 1 {
            return Ok(Self {
                split_feature: Vec::new(),
                threshold: Vec::new(),
                decision_type: Vec::new(),
                left_child: Vec::new(),
                right_child: Vec::new(),
                leaf_value,
                cat_boundaries: Vec::new(),
                cat_threshold: Vec::new(),
            });
        }

        let internal = num_leaves - 1;
        let tree = Self {
            split_feature: section.list("split_feature")?,
            threshold: section.list("threshold")?,
            decision_type: section.list("decision_type")?,
            left_child: section.list("left_child")?,
            right_child: section.list("right_child")?,
            leaf_value,
            cat_boundaries: section.list_or_empty("cat_boundaries")?,
            cat_threshold: section.list_or_empty("cat_threshold")?,
        };

        let lengths = [
            ("split_feature", tree.split_feature.len()),
            ("threshold", tree.threshold.len()),
            ("decision_type", tree.decision_type.len()),
            ("left_child", tree.left_child.len()),
            ("right_child", tree.right_child.len()),
        ];
        for (key, len) in lengths {
            if len != internal {
                return Err(section.malformed(format!(
                    "`{key}` has {len} entries for {internal} internal nodes"
                )));
            }
        }

        for node in 0..internal {
            let feature = tree.split_feature[node];
            if feature >= num_features {
                return Err(section.malformed(format!(
                    "node {node} splits on feature {feature} of {num_features}"
                )));
            }
            for child in [tree.left_child[node], tree.right_child[node]] {
                let valid = if child < 0 {
                    ((!child) as usize) < num_leaves
                } else {
                    // Children are numbered after their parent, so walks terminate.
                    (child as usize) > node && (child as usize) < internal
                };
                if !valid {
                    return Err(section.malformed(format!("node {node} has invalid child {child}")));
                }
            }
            if tree.decision_type[node] & CATEGORICAL_MASK != 0 {
                let index = tree.threshold[node] as usize;
                let in_range = index + 1 < tree.cat_boundaries.len()
                    && tree.cat_boundaries[index] <= tree.cat_boundaries[index + 1]
                    && tree.cat_boundaries[index + 1] <= tree.cat_threshold.len();
                if !in_range {
                    return Err(section.malformed(format!(
                        "node {node} refers to missing category set {index}"
                    )));
                }
            }
        }

        Ok(tree)
    }

    fn predict(&self, row: &[f64]) -> f64 {
        if self.leaf_value.len() == 1 {
            return self.leaf_value[0];
        }
        let mut node: i32 = 0;
        while node >= 0 {
            node = self.decide(node as usize, row);
        }
        self.leaf_value[(!node) as usize]
    }

    fn decide(&self, node: usize, row: &[f64]) -> i32 {
        let fval = row.get(self.split_feature[node]).copied().unwrap_or(f64::NAN);
        if self.decision_type[node] & CATEGORICAL_MASK != 0 {
            self.categorical_decision(node, fval)
        } else {
            self.numerical_decision(node, fval)
        }
    }

    fn missing_type(&self, node: usize) -> MissingType {
        match (self.decision_type[node] >> 2) & 3 {
            1 => MissingType::Zero,
            2 => MissingType::NaN,
            _ => MissingType::None,
        }
    }

    fn numerical_decision(&self, node: usize, mut fval: f64) -> i32 {
        let missing = self.missing_type(node);
        if fval.is_nan() && missing != MissingType::NaN {
            fval = 0.0;
        }
        let is_zero = (-ZERO_THRESHOLD..=ZERO_THRESHOLD).contains(&fval);
        if (missing == MissingType::Zero && is_zero) || (missing == MissingType::NaN && fval.is_nan())
        {
            return if self.decision_type[node] & DEFAULT_LEFT_MASK != 0 {
                self.left_child[node]
            } else {
                self.right_child[node]
            };
        }
        if fval <= self.threshold[node] {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }

    fn categorical_decision(&self, node: usize, fval: f64) -> i32 {
        if fval.is_nan() || fval < 0.0 {
            return self.right_child[node];
        }
        let category = fval as usize;
        let set = self.threshold[node] as usize;
        let bits = &self.cat_threshold[self.cat_boundaries[set]..self.cat_boundaries[set + 1]];
        let word = category / 32;
        let hit = bits
            .get(word)
            .is_some_and(|w| (w >> (category % 32)) & 1 == 1);
        if hit {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A gradient-boosted tree classifier read from a LightGBM text dump.
#[derive(Debug, Clone)]
pub struct LightGbmModel {
    feature_names: Vec<String>,
    classes: Vec<Label>,
    num_class: usize,
    trees_per_iteration: usize,
    average_output: bool,
    trees: Vec<Tree>,
}

impl LightGbmModel {
    /// Parse a model dump. `classes` label the model's outputs by index.
    pub fn parse(text: &str, classes: &[String]) -> Result<Self, ModelError> {
        let mut header = Section::new("header");
        let mut average_output = false;
        let mut tree_sections: Vec<Section<'_>> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line == "end of trees" {
                break;
            }
            if line.starts_with("Tree=") {
                tree_sections.push(Section::new(line));
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    let section = tree_sections.last_mut().unwrap_or(&mut header);
                    section.entries.insert(key.trim(), value);
                }
                None if line == "average_output" && tree_sections.is_empty() => {
                    average_output = true;
                }
                None => {}
            }
        }

        let num_class: usize = header.value("num_class")?;
        let trees_per_iteration: usize = match header.entries.get("num_tree_per_iteration") {
            Some(_) => header.value("num_tree_per_iteration")?,
            None => num_class,
        };
        if num_class == 0 || trees_per_iteration == 0 {
            return Err(header.malformed("class and tree counts must be positive"));
        }
        let feature_names: Vec<String> = header.list("feature_names")?;

        if tree_sections.is_empty() {
            return Err(ModelError::NoTrees);
        }
        let trees = tree_sections
            .iter()
            .map(|section| Tree::parse(section, feature_names.len()))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = if num_class == 1 { 2 } else { num_class };
        if classes.len() != expected {
            return Err(ModelError::ClassCount {
                expected,
                found: classes.len(),
            });
        }

        log::debug!(
            "loaded LightGBM model: {} trees, {} classes, {} features",
            trees.len(),
            expected,
            feature_names.len()
        );

        Ok(Self {
            feature_names,
            classes: classes.iter().map(|c| Label::parse(c)).collect(),
            num_class,
            trees_per_iteration,
            average_output,
            trees,
        })
    }

    pub fn load(path: &Path, classes: &[String]) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, classes)
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw (untransformed) score per model output for one row.
    pub fn raw_scores(&self, row: &[f64]) -> Vec<f64> {
        let mut scores = vec![0.0; self.trees_per_iteration];
        for (i, tree) in self.trees.iter().enumerate() {
            scores[i % self.trees_per_iteration] += tree.predict(row);
        }
        if self.average_output {
            let iterations = (self.trees.len() / self.trees_per_iteration).max(1) as f64;
            for score in &mut scores {
                *score /= iterations;
            }
        }
        scores
    }

    fn predict_row(&self, row: &[f64]) -> Label {
        let scores = self.raw_scores(row);
        let index = if self.num_class == 1 {
            usize::from(scores[0] > 0.0)
        } else {
            let mut best = 0;
            for (i, score) in scores.iter().enumerate().take(self.num_class) {
                if *score > scores[best] {
                    best = i;
                }
            }
            best
        };
        self.classes[index].clone()
    }
}

impl HeadingClassifier for LightGbmModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, ClassifierError> {
        check_matrix(&self.feature_names, matrix)?;
        Ok(matrix.rows.iter().map(|row| self.predict_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    fn matrix(columns: &[&str], rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// One stump on `font_size`: <= 14 scores -1, otherwise +1.
    const BINARY: &str = "tree
version=v4
num_class=1
num_tree_per_iteration=1
label_index=0
max_feature_idx=1
objective=binary sigmoid:1
feature_names=font_size is_bold
feature_infos=[8:30] [0:1]
tree_sizes=300

Tree=0
num_leaves=2
num_cat=0
split_feature=0
split_gain=10
threshold=14.000000000000002
decision_type=2
left_child=-1
right_child=-2
leaf_value=-1 1
leaf_weight=5 5
leaf_count=5 5
internal_value=0
internal_weight=0
internal_count=10
is_linear=0
shrinkage=1


end of trees

feature_importances:
font_size=1

parameters:
[boosting: gbdt]
end of parameters
";

    #[test]
    fn test_binary_stump() {
        let model = LightGbmModel::parse(BINARY, &classes(&["body", "heading"])).unwrap();
        assert_eq!(model.num_trees(), 1);
        assert_eq!(model.feature_names(), &["font_size", "is_bold"]);

        let labels = model
            .predict(&matrix(
                &["font_size", "is_bold"],
                vec![vec![12.0, 0.0], vec![14.0, 1.0], vec![24.0, 1.0]],
            ))
            .unwrap();
        assert_eq!(
            labels,
            vec![
                Label::Other("body".to_string()),
                Label::Other("body".to_string()),
                Label::Other("heading".to_string()),
            ]
        );
    }

    #[test]
    fn test_binary_needs_two_classes() {
        let err = LightGbmModel::parse(BINARY, &classes(&["H1"])).unwrap_err();
        assert!(matches!(err, ModelError::ClassCount { expected: 2, found: 1 }));
    }

    #[test]
    fn test_predict_rejects_wrong_columns() {
        let model = LightGbmModel::parse(BINARY, &classes(&["a", "b"])).unwrap();
        let err = model
            .predict(&matrix(&["font_size"], vec![vec![12.0]]))
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ColumnCount { .. }));
    }

    /// Three classes, one iteration. Class 0 likes large bold text, class 1
    /// large regular text, class 2 (other) fires for small text.
    const MULTICLASS: &str = "tree
version=v4
num_class=3
num_tree_per_iteration=3
max_feature_idx=1
objective=multiclass num_class:3
feature_names=font_size is_bold

Tree=0
num_leaves=3
split_feature=0 1
threshold=16 0.5
decision_type=2 2
left_child=-1 -2
right_child=1 -3
leaf_value=-2 -1 3

Tree=1
num_leaves=3
split_feature=0 1
threshold=16 0.5
decision_type=2 2
left_child=-1 -2
right_child=1 -3
leaf_value=-2 3 -1

Tree=2
num_leaves=2
split_feature=0
threshold=16
decision_type=2
left_child=-1
right_child=-2
leaf_value=2 -2

end of trees
";

    #[test]
    fn test_multiclass_argmax() {
        let model =
            LightGbmModel::parse(MULTICLASS, &classes(&["H1", "H2", "other"])).unwrap();
        let labels = model
            .predict(&matrix(
                &["font_size", "is_bold"],
                vec![vec![24.0, 1.0], vec![24.0, 0.0], vec![12.0, 1.0]],
            ))
            .unwrap();
        assert_eq!(
            labels,
            vec![Label::H1, Label::H2, Label::Other("other".to_string())]
        );
    }

    #[test]
    fn test_multiclass_raw_scores_sum_per_class() {
        let model =
            LightGbmModel::parse(MULTICLASS, &classes(&["H1", "H2", "other"])).unwrap();
        assert_eq!(model.raw_scores(&[24.0, 1.0]), vec![3.0, -1.0, -2.0]);
        assert_eq!(model.raw_scores(&[12.0, 0.0]), vec![-2.0, -2.0, 2.0]);
    }

    #[test]
    fn test_multiclass_tie_goes_to_first_class() {
        let text = "num_class=2
num_tree_per_iteration=2
feature_names=x
Tree=0
num_leaves=1
leaf_value=0.5
Tree=1
num_leaves=1
leaf_value=0.5
end of trees
";
        let model = LightGbmModel::parse(text, &classes(&["H2", "H3"])).unwrap();
        let labels = model.predict(&matrix(&["x"], vec![vec![0.0]])).unwrap();
        assert_eq!(labels, vec![Label::H2]);
    }

    fn stump(decision_type: u8, threshold: f64) -> String {
        format!(
            "num_class=1
feature_names=x
Tree=0
num_leaves=2
split_feature=0
threshold={threshold}
decision_type={decision_type}
left_child=-1
right_child=-2
leaf_value=-1 1
end of trees
"
        )
    }

    fn goes_left(model: &LightGbmModel, x: f64) -> bool {
        model.raw_scores(&[x])[0] < 0.0
    }

    #[test]
    fn test_missing_none_treats_nan_as_zero() {
        let model = LightGbmModel::parse(&stump(0, 0.5), &classes(&["a", "b"])).unwrap();
        assert!(goes_left(&model, f64::NAN));
        assert!(!goes_left(&model, 1.0));

        let model = LightGbmModel::parse(&stump(0, -0.5), &classes(&["a", "b"])).unwrap();
        assert!(!goes_left(&model, f64::NAN));
    }

    #[test]
    fn test_missing_zero_uses_default_direction() {
        // missing type Zero (4), default right: zero goes right despite 0 <= 0.5.
        let model = LightGbmModel::parse(&stump(4, 0.5), &classes(&["a", "b"])).unwrap();
        assert!(!goes_left(&model, 0.0));
        assert!(!goes_left(&model, f64::NAN));
        assert!(goes_left(&model, 0.25));

        // missing type Zero with default left (4 | 2).
        let model = LightGbmModel::parse(&stump(6, -0.5), &classes(&["a", "b"])).unwrap();
        assert!(goes_left(&model, 0.0));
        assert!(!goes_left(&model, 1.0));
    }

    #[test]
    fn test_missing_nan_uses_default_direction() {
        // missing type NaN (8) with default left (2).
        let model = LightGbmModel::parse(&stump(10, -5.0), &classes(&["a", "b"])).unwrap();
        assert!(goes_left(&model, f64::NAN));
        // Zero is an ordinary value here.
        assert!(!goes_left(&model, 0.0));

        let model = LightGbmModel::parse(&stump(8, 5.0), &classes(&["a", "b"])).unwrap();
        assert!(!goes_left(&model, f64::NAN));
    }

    #[test]
    fn test_categorical_split() {
        // Categories 1 and 33 go left: words 0b10 and 0b10.
        let text = "num_class=1
feature_names=x
Tree=0
num_leaves=2
num_cat=1
split_feature=0
threshold=0
decision_type=1
left_child=-1
right_child=-2
leaf_value=-1 1
cat_boundaries=0 2
cat_threshold=2 2
end of trees
";
        let model = LightGbmModel::parse(text, &classes(&["a", "b"])).unwrap();
        assert!(goes_left(&model, 1.0));
        assert!(goes_left(&model, 33.0));
        assert!(!goes_left(&model, 0.0));
        assert!(!goes_left(&model, 2.0));
        assert!(!goes_left(&model, 64.0));
        assert!(!goes_left(&model, -1.0));
        assert!(!goes_left(&model, f64::NAN));
    }

    #[test]
    fn test_average_output_divides_by_iterations() {
        let text = "num_class=1
feature_names=x
average_output
Tree=0
num_leaves=1
leaf_value=2
Tree=1
num_leaves=1
leaf_value=4
end of trees
";
        let model = LightGbmModel::parse(text, &classes(&["a", "b"])).unwrap();
        assert_eq!(model.raw_scores(&[0.0]), vec![3.0]);
    }

    #[test]
    fn test_parse_errors() {
        let all = classes(&["a", "b"]);
        assert!(matches!(
            LightGbmModel::parse("feature_names=x\nTree=0\n", &all),
            Err(ModelError::MissingKey { key: "num_class", .. })
        ));
        assert!(matches!(
            LightGbmModel::parse("num_class=1\nfeature_names=x\n", &all),
            Err(ModelError::NoTrees)
        ));
        assert!(matches!(
            LightGbmModel::parse("num_class=two\nfeature_names=x\n", &all),
            Err(ModelError::InvalidValue { key: "num_class", .. })
        ));
        // Split on a feature the model does not have.
        let text = stump(0, 0.5).replace("split_feature=0", "split_feature=3");
        assert!(matches!(
            LightGbmModel::parse(&text, &all),
            Err(ModelError::Malformed { .. })
        ));
        // Child pointing back at its parent.
        let text = stump(0, 0.5).replace("left_child=-1", "left_child=0");
        assert!(matches!(
            LightGbmModel::parse(&text, &all),
            Err(ModelError::Malformed { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LightGbmModel::load(Path::new("/nonexistent/model.txt"), &classes(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
