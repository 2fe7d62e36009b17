//! `pdfoutline.toml` settings.
//!
//! Every field has a default so an absent or partial file is valid. The
//! binary layers its command-line flags on top of what is read here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classes in the trainer's sorted label order.
pub const DEFAULT_CLASSES: [&str; 4] = ["H1", "H2", "H3", "other"];
pub const DEFAULT_H3_WORD_COUNT: usize = 6;
pub const DEFAULT_BOLD_MARKER: &str = "Bold";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub heuristics: Heuristics,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// LightGBM text model.
    pub path: PathBuf,
    /// Label for each model output, by class index.
    pub classes: Vec<String>,
    /// Pinned feature schema checked against the model at load time.
    pub schema: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("heading_classifier.txt"),
            classes: DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
            schema: None,
        }
    }
}

/// Tuned constants of the extractor and the assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// An "H3" line is kept only with exactly this many words.
    pub h3_word_count: usize,
    /// Case-sensitive substring marking a bold font name.
    pub bold_marker: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            h3_word_count: DEFAULT_H3_WORD_COUNT,
            bold_marker: DEFAULT_BOLD_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output: PathBuf::from("output"),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Read `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.heuristics.h3_word_count, 6);
        assert_eq!(config.heuristics.bold_marker, "Bold");
        assert_eq!(config.model.classes, vec!["H1", "H2", "H3", "other"]);
        assert_eq!(config.model.path, PathBuf::from("heading_classifier.txt"));
        assert!(config.model.schema.is_none());
        assert_eq!(config.paths.input, PathBuf::from("input"));
        assert_eq!(config.paths.output, PathBuf::from("output"));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [heuristics]
            h3_word_count = 5

            [model]
            schema = "schema.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.heuristics.h3_word_count, 5);
        assert_eq!(config.heuristics.bold_marker, "Bold");
        assert_eq!(config.model.schema, Some(PathBuf::from("schema.json")));
        assert_eq!(config.model.classes.len(), 4);
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = Config::from_toml_str("[heuristics]\nh3_word_count = \"six\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[paths]\ninput = \"pdfs\"\noutput = \"json\"\n\n[model]\nclasses = [\"a\", \"b\"]"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.paths.input, PathBuf::from("pdfs"));
        assert_eq!(config.paths.output, PathBuf::from("json"));
        assert_eq!(config.model.classes, vec!["a", "b"]);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/pdfoutline.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_or_default_without_path() {
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
