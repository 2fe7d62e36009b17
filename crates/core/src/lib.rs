//! Core library for pdfoutline
//!
//! This crate is the **Functional Core** of pdfoutline: everything between a
//! laid-out [`pdf::Document`] and the outline JSON, with no file or terminal
//! I/O beyond reading the model and config files it is pointed at.
//!
//! # Architecture Overview
//!
//! - **`pdf`**: PDF parsing and text layout (pages, blocks, lines, spans)
//! - **`pdfoutline_core`** (this crate): heading candidates, feature encoding,
//!   classification and outline assembly
//! - **`pdfoutline`**: the command-line shell that walks directories, loads
//!   the model and writes JSON files
//!
//! # Pipeline
//!
//! ```text
//! Document ─► features ─► encoding ─► classifier ─► outline
//!             (body size,  (one-hot,    (LightGBM     (H3 word
//!              candidates)  schema)      trees)        rule)
//! ```
//!
//! # Module Organization
//!
//! - [`script`]: Latin/Japanese tagging of a line
//! - [`features`]: body-size baseline and per-line [`features::FeatureRecord`]s
//! - [`encoding`]: feature matrix aligned to a trained [`encoding::FeatureSchema`]
//! - [`classifier`]: the [`classifier::HeadingClassifier`] seam and [`classifier::Label`]
//! - [`lightgbm`]: evaluator for LightGBM text models
//! - [`outline`]: post-classification filtering and the output document
//! - [`pipeline`]: [`pipeline::process_document`], the whole chain for one document
//! - [`config`]: `pdfoutline.toml` settings
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pdfoutline_core::{config::Config, lightgbm::LightGbmModel, pipeline::process_document};
//!
//! let config = Config::default();
//! let model = LightGbmModel::load(&config.model.path, &config.model.classes)?;
//! let doc = pdf::load_file("report.pdf".as_ref())?;
//!
//! if let Some(outline) = process_document(&doc, "report", &model, &config.heuristics)? {
//!     println!("{}", outline.to_json_pretty()?);
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod encoding;
pub mod features;
pub mod lightgbm;
pub mod outline;
pub mod pipeline;
pub mod script;
