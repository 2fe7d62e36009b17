use std::path::{Path, PathBuf};

use pdfoutline_core::classifier::HeadingClassifier;
use pdfoutline_core::config::Config;
use pdfoutline_core::encoding::FeatureSchema;
use pdfoutline_core::lightgbm::LightGbmModel;

use crate::prelude::*;

/// Picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "pdfoutline.toml";

/// Configuration plus the classifier it points at, loaded once per run.
pub struct Settings {
    pub config: Config,
    pub model: LightGbmModel,
}

impl Settings {
    pub fn load(global: &crate::Global) -> Result<Self> {
        let config = load_config(global)?;
        let model = load_model(&config)?;
        Ok(Self { config, model })
    }
}

fn config_path(global: &crate::Global) -> Option<PathBuf> {
    global.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    })
}

/// Read the config file and apply command-line overrides.
pub fn load_config(global: &crate::Global) -> Result<Config> {
    let path = config_path(global);
    let mut config = Config::load_or_default(path.as_deref())?;
    if let Some(model) = &global.model {
        config.model.path = model.clone();
    }
    log::debug!("model: {}", config.model.path.display());
    Ok(config)
}

/// Load the classifier and check it against the pinned schema, if any.
pub fn load_model(config: &Config) -> Result<LightGbmModel> {
    let model = LightGbmModel::load(&config.model.path, &config.model.classes)
        .wrap_err_with(|| f!("failed to load model {}", config.model.path.display()))?;

    if let Some(schema_path) = &config.model.schema {
        verify_schema(schema_path, &model)?;
    }
    Ok(model)
}

fn verify_schema(path: &Path, model: &LightGbmModel) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| f!("failed to read feature schema {}", path.display()))?;
    let schema = FeatureSchema::from_json(&raw)?;
    schema
        .verify_against(model.feature_names())
        .map_err(|err| Error::SchemaDrift {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
    log::debug!("feature schema {} matches the model", path.display());
    Ok(())
}
