//! Pipeline Configuration
//!
//! Layered sources, later ones winning: built-in defaults, an optional
//! `microbiome-age.{toml,yaml,json}` in the working directory (or an
//! explicit file), then `MICROBIOME_AGE__*` environment variables such as
//! `MICROBIOME_AGE__HYPERPARAMETERS__N_ESTIMATORS=100`.

use crate::PipelineError;
use age_regressor::Hyperparameters;
use config::{Config, Environment, File};
use feature_table::Orientation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Settings shared by every pipeline action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Metadata column holding the known age
    pub target_field: String,
    /// Metadata column the predictions are written to
    pub prediction_column: String,
    /// Layout of feature table files
    pub orientation: Orientation,
    pub log_level: String,
    pub log_json: bool,
    pub hyperparameters: Hyperparameters,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_field: "age".to_string(),
            prediction_column: "predicted_age".to_string(),
            orientation: Orientation::default(),
            log_level: "info".to_string(),
            log_json: false,
            hyperparameters: Hyperparameters::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration; an explicit `file` must exist
    pub fn load(file: Option<&Path>) -> Result<Self, PipelineError> {
        let source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("microbiome-age").required(false),
        };

        let settings = Config::builder()
            .add_source(source)
            .add_source(
                Environment::with_prefix("MICROBIOME_AGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.hyperparameters.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_field, "age");
        assert_eq!(config.prediction_column, "predicted_age");
        assert_eq!(config.orientation, Orientation::FeaturesAsRows);
        assert_eq!(config.hyperparameters.n_estimators, 500);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(
            &path,
            r#"
target_field = "host_age"
orientation = "samples_as_rows"

[hyperparameters]
n_estimators = 50
seed = 7
"#,
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.target_field, "host_age");
        assert_eq!(config.orientation, Orientation::SamplesAsRows);
        assert_eq!(config.hyperparameters.n_estimators, 50);
        assert_eq!(config.hyperparameters.seed, 7);
        // Untouched fields keep their defaults
        assert_eq!(config.prediction_column, "predicted_age");
        assert_eq!(config.hyperparameters.min_samples_leaf, 1);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_invalid_hyperparameters_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[hyperparameters]\nn_estimators = 0\n").unwrap();

        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, PipelineError::Regressor(_)));
    }
}
