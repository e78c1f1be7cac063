//! Microbiome Age Pipeline
//!
//! Trains an age regressor on one feature table, aligns a second table to
//! the trained feature axis, and writes predicted ages back into the test
//! metadata.

mod actions;
mod batch;
mod config;
mod logging;
mod plugin;

pub use actions::{
    age_prediction_with_train_data, age_prediction_with_trained_model, pad_features_in_test_data,
    train_age_model, PredictionOutcome,
};
pub use batch::align_batch;
pub use crate::config::PipelineConfig;
pub use logging::init_logging;
pub use plugin::{
    microbiome_age_registry, ActionRegistry, ActionSignature, Citation, ParameterSpec, PluginInfo,
    SemanticType,
};

use age_regressor::RegressorError;
use feature_align::AlignError;
use feature_table::TableError;
use thiserror::Error;

/// Errors surfaced by pipeline actions
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Regressor(#[from] RegressorError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Target field '{0}' not found in training metadata")]
    TargetFieldNotFound(String),
    #[error("No usable training samples: {0}")]
    NoTrainingSamples(String),
    #[error("Action '{0}' is already registered")]
    DuplicateAction(String),
}

impl From<::config::ConfigError> for PipelineError {
    fn from(err: ::config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
