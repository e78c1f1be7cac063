//! Age Regression
//!
//! The train/predict collaborator of the age pipeline: a [`Regressor`]
//! turns a feature matrix and per-sample ages into a [`TrainedModel`], and
//! the model predicts ages for any matrix laid out on the same feature axis.

mod forest;
mod model;
mod params;
mod scores;
mod tree;

pub use forest::RandomForestRegressor;
pub use model::{Predictions, TrainedModel, MODEL_FORMAT_VERSION};
pub use params::Hyperparameters;
pub use scores::RegressionScores;

use feature_align::FeatureMatrix;
use std::path::PathBuf;
use thiserror::Error;

/// Errors during training, prediction or model persistence
#[derive(Debug, Error)]
pub enum RegressorError {
    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),
    #[error("Invalid hyperparameters: {0}")]
    InvalidHyperparameters(String),
    #[error("Training failed: {0}")]
    TrainingFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Model I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Model serialization failed: {0}")]
    Serialization(String),
    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Anything that can learn ages from a feature matrix.
///
/// Hyperparameters are bound when the regressor is constructed, so one
/// instance trains any number of independent models.
pub trait Regressor: Send + Sync {
    /// Fit a model; `targets[i]` is the age of `table.sample_ids()[i]`
    fn train(&self, table: &FeatureMatrix, targets: &[f64]) -> Result<TrainedModel, RegressorError>;
}
