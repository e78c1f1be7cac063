//! Trained Model and Predictions

use crate::tree::RegressionTree;
use crate::RegressorError;
use feature_align::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Version stamped into every saved model
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Ensemble of fitted trees; predictions are the mean over trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<RegressionTree>,
}

impl Forest {
    pub(crate) fn new(trees: Vec<RegressionTree>) -> Self {
        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn avg_depth(&self) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.depth() as f64).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_nodes(&self) -> usize {
        self.trees.iter().map(RegressionTree::n_nodes).sum()
    }

    /// Reject forests whose trees cannot be traversed over `n_features`
    fn validate(&self, n_features: usize) -> Result<(), RegressorError> {
        if self.trees.is_empty() {
            return Err(RegressorError::Serialization(
                "model contains no trees".to_string(),
            ));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features).map_err(|reason| {
                RegressorError::Serialization(format!("tree {}: {}", t, reason))
            })?;
        }
        Ok(())
    }

    fn predict_row(&self, row: ndarray::ArrayView1<'_, f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        total / self.trees.len() as f64
    }
}

/// A fitted model bound to the feature axis it was trained on.
///
/// Prediction requires the input table to carry exactly that axis, in the
/// same order; align test tables to [`TrainedModel::feature_ids`] first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    format_version: u32,
    feature_ids: Vec<String>,
    forest: Forest,
    n_training_samples: usize,
}

impl TrainedModel {
    pub(crate) fn new(feature_ids: Vec<String>, forest: Forest, n_training_samples: usize) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            feature_ids,
            forest,
            n_training_samples,
        }
    }

    /// Feature axis the model was trained on
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    pub fn n_training_samples(&self) -> usize {
        self.n_training_samples
    }

    /// Predict an age for every sample of `table`
    pub fn predict(&self, table: &FeatureMatrix) -> Result<Predictions, RegressorError> {
        if table.feature_ids() != self.feature_ids.as_slice() {
            let shared = table
                .feature_ids()
                .iter()
                .filter(|f| self.feature_ids.contains(*f))
                .count();
            return Err(RegressorError::InvalidInputShape {
                expected: format!("{} trained features in training order", self.feature_ids.len()),
                actual: format!(
                    "{} features ({} shared); align the table first",
                    table.n_features(),
                    shared
                ),
            });
        }

        let values: Vec<f64> = table
            .values()
            .rows()
            .into_iter()
            .map(|row| self.forest.predict_row(row))
            .collect();
        debug!("Predicted {} samples", values.len());

        Ok(Predictions {
            sample_ids: table.sample_ids().to_vec(),
            values,
        })
    }

    /// Save the model in postcard binary encoding
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RegressorError> {
        let path = path.as_ref();
        let bytes =
            postcard::to_allocvec(self).map_err(|e| RegressorError::Serialization(e.to_string()))?;
        fs::write(path, &bytes).map_err(|source| RegressorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved model to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Load a model written by [`TrainedModel::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegressorError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| RegressorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self =
            postcard::from_bytes(&bytes).map_err(|e| RegressorError::Serialization(e.to_string()))?;
        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(RegressorError::UnsupportedVersion {
                found: model.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        model.forest.validate(model.feature_ids.len())?;
        info!(
            "Loaded model from {}: {} trees, {} features",
            path.display(),
            model.n_trees(),
            model.feature_ids.len()
        );
        Ok(model)
    }
}

/// Predicted ages, one per sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub sample_ids: Vec<String>,
    pub values: Vec<f64>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Prediction for one sample
    pub fn get(&self, sample: &str) -> Option<f64> {
        self.sample_ids
            .iter()
            .position(|s| s == sample)
            .map(|i| self.values[i])
    }

    /// (sample id, prediction) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.sample_ids
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hyperparameters, RandomForestRegressor, Regressor};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn trained() -> (TrainedModel, FeatureMatrix) {
        let table = FeatureMatrix::from_rows(
            names(&["a", "b", "c", "d"]),
            names(&["otu1", "otu2"]),
            vec![
                vec![0.0, 1.0],
                vec![1.0, 1.0],
                vec![5.0, 0.0],
                vec![6.0, 0.0],
            ],
        )
        .unwrap();
        let params = Hyperparameters {
            n_estimators: 5,
            n_jobs: 1,
            ..Default::default()
        };
        let model = RandomForestRegressor::new(params)
            .unwrap()
            .train(&table, &[10.0, 12.0, 50.0, 52.0])
            .unwrap();
        (model, table)
    }

    #[test]
    fn test_predict_rejects_unaligned_table() {
        let (model, _) = trained();
        let reordered = FeatureMatrix::from_rows(
            names(&["x"]),
            names(&["otu2", "otu1"]),
            vec![vec![1.0, 0.0]],
        )
        .unwrap();

        let err = model.predict(&reordered).unwrap_err();
        assert!(matches!(err, RegressorError::InvalidInputShape { .. }));
    }

    #[test]
    fn test_predict_empty_table() {
        let (model, _) = trained();
        let empty = FeatureMatrix::empty(names(&["otu1", "otu2"])).unwrap();
        let predictions = model.predict(&empty).unwrap();
        assert!(predictions.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (model, table) = trained();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("age.model");

        model.save(&path).unwrap();
        let loaded = TrainedModel::load(&path).unwrap();

        assert_eq!(loaded, model);
        assert_eq!(loaded.predict(&table).unwrap(), model.predict(&table).unwrap());
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.model");
        std::fs::write(&path, b"not a model").unwrap();

        assert!(TrainedModel::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_treeless_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.model");
        TrainedModel::new(names(&["otu1"]), Forest::new(Vec::new()), 0)
            .save(&path)
            .unwrap();

        let err = TrainedModel::load(&path).unwrap_err();
        assert!(matches!(err, RegressorError::Serialization(_)));
    }

    #[test]
    fn test_load_rejects_tree_without_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hollow.model");
        let hollow = RegressionTree::from_nodes(Vec::new());
        TrainedModel::new(names(&["otu1"]), Forest::new(vec![hollow]), 3)
            .save(&path)
            .unwrap();

        let err = TrainedModel::load(&path).unwrap_err();
        assert!(matches!(err, RegressorError::Serialization(_)));
    }

    #[test]
    fn test_prediction_lookup() {
        let predictions = Predictions {
            sample_ids: names(&["s1", "s2"]),
            values: vec![31.0, 47.5],
        };
        assert_eq!(predictions.get("s2"), Some(47.5));
        assert_eq!(predictions.get("s3"), None);
        assert_eq!(predictions.iter().count(), 2);
    }
}
