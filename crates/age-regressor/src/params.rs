//! Forest Hyperparameters

use crate::RegressorError;
use serde::{Deserialize, Serialize};

/// Random-forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum tree depth (None = grow until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Fraction of features considered at each split (0, 1]
    pub max_features: f64,
    /// Draw a bootstrap sample for every tree
    pub bootstrap: bool,
    /// Worker threads for tree building (0 = all cores)
    pub n_jobs: usize,
    /// Base RNG seed; tree `t` uses `seed + t`
    pub seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: 1.0,
            bootstrap: true,
            n_jobs: 4,
            seed: 42,
        }
    }
}

impl Hyperparameters {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), RegressorError> {
        if self.n_estimators == 0 {
            return Err(RegressorError::InvalidHyperparameters(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(RegressorError::InvalidHyperparameters(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(RegressorError::InvalidHyperparameters(format!(
                "max_features must be in (0, 1], got {}",
                self.max_features
            )));
        }
        Ok(())
    }

    /// Features to try at each split for a table of `n_features`
    pub(crate) fn features_per_split(&self, n_features: usize) -> usize {
        ((n_features as f64 * self.max_features) as usize).clamp(1, n_features.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = Hyperparameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.n_estimators, 500);
    }

    #[test]
    fn test_invalid_ranges() {
        let zero_trees = Hyperparameters {
            n_estimators: 0,
            ..Default::default()
        };
        assert!(zero_trees.validate().is_err());

        let bad_fraction = Hyperparameters {
            max_features: 1.5,
            ..Default::default()
        };
        assert!(bad_fraction.validate().is_err());
    }

    #[test]
    fn test_features_per_split() {
        let params = Hyperparameters {
            max_features: 0.3,
            ..Default::default()
        };
        assert_eq!(params.features_per_split(10), 3);
        assert_eq!(params.features_per_split(1), 1);
    }
}
