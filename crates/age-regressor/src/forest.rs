//! Random Forest Regressor

use crate::model::{Forest, TrainedModel};
use crate::params::Hyperparameters;
use crate::tree::{GrowthLimits, RegressionTree};
use crate::{Regressor, RegressorError};
use feature_align::FeatureMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Bootstrap-bagged ensemble of CART regression trees.
///
/// Each tree draws its own RNG from `seed + tree_index`, so a forest is
/// reproducible regardless of how many worker threads build it.
#[derive(Debug, Clone, Default)]
pub struct RandomForestRegressor {
    params: Hyperparameters,
}

impl RandomForestRegressor {
    /// Create a regressor with the given hyperparameters
    pub fn new(params: Hyperparameters) -> Result<Self, RegressorError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    fn check_training_data(table: &FeatureMatrix, targets: &[f64]) -> Result<(), RegressorError> {
        if table.n_samples() == 0 {
            return Err(RegressorError::InvalidTrainingData(
                "training table has no samples".to_string(),
            ));
        }
        if table.n_features() == 0 {
            return Err(RegressorError::InvalidTrainingData(
                "training table has no features".to_string(),
            ));
        }
        if targets.len() != table.n_samples() {
            return Err(RegressorError::InvalidTrainingData(format!(
                "{} targets for {} samples",
                targets.len(),
                table.n_samples()
            )));
        }
        if let Some(pos) = targets.iter().position(|t| !t.is_finite()) {
            return Err(RegressorError::InvalidTrainingData(format!(
                "target for sample '{}' is not a finite number",
                table.sample_ids()[pos]
            )));
        }
        Ok(())
    }
}

impl Regressor for RandomForestRegressor {
    fn train(&self, table: &FeatureMatrix, targets: &[f64]) -> Result<TrainedModel, RegressorError> {
        Self::check_training_data(table, targets)?;

        let start = Instant::now();
        let params = &self.params;
        let n_samples = table.n_samples();
        let limits = GrowthLimits {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
            features_per_split: params.features_per_split(table.n_features()),
        };

        info!(
            "Training random forest: {} trees on {} samples x {} features ({} jobs)",
            params.n_estimators,
            n_samples,
            table.n_features(),
            params.n_jobs
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.n_jobs)
            .build()
            .map_err(|e| RegressorError::TrainingFailed(e.to_string()))?;

        let x = table.values();
        let trees: Vec<RegressionTree> = pool.install(|| {
            (0..params.n_estimators)
                .into_par_iter()
                .map(|t| {
                    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                    let rows = if params.bootstrap {
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                    } else {
                        (0..n_samples).collect()
                    };
                    RegressionTree::fit(x, targets, rows, limits, &mut rng)
                })
                .collect()
        });

        let forest = Forest::new(trees);
        debug!(
            "Forest built in {}ms, {} nodes, average depth {:.1}",
            start.elapsed().as_millis(),
            forest.n_nodes(),
            forest.avg_depth()
        );

        Ok(TrainedModel::new(
            table.feature_ids().to_vec(),
            forest,
            n_samples,
        ))
    }
}
