//! Age Prediction Actions

use crate::config::PipelineConfig;
use crate::PipelineError;
use age_regressor::{Predictions, RegressionScores, Regressor, TrainedModel};
use feature_align::{Alignment, AlignmentReport, FeatureAligner, FeatureMatrix};
use feature_table::{NumericColumn, SampleMetadata, TableError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of predicting ages for a test table
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    /// Test metadata with the prediction column appended
    #[serde(skip)]
    pub updated_metadata: SampleMetadata,
    pub predictions: Predictions,
    /// Model trained for this prediction; `None` when a saved model was used
    #[serde(skip)]
    pub model: Option<TrainedModel>,
    pub alignment: AlignmentReport,
    /// Present when the test metadata carries known ages
    pub scores: Option<RegressionScores>,
}

/// Reshape `test_table` onto the feature axis of `train_table`
pub fn pad_features_in_test_data(
    train_table: &FeatureMatrix,
    test_table: &FeatureMatrix,
) -> Result<Alignment, PipelineError> {
    let alignment = FeatureAligner::align_to(train_table, test_table)?;
    for warning in alignment.report.warnings() {
        warn!("Padding test table: {}", warning);
    }
    info!(
        "Padded test table: {} shared, {} zero-filled, {} dropped, shape {:?}",
        alignment.report.n_shared(),
        alignment.report.n_padded(),
        alignment.report.n_dropped(),
        alignment.matrix.shape()
    );
    Ok(alignment)
}

/// Train a regressor on the samples of `train_table` that have a known age.
///
/// Metadata is first restricted to the table's samples, then samples with a
/// missing target are dropped and the table is restricted to what remains.
pub fn train_age_model(
    regressor: &dyn Regressor,
    train_table: &FeatureMatrix,
    train_metadata: &SampleMetadata,
    target_field: &str,
) -> Result<TrainedModel, PipelineError> {
    let target = match train_metadata.numeric_column(target_field) {
        Ok(column) => column,
        Err(TableError::ColumnNotFound(name)) => return Err(PipelineError::TargetFieldNotFound(name)),
        Err(e) => return Err(e.into()),
    };

    let target = target
        .filter_ids(train_table.sample_ids())
        .drop_missing_values();
    if target.is_empty() {
        return Err(PipelineError::NoTrainingSamples(format!(
            "none of the {} training samples has a value for '{}'",
            train_table.n_samples(),
            target_field
        )));
    }

    let (ids, ages): (Vec<&str>, Vec<f64>) = target.observed().unzip();
    let table = train_table.select_samples(&ids)?;
    debug!(
        "Training on {} of {} samples ({} without '{}')",
        table.n_samples(),
        train_table.n_samples(),
        train_table.n_samples() - table.n_samples(),
        target_field
    );

    Ok(regressor.train(&table, &ages)?)
}

/// Predict ages for `test_table` with an already trained model
pub fn age_prediction_with_trained_model(
    model: &TrainedModel,
    test_table: &FeatureMatrix,
    test_metadata: &SampleMetadata,
    config: &PipelineConfig,
) -> Result<PredictionOutcome, PipelineError> {
    let alignment = FeatureAligner::align(model.feature_ids(), test_table)?;
    if alignment.report.is_empty_overlap() {
        warn!(
            "Test table shares none of the model's {} features ({} test features); predictions will be degenerate",
            model.feature_ids().len(),
            test_table.n_features()
        );
    }

    let predictions = model.predict(&alignment.matrix)?;
    let column = NumericColumn::new(
        config.prediction_column.as_str(),
        predictions
            .iter()
            .map(|(id, age)| (id.to_string(), Some(age)))
            .collect(),
    );
    let updated_metadata = test_metadata.with_column(&column);
    let scores = score_predictions(test_metadata, &config.target_field, &predictions);

    info!(
        "Predicted ages for {} samples into column '{}'",
        predictions.len(),
        config.prediction_column
    );
    if let Some(s) = &scores {
        info!("Test accuracy on {} samples: MAE {:.3}, R2 {:.3}", s.n, s.mae, s.r2);
    }

    Ok(PredictionOutcome {
        updated_metadata,
        predictions,
        model: None,
        alignment: alignment.report,
        scores,
    })
}

/// Train on the training data, then predict ages for `test_table`
pub fn age_prediction_with_train_data(
    regressor: &dyn Regressor,
    train_table: &FeatureMatrix,
    train_metadata: &SampleMetadata,
    test_table: &FeatureMatrix,
    test_metadata: &SampleMetadata,
    config: &PipelineConfig,
) -> Result<PredictionOutcome, PipelineError> {
    let model = train_age_model(regressor, train_table, train_metadata, &config.target_field)?;
    let mut outcome = age_prediction_with_trained_model(&model, test_table, test_metadata, config)?;
    outcome.model = Some(model);
    Ok(outcome)
}

/// Compare predictions against known ages, if the metadata has any
fn score_predictions(
    metadata: &SampleMetadata,
    target_field: &str,
    predictions: &Predictions,
) -> Option<RegressionScores> {
    let known = match metadata.numeric_column(target_field) {
        Ok(column) => column,
        Err(e) => {
            debug!("Not scoring predictions: {}", e);
            return None;
        }
    };

    let (truth, predicted): (Vec<f64>, Vec<f64>) = predictions
        .iter()
        .filter_map(|(id, p)| known.get(id).map(|t| (t, p)))
        .unzip();
    RegressionScores::compute(&truth, &predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use age_regressor::{Hyperparameters, RandomForestRegressor};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn metadata(rows: &[(&str, &str)]) -> SampleMetadata {
        SampleMetadata::new(
            "sample_id".to_string(),
            names(&["age"]),
            rows.iter()
                .map(|(id, age)| (id.to_string(), vec![age.to_string()]))
                .collect(),
        )
        .unwrap()
    }

    /// otu1 tracks age, otu2 is constant
    fn train_data() -> (FeatureMatrix, SampleMetadata) {
        let table = FeatureMatrix::from_rows(
            names(&["t1", "t2", "t3", "t4", "t5", "t6"]),
            names(&["otu1", "otu2"]),
            vec![
                vec![0.1, 0.5],
                vec![0.2, 0.5],
                vec![0.3, 0.5],
                vec![0.7, 0.5],
                vec![0.8, 0.5],
                vec![0.9, 0.5],
            ],
        )
        .unwrap();
        let meta = metadata(&[
            ("t1", "10"),
            ("t2", "12"),
            ("t3", "14"),
            ("t4", "60"),
            ("t5", "62"),
            ("t6", "NA"),
            ("unsequenced", "30"),
        ]);
        (table, meta)
    }

    fn regressor() -> RandomForestRegressor {
        RandomForestRegressor::new(Hyperparameters {
            n_estimators: 10,
            n_jobs: 1,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_pad_features() {
        let train = FeatureMatrix::from_rows(
            names(&["a"]),
            names(&["f1", "f2", "f3"]),
            vec![vec![1.0, 2.0, 3.0]],
        )
        .unwrap();
        let test = FeatureMatrix::from_rows(
            names(&["x", "y"]),
            names(&["f3", "f4", "f1"]),
            vec![vec![0.3, 0.4, 0.1], vec![3.0, 4.0, 1.0]],
        )
        .unwrap();

        let alignment = pad_features_in_test_data(&train, &test).unwrap();
        assert_eq!(alignment.matrix.feature_ids(), train.feature_ids());
        assert_eq!(alignment.matrix.row("y").unwrap().to_vec(), vec![1.0, 0.0, 3.0]);
        assert_eq!(alignment.report.target_only, names(&["f4"]));
    }

    #[test]
    fn test_training_skips_missing_and_unsequenced_samples() {
        let (table, meta) = train_data();
        let model = train_age_model(&regressor(), &table, &meta, "age").unwrap();
        // t6 has NA, "unsequenced" has no table row
        assert_eq!(model.n_training_samples(), 5);
    }

    #[test]
    fn test_unknown_target_field() {
        let (table, meta) = train_data();
        let err = train_age_model(&regressor(), &table, &meta, "host_age").unwrap_err();
        assert!(matches!(err, PipelineError::TargetFieldNotFound(f) if f == "host_age"));
    }

    #[test]
    fn test_no_labelled_samples() {
        let (table, _) = train_data();
        let meta = metadata(&[("t1", ""), ("t2", "nan")]);
        let err = train_age_model(&regressor(), &table, &meta, "age").unwrap_err();
        assert!(matches!(err, PipelineError::NoTrainingSamples(_)));
    }

    #[test]
    fn test_prediction_with_train_data() {
        let (train_table, train_meta) = train_data();
        let test_table = FeatureMatrix::from_rows(
            names(&["young", "old"]),
            names(&["otu1", "otu9"]),
            vec![vec![0.15, 1.0], vec![0.85, 1.0]],
        )
        .unwrap();
        let test_meta = metadata(&[("young", "11"), ("old", "61"), ("absent", "40")]);

        let outcome = age_prediction_with_train_data(
            &regressor(),
            &train_table,
            &train_meta,
            &test_table,
            &test_meta,
            &PipelineConfig::default(),
        )
        .unwrap();

        assert!(outcome.model.is_some());
        assert_eq!(outcome.alignment.reference_only, names(&["otu2"]));
        assert_eq!(outcome.alignment.target_only, names(&["otu9"]));

        let young = outcome.predictions.get("young").unwrap();
        let old = outcome.predictions.get("old").unwrap();
        assert!(young < old, "young {} old {}", young, old);

        let meta = &outcome.updated_metadata;
        assert_eq!(meta.columns(), names(&["age", "predicted_age"]).as_slice());
        assert_eq!(meta.get("absent", "predicted_age"), Some(""));
        assert!(meta.get("old", "predicted_age").unwrap().parse::<f64>().is_ok());

        let scores = outcome.scores.unwrap();
        assert_eq!(scores.n, 2);
    }

    #[test]
    fn test_empty_overlap_still_predicts() {
        let (train_table, train_meta) = train_data();
        let model = train_age_model(&regressor(), &train_table, &train_meta, "age").unwrap();
        let test_table =
            FeatureMatrix::from_rows(names(&["s"]), names(&["other"]), vec![vec![1.0]]).unwrap();
        let test_meta = SampleMetadata::new("id".to_string(), vec![], vec![]).unwrap();

        let outcome =
            age_prediction_with_trained_model(&model, &test_table, &test_meta, &PipelineConfig::default())
                .unwrap();

        assert!(outcome.alignment.is_empty_overlap());
        assert_eq!(outcome.predictions.len(), 1);
        assert!(outcome.scores.is_none());
        assert_eq!(outcome.updated_metadata.sample_ids(), names(&["s"]).as_slice());
    }
}
