//! Feature Axis Alignment

use crate::error::AlignError;
use crate::matrix::{check_unique, FeatureMatrix};
use crate::report::AlignmentReport;
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Aligned matrix together with its diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Target values laid out on the reference feature axis
    pub matrix: FeatureMatrix,
    /// What was kept, padded and dropped
    pub report: AlignmentReport,
}

/// Reshapes a target matrix onto a reference feature axis.
///
/// Shared features keep the target's values, reference-only features are
/// zero for every sample, and target-only features are dropped. The output
/// feature axis always equals the reference list exactly, order included.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAligner;

impl FeatureAligner {
    /// Align `target` to the ordered `reference` features
    pub fn align(reference: &[String], target: &FeatureMatrix) -> Result<Alignment, AlignError> {
        if reference.is_empty() {
            return Err(AlignError::invalid("no reference features to align to"));
        }
        check_unique("reference feature", reference)?;

        let target_columns: HashMap<&str, usize> = target
            .feature_ids()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str(), i))
            .collect();
        let reference_set: HashSet<&str> = reference.iter().map(String::as_str).collect();

        // Source column in the target for each output column; None means zero padding.
        let sources: Vec<Option<usize>> = reference
            .iter()
            .map(|f| target_columns.get(f.as_str()).copied())
            .collect();

        let mut shared = Vec::new();
        let mut reference_only = Vec::new();
        for (feature, source) in reference.iter().zip(&sources) {
            match source {
                Some(_) => shared.push(feature.clone()),
                None => reference_only.push(feature.clone()),
            }
        }
        let target_only: Vec<String> = target
            .feature_ids()
            .iter()
            .filter(|f| !reference_set.contains(f.as_str()))
            .cloned()
            .collect();

        // Output is indexed by reference position, never by shared-then-padded order.
        let source_values = target.values();
        let mut values = Array2::<f64>::zeros((target.n_samples(), reference.len()));
        for (out_col, source) in sources.iter().enumerate() {
            if let Some(src_col) = source {
                values
                    .column_mut(out_col)
                    .assign(&source_values.column(*src_col));
            }
        }

        let report = AlignmentReport {
            shared,
            reference_only,
            target_only,
            n_samples: target.n_samples(),
        };

        debug!(
            "Aligned {} samples: {} shared, {} padded, {} dropped",
            report.n_samples,
            report.n_shared(),
            report.n_padded(),
            report.n_dropped()
        );
        for warning in report.warnings() {
            debug!("{}", warning);
        }

        let matrix = FeatureMatrix::from_validated_parts(
            target.sample_ids().to_vec(),
            reference.to_vec(),
            values,
        );

        Ok(Alignment { matrix, report })
    }

    /// Align `target` to the feature axis of `reference`
    pub fn align_to(
        reference: &FeatureMatrix,
        target: &FeatureMatrix,
    ) -> Result<Alignment, AlignError> {
        Self::align(reference.feature_ids(), target)
    }
}
