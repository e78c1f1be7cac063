//! Sample-by-Feature Matrix

use crate::error::AlignError;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::collections::{HashMap, HashSet};

/// Numeric matrix with named sample rows and named feature columns.
///
/// Identifiers are unique within each axis and the value grid always has
/// shape `(n_samples, n_features)`; every constructor enforces both.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    sample_ids: Vec<String>,
    feature_ids: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Create a matrix from identifiers and a dense value grid
    pub fn new(
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, AlignError> {
        check_unique("sample", &sample_ids)?;
        check_unique("feature", &feature_ids)?;

        let expected = (sample_ids.len(), feature_ids.len());
        if values.dim() != expected {
            return Err(AlignError::invalid(format!(
                "value grid has shape {:?}, axes require {:?}",
                values.dim(),
                expected
            )));
        }

        Ok(Self::from_validated_parts(sample_ids, feature_ids, values))
    }

    /// Create a matrix from one row of values per sample
    pub fn from_rows(
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, AlignError> {
        if rows.len() != sample_ids.len() {
            return Err(AlignError::invalid(format!(
                "{} rows supplied for {} samples",
                rows.len(),
                sample_ids.len()
            )));
        }

        let n_features = feature_ids.len();
        let mut flat = Vec::with_capacity(rows.len() * n_features);
        for (sample, row) in sample_ids.iter().zip(rows) {
            if row.len() != n_features {
                return Err(AlignError::invalid(format!(
                    "row for sample '{}' has {} values, expected {}",
                    sample,
                    row.len(),
                    n_features
                )));
            }
            flat.extend(row);
        }

        let values = Array2::from_shape_vec((sample_ids.len(), n_features), flat)
            .map_err(|e| AlignError::invalid(e.to_string()))?;
        Self::new(sample_ids, feature_ids, values)
    }

    /// Create a matrix with the given features and no samples
    pub fn empty(feature_ids: Vec<String>) -> Result<Self, AlignError> {
        let values = Array2::zeros((0, feature_ids.len()));
        Self::new(Vec::new(), feature_ids, values)
    }

    pub(crate) fn from_validated_parts(
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
        values: Array2<f64>,
    ) -> Self {
        debug_assert_eq!(values.dim(), (sample_ids.len(), feature_ids.len()));
        Self {
            sample_ids,
            feature_ids,
            values,
        }
    }

    /// Sample identifiers, in row order
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Feature identifiers, in column order
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Dense value grid (samples × features)
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// `(n_samples, n_features)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Column position of a feature
    pub fn feature_index(&self, feature: &str) -> Option<usize> {
        self.feature_ids.iter().position(|f| f == feature)
    }

    /// Row position of a sample
    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample)
    }

    /// Value at (sample, feature), if both exist
    pub fn get(&self, sample: &str, feature: &str) -> Option<f64> {
        let row = self.sample_index(sample)?;
        let col = self.feature_index(feature)?;
        Some(self.values[[row, col]])
    }

    /// All feature values of one sample
    pub fn row(&self, sample: &str) -> Option<ArrayView1<'_, f64>> {
        self.sample_index(sample).map(|i| self.values.row(i))
    }

    /// Restrict the sample axis to `ids`, in the order given.
    ///
    /// Fails if an id is unknown or repeated.
    pub fn select_samples<S: AsRef<str>>(&self, ids: &[S]) -> Result<Self, AlignError> {
        let index: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut rows = Vec::with_capacity(ids.len());
        let mut selected = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            let row = index
                .get(id)
                .ok_or_else(|| AlignError::invalid(format!("unknown sample '{}'", id)))?;
            rows.push(*row);
            selected.push(id.to_string());
        }
        check_unique("sample", &selected)?;

        let values = self.values.select(Axis(0), &rows);
        Ok(Self::from_validated_parts(
            selected,
            self.feature_ids.clone(),
            values,
        ))
    }

    /// Consume the matrix, returning its parts
    pub fn into_parts(self) -> (Vec<String>, Vec<String>, Array2<f64>) {
        (self.sample_ids, self.feature_ids, self.values)
    }
}

/// Reject the first repeated identifier on an axis
pub(crate) fn check_unique(axis: &str, ids: &[String]) -> Result<(), AlignError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(AlignError::invalid(format!(
                "duplicate {} identifier '{}'",
                axis, id
            )));
        }
    }
    Ok(())
}
