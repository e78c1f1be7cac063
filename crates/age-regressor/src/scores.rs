//! Regression Accuracy Scores

use serde::{Deserialize, Serialize};

/// Agreement between known and predicted ages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionScores {
    /// Mean absolute error
    pub mae: f64,
    /// Mean squared error
    pub mse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Number of (truth, prediction) pairs scored
    pub n: usize,
}

impl RegressionScores {
    /// Score paired slices; `None` if they are empty or differ in length
    pub fn compute(truth: &[f64], predicted: &[f64]) -> Option<Self> {
        if truth.is_empty() || truth.len() != predicted.len() {
            return None;
        }

        let n = truth.len() as f64;
        let mean = truth.iter().sum::<f64>() / n;

        let mut abs_err = 0.0;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (&t, &p) in truth.iter().zip(predicted) {
            let d = t - p;
            abs_err += d.abs();
            ss_res += d * d;
            ss_tot += (t - mean) * (t - mean);
        }

        // Constant truth: perfect fit scores 1, anything else 0
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Some(Self {
            mae: abs_err / n,
            mse: ss_res / n,
            r2,
            n: truth.len(),
        })
    }

    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let s = RegressionScores::compute(&[10.0, 20.0, 30.0], &[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(s.mae, 0.0);
        assert_eq!(s.r2, 1.0);
    }

    #[test]
    fn test_known_errors() {
        let s = RegressionScores::compute(&[1.0, 2.0, 3.0, 4.0], &[2.0, 2.0, 3.0, 2.0]).unwrap();
        assert!((s.mae - 0.75).abs() < 1e-12);
        assert!((s.mse - 1.25).abs() < 1e-12);
        // ss_tot = 5, ss_res = 5
        assert!(s.r2.abs() < 1e-12);
        assert!((s.rmse() - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(RegressionScores::compute(&[1.0], &[1.0, 2.0]).is_none());
        assert!(RegressionScores::compute(&[], &[]).is_none());
    }
}
