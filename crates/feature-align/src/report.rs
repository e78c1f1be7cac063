//! Alignment Diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal conditions noticed during alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentWarning {
    /// Reference and target share no features; the aligned matrix is all zeros
    EmptyOverlap {
        reference_features: usize,
        target_features: usize,
    },
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentWarning::EmptyOverlap {
                reference_features,
                target_features,
            } => write!(
                f,
                "no shared features between reference ({}) and target ({}); aligned matrix is all zeros",
                reference_features, target_features
            ),
        }
    }
}

/// How the target's feature axis was reconciled with the reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Features carried over from the target, in reference order
    pub shared: Vec<String>,
    /// Features zero-padded into the target, in reference order
    pub reference_only: Vec<String>,
    /// Target features dropped, in target order
    pub target_only: Vec<String>,
    /// Samples in the aligned matrix
    pub n_samples: usize,
}

impl AlignmentReport {
    pub fn n_shared(&self) -> usize {
        self.shared.len()
    }

    pub fn n_padded(&self) -> usize {
        self.reference_only.len()
    }

    pub fn n_dropped(&self) -> usize {
        self.target_only.len()
    }

    /// Width of the reference feature axis
    pub fn n_reference(&self) -> usize {
        self.shared.len() + self.reference_only.len()
    }

    /// True when no reference feature was found in the target
    pub fn is_empty_overlap(&self) -> bool {
        self.shared.is_empty()
    }

    /// Warnings a caller should surface
    pub fn warnings(&self) -> Vec<AlignmentWarning> {
        let mut warnings = Vec::new();
        if self.is_empty_overlap() {
            warnings.push(AlignmentWarning::EmptyOverlap {
                reference_features: self.n_reference(),
                target_features: self.shared.len() + self.target_only.len(),
            });
        }
        warnings
    }
}
