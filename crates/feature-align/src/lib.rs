//! Feature Alignment
//!
//! Reconciles the feature axis of a test matrix with the feature axis a
//! model was trained on: shared features carry over, missing features are
//! zero-padded, and unknown features are dropped.

mod aligner;
mod error;
mod matrix;
mod report;

pub use aligner::{Alignment, FeatureAligner};
pub use error::AlignError;
pub use matrix::FeatureMatrix;
pub use report::{AlignmentReport, AlignmentWarning};
