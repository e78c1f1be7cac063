//! Parallel alignment of many tables against one reference

use feature_align::{AlignError, Alignment, FeatureAligner, FeatureMatrix};
use rayon::prelude::*;
use tracing::debug;

/// Align every target to `reference`, one independent result per target
pub fn align_batch(
    reference: &[String],
    targets: &[FeatureMatrix],
) -> Vec<Result<Alignment, AlignError>> {
    debug!(
        "Aligning {} tables to {} reference features",
        targets.len(),
        reference.len()
    );
    targets
        .par_iter()
        .map(|target| FeatureAligner::align(reference, target))
        .collect()
}
