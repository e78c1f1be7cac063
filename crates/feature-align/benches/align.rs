//! Alignment throughput on microbiome-sized tables

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feature_align::{FeatureAligner, FeatureMatrix};
use ndarray::Array2;

fn wide_target(n_samples: usize, n_features: usize) -> FeatureMatrix {
    let samples = (0..n_samples).map(|i| format!("sample{}", i)).collect();
    // Offset by half so only half of the reference is shared
    let features = (n_features / 2..n_features + n_features / 2)
        .map(|i| format!("otu{}", i))
        .collect();
    let values = Array2::from_shape_fn((n_samples, n_features), |(r, c)| (r * c % 97) as f64);
    FeatureMatrix::new(samples, features, values).expect("valid benchmark matrix")
}

fn bench_align(c: &mut Criterion) {
    let reference: Vec<String> = (0..20_000).map(|i| format!("otu{}", i)).collect();
    let target = wide_target(200, 20_000);

    c.bench_function("align_200x20000", |b| {
        b.iter(|| FeatureAligner::align(black_box(&reference), black_box(&target)))
    });
}

criterion_group!(benches, bench_align);
criterion_main!(benches);
