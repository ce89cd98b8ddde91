//! Benchmark comparing ChiMerge vs solver binning and the IRLS refit cost
//!
//! Run with: cargo bench --bench binning_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use churnscore::pipeline::{
    fit_binning_map, screen_features, transform, BinningConfig, BinningMethod, FeatureKind,
    FitOptions, IrlsEngine, ModelEngine, MonotonicityConstraint, Schema, TrainingData,
};

/// Generate synthetic churn-like data with controlled characteristics
fn generate_test_dataframe(n_rows: usize, n_features: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let target: Vec<i32> = (0..n_rows)
        .map(|_| if rng.gen::<f64>() > 0.7 { 1 } else { 0 })
        .collect();

    let mut columns: Vec<Column> = vec![Column::new("y".into(), target.clone())];

    for i in 0..n_features {
        let values: Vec<f64> = match i % 3 {
            // uniform noise
            0 => (0..n_rows).map(|_| rng.gen::<f64>() * 100.0).collect(),
            // right-skewed, like call duration
            1 => (0..n_rows)
                .map(|_| {
                    let v = rng.gen::<f64>();
                    (v * v * v) * 100.0
                })
                .collect(),
            // shifted by the target
            _ => target
                .iter()
                .map(|&t| {
                    let base = if t == 1 { 70.0 } else { 30.0 };
                    base + rng.gen::<f64>() * 40.0 - 20.0
                })
                .collect(),
        };

        columns.push(Column::new(format!("feature_{}", i).into(), values));
    }

    DataFrame::new(columns).expect("Failed to create DataFrame")
}

fn numeric_schema(df: &DataFrame) -> Schema {
    let features = df
        .get_column_names()
        .iter()
        .filter(|c| c.as_str() != "y")
        .map(|c| (c.to_string(), FeatureKind::Numeric))
        .collect();
    Schema::from_features("y", features)
}

/// IV screening over every feature for varying dataset sizes
fn benchmark_iv_screening(c: &mut Criterion) {
    let mut group = c.benchmark_group("iv_screening");
    let sizes = [(1_000, 10), (5_000, 20), (10_000, 50)];

    for (n_rows, n_features) in sizes {
        let df = generate_test_dataframe(n_rows, n_features, 42);
        let schema = numeric_schema(&df);
        let config = BinningConfig::default();
        group.throughput(Throughput::Elements(n_features as u64));

        group.bench_with_input(
            BenchmarkId::new("chimerge", format!("{}x{}", n_rows, n_features)),
            &df,
            |b, df| {
                b.iter(|| {
                    let _ = screen_features(black_box(df), &schema, &config, black_box(0.02));
                });
            },
        );
    }

    group.finish();
}

/// ChiMerge vs MIP solver for supervised binning
fn benchmark_binning_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("binning_methods");
    group.sample_size(10);

    let df = generate_test_dataframe(5_000, 12, 7);
    let schema = numeric_schema(&df);
    let features = schema.names();

    for (name, method, monotonicity) in [
        ("chimerge_auto", BinningMethod::ChiMerge, MonotonicityConstraint::Auto),
        ("solver_auto", BinningMethod::Solver, MonotonicityConstraint::Auto),
        ("solver_none", BinningMethod::Solver, MonotonicityConstraint::None),
    ] {
        let config = BinningConfig {
            method,
            monotonicity,
            ..BinningConfig::default()
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = fit_binning_map(black_box(&df), &schema, &features, &config);
            });
        });
    }

    group.finish();
}

/// One LRT fit over the WoE-encoded frame, including drop-one refits
fn benchmark_logistic_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("logistic_fit");
    group.sample_size(10);

    for n_features in [5, 15] {
        let df = generate_test_dataframe(10_000, n_features, 3);
        let schema = numeric_schema(&df);
        let features = schema.names();
        let outcome = fit_binning_map(&df, &schema, &features, &BinningConfig::default())
            .expect("binning failed");
        let (woe, _) = transform(&outcome.map, &df, "y").expect("transform failed");
        let data = TrainingData {
            train: &woe,
            validation: None,
            target: "y",
        };
        let binned = outcome.map.feature_names();
        let engine = IrlsEngine::new();
        let options = FitOptions {
            nfolds: 0,
            ..FitOptions::default()
        };

        group.bench_with_input(BenchmarkId::new("lrt", n_features), &data, |b, data| {
            b.iter(|| {
                let _ = engine.fit_logistic(black_box(data), &binned, &options);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_iv_screening,
    benchmark_binning_methods,
    benchmark_logistic_fit
);
criterion_main!(benches);
