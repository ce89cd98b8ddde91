//! Tests for solver-based optimal binning

use churnscore::pipeline::binning::{bin_feature, FeatureValues};
use churnscore::pipeline::solver::{solve_optimal_binning, SolverConfig};
use churnscore::pipeline::*;

/// Event rate rising from 10% to 70% across the feature range
fn trending_feature(rows: usize, ascending: bool) -> (FeatureValues, Vec<i32>) {
    let mut values = Vec::with_capacity(rows);
    let mut targets = Vec::with_capacity(rows);
    for i in 0..rows {
        let position = if ascending { i } else { rows - 1 - i };
        let rate = 10 + 60 * position / rows;
        values.push(Some(i as f64));
        targets.push(i32::from((i * 7919) % 100 < rate));
    }
    (FeatureValues::Numeric(values), targets)
}

fn solver_config(monotonicity: MonotonicityConstraint) -> BinningConfig {
    BinningConfig {
        method: BinningMethod::Solver,
        max_bins: 5,
        monotonicity,
        ..BinningConfig::default()
    }
}

fn woes(binning: &FeatureBinning) -> Vec<f64> {
    binning.bins.iter().map(|b| b.woe).collect()
}

#[test]
fn test_solver_respects_bin_count_range() {
    let (values, targets) = trending_feature(600, true);
    let binning = bin_feature(
        "tenure",
        &values,
        &targets,
        &solver_config(MonotonicityConstraint::Ascending),
        BinMode::Supervised,
    )
    .unwrap();

    assert!(binning.bins.len() >= 2 && binning.bins.len() <= 5, "got {} bins", binning.bins.len());
}

#[test]
fn test_solver_with_ascending_monotonicity() {
    let (values, targets) = trending_feature(600, true);
    let binning = bin_feature(
        "tenure",
        &values,
        &targets,
        &solver_config(MonotonicityConstraint::Ascending),
        BinMode::Supervised,
    )
    .unwrap();

    let w = woes(&binning);
    assert!(w.windows(2).all(|p| p[1] >= p[0]), "WoE not ascending: {:?}", w);
    assert_eq!(binning.monotonicity, MonotonicityConstraint::Ascending);
}

#[test]
fn test_solver_with_descending_monotonicity() {
    let (values, targets) = trending_feature(600, false);
    let binning = bin_feature(
        "tenure",
        &values,
        &targets,
        &solver_config(MonotonicityConstraint::Descending),
        BinMode::Supervised,
    )
    .unwrap();

    let w = woes(&binning);
    assert!(w.windows(2).all(|p| p[1] <= p[0]), "WoE not descending: {:?}", w);
}

#[test]
fn test_solver_auto_monotonicity_follows_the_trend() {
    let (values, targets) = trending_feature(600, false);
    let binning = bin_feature(
        "tenure",
        &values,
        &targets,
        &solver_config(MonotonicityConstraint::Auto),
        BinMode::Supervised,
    )
    .unwrap();

    assert_eq!(binning.monotonicity, MonotonicityConstraint::Descending);
}

#[test]
fn test_chimerge_and_solver_both_produce_valid_bins() {
    let (values, targets) = trending_feature(800, true);
    let min_count = BinningConfig::default().min_bin_count(targets.len());

    for method in [BinningMethod::ChiMerge, BinningMethod::Solver] {
        let config = BinningConfig {
            method,
            ..BinningConfig::default()
        };
        let binning =
            bin_feature("tenure", &values, &targets, &config, BinMode::Supervised).unwrap();

        assert!(binning.bins.len() >= config.min_bins && binning.bins.len() <= config.max_bins);
        assert!(
            binning.bins.iter().all(|b| b.count >= min_count),
            "{:?} produced an undersized bin",
            method
        );
        assert!(binning.iv > 0.1, "{:?} IV {}", method, binning.iv);
    }
}

#[test]
fn test_solver_bins_cover_all_data() {
    let (values, targets) = trending_feature(500, true);
    let binning = bin_feature(
        "tenure",
        &values,
        &targets,
        &solver_config(MonotonicityConstraint::Auto),
        BinMode::Supervised,
    )
    .unwrap();

    let total: f64 = binning.bins.iter().map(|b| b.count).sum();
    assert_eq!(total, 500.0);

    let bounds: Vec<(f64, f64)> = binning
        .bins
        .iter()
        .map(|b| match b.range {
            BinRange::Interval { lower, upper } => (lower, upper),
            ref other => panic!("unexpected range {:?}", other),
        })
        .collect();
    assert_eq!(bounds[0].0, f64::NEG_INFINITY);
    assert_eq!(bounds[bounds.len() - 1].1, f64::INFINITY);
    assert!(bounds.windows(2).all(|w| w[0].1 == w[1].0));
}

#[test]
fn test_infeasible_size_constraint_is_an_error() {
    let prebins = vec![
        Bin::new(BinRange::Interval { lower: f64::NEG_INFINITY, upper: 1.0 }, 2.0, 3.0),
        Bin::new(BinRange::Interval { lower: 1.0, upper: f64::INFINITY }, 3.0, 2.0),
    ];
    let config = SolverConfig {
        min_bins: 2,
        max_bins: 4,
        min_bin_count: 8.0,
        monotonicity: MonotonicityConstraint::None,
        smoothing: 0.5,
    };

    assert!(solve_optimal_binning(&prebins, 5.0, 5.0, &config).is_err());
}
