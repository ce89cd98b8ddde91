//! Solver-based optimal binning using Mixed Integer Programming (MIP)
//!
//! Finds the grouping of ordered prebins that maximizes Information Value
//! subject to the bin-count range, the minimum bin size and an optional WoE
//! trend. Uses the HiGHS solver via good_lp.

mod model;
mod monotonicity;
mod precompute;

use anyhow::Result;

use super::binning::Bin;

pub use monotonicity::MonotonicityConstraint;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub min_bins: usize,
    pub max_bins: usize,
    /// Minimum rows in every final bin
    pub min_bin_count: f64,
    pub monotonicity: MonotonicityConstraint,
    pub smoothing: f64,
}

/// Result from the optimal binning solver
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// Each (start, end) pair names the prebins merged into one final bin
    pub bin_boundaries: Vec<(usize, usize)>,
    pub total_iv: f64,
    /// Trend actually enforced; never `Auto`
    pub monotonicity_applied: MonotonicityConstraint,
}

/// Solve optimal binning over ordered prebins (numeric intervals or
/// categories sorted by event rate)
pub fn solve_optimal_binning(
    prebins: &[Bin],
    total_events: f64,
    total_non_events: f64,
    config: &SolverConfig,
) -> Result<SolverResult> {
    model::solve(prebins, total_events, total_non_events, config)
}

/// Merge prebins as the solver decided; statistics are finalized by the caller
pub fn reconstruct_bins(prebins: &[Bin], result: &SolverResult) -> Vec<Bin> {
    result
        .bin_boundaries
        .iter()
        .map(|&(start, end)| {
            prebins[start + 1..=end]
                .iter()
                .fold(prebins[start].clone(), |acc, b| acc.merged(b))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::binning::BinRange;

    fn interval(lower: f64, upper: f64, events: f64, non_events: f64) -> Bin {
        Bin::new(BinRange::Interval { lower, upper }, events, non_events)
    }

    #[test]
    fn test_reconstruct_merges_ranges_and_counts() {
        let prebins = vec![
            interval(f64::NEG_INFINITY, 1.0, 2.0, 8.0),
            interval(1.0, 2.0, 3.0, 7.0),
            interval(2.0, f64::INFINITY, 9.0, 1.0),
        ];
        let result = SolverResult {
            bin_boundaries: vec![(0, 1), (2, 2)],
            total_iv: 0.0,
            monotonicity_applied: MonotonicityConstraint::Ascending,
        };

        let bins = reconstruct_bins(&prebins, &result);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].events, 5.0);
        assert_eq!(bins[0].count, 20.0);
        assert_eq!(
            bins[0].range,
            BinRange::Interval {
                lower: f64::NEG_INFINITY,
                upper: 2.0
            }
        );
    }

    #[test]
    fn test_too_few_prebins_is_rejected() {
        let prebins = vec![interval(f64::NEG_INFINITY, f64::INFINITY, 5.0, 5.0)];
        let config = SolverConfig {
            min_bins: 2,
            max_bins: 5,
            min_bin_count: 1.0,
            monotonicity: MonotonicityConstraint::None,
            smoothing: 0.5,
        };
        assert!(solve_optimal_binning(&prebins, 5.0, 5.0, &config).is_err());
    }
}
