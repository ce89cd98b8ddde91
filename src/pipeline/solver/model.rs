//! MIP model construction and solving for optimal binning
//!
//! Interval formulation: one binary variable per contiguous run of prebins
//! that is large enough to stand as a bin. The solver picks a set of runs
//! that covers every prebin exactly once and maximizes the summed IV.

use anyhow::{Context, Result};
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, Solution, SolverModel,
    Variable,
};

use super::super::binning::Bin;
use super::monotonicity::MonotonicityConstraint;
use super::precompute::{candidate, candidate_matrix, CandidateBin};
use super::{SolverConfig, SolverResult};

pub fn solve(
    prebins: &[Bin],
    total_events: f64,
    total_non_events: f64,
    config: &SolverConfig,
) -> Result<SolverResult> {
    let n = prebins.len();
    if n < config.min_bins.max(1) {
        anyhow::bail!("{} prebin(s) cannot form {} bins", n, config.min_bins);
    }

    let matrix = candidate_matrix(prebins, total_events, total_non_events, config.smoothing);

    match config.monotonicity {
        MonotonicityConstraint::Auto => {
            let ascending = solve_with_trend(&matrix, n, config, MonotonicityConstraint::Ascending);
            let descending =
                solve_with_trend(&matrix, n, config, MonotonicityConstraint::Descending);
            match (ascending, descending) {
                (Ok(a), Ok(d)) => Ok(if d.total_iv > a.total_iv { d } else { a }),
                (Ok(a), Err(_)) => Ok(a),
                (Err(_), Ok(d)) => Ok(d),
                (Err(e), Err(_)) => Err(e).context("No valid solution for either trend"),
            }
        }
        trend => solve_with_trend(&matrix, n, config, trend),
    }
}

fn solve_with_trend(
    matrix: &[Vec<CandidateBin>],
    n: usize,
    config: &SolverConfig,
    trend: MonotonicityConstraint,
) -> Result<SolverResult> {
    let mut vars = ProblemVariables::new();

    let mut z: Vec<Vec<Option<Variable>>> = Vec::with_capacity(n);
    for i in 0..n {
        let row = (i..n)
            .map(|j| {
                if candidate(matrix, i, j).count >= config.min_bin_count {
                    Some(vars.add(variable().binary()))
                } else {
                    None
                }
            })
            .collect();
        z.push(row);
    }

    let mut objective_terms: Vec<Expression> = Vec::new();
    for i in 0..n {
        for j in i..n {
            if let Some(var) = z[i][j - i] {
                objective_terms.push(candidate(matrix, i, j).iv * var);
            }
        }
    }
    if objective_terms.is_empty() {
        anyhow::bail!("no run of prebins reaches {} rows", config.min_bin_count);
    }
    let objective: Expression = objective_terms.into_iter().sum();

    let mut problem = vars.maximise(objective).using(default_solver);

    let bin_count: Expression = z.iter().flat_map(|row| row.iter().filter_map(|v| *v)).sum();
    problem = problem.with(constraint!(bin_count.clone() >= config.min_bins as f64));
    problem = problem.with(constraint!(bin_count <= config.max_bins as f64));

    // Each prebin lands in exactly one selected run
    for p in 0..n {
        let mut covering: Vec<Variable> = Vec::new();
        for i in 0..=p {
            for j in p..n {
                if let Some(var) = z[i][j - i] {
                    covering.push(var);
                }
            }
        }
        if covering.is_empty() {
            anyhow::bail!("prebin {} cannot be placed in any admissible bin", p);
        }
        let coverage: Expression = covering.into_iter().sum();
        problem = problem.with(constraint!(coverage == 1.0));
    }

    // Adjacent runs that break the trend cannot both be selected
    if trend != MonotonicityConstraint::None {
        for i1 in 0..n {
            for j1 in i1..n.saturating_sub(1) {
                let Some(v1) = z[i1][j1 - i1] else { continue };
                let left = candidate(matrix, i1, j1);
                let i2 = j1 + 1;
                for j2 in i2..n {
                    let Some(v2) = z[i2][j2 - i2] else { continue };
                    let right = candidate(matrix, i2, j2);
                    let violates = match trend {
                        MonotonicityConstraint::Ascending => left.woe > right.woe,
                        MonotonicityConstraint::Descending => left.woe < right.woe,
                        _ => false,
                    };
                    if violates {
                        let pair: Expression = v1 + v2;
                        problem = problem.with(constraint!(pair <= 1.0));
                    }
                }
            }
        }
    }

    let solution = problem.solve().context("Failed to solve MIP model")?;

    let mut bin_boundaries: Vec<(usize, usize)> = Vec::new();
    for i in 0..n {
        for j in i..n {
            if let Some(var) = z[i][j - i] {
                if solution.value(var) > 0.5 {
                    bin_boundaries.push((i, j));
                }
            }
        }
    }
    bin_boundaries.sort_by_key(|(start, _)| *start);

    let total_iv = bin_boundaries
        .iter()
        .map(|(start, end)| candidate(matrix, *start, *end).iv)
        .sum();

    Ok(SolverResult {
        bin_boundaries,
        total_iv,
        monotonicity_applied: trend,
    })
}
