//! Logistic regression engine
//!
//! The pipeline talks to a `ModelEngine` handle, created once per run and
//! shared by every refinement iteration. `IrlsEngine` is the in-process
//! implementation: Newton-Raphson (IRLS) with step halving, aliased-column
//! detection, Wald or likelihood-ratio p-values and k-fold CV AUC.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use faer::prelude::{SolverCore, SpSolver};
use faer::{Col, Mat, Side};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use super::error::PipelineError;
use super::metrics::roc_auc;
use super::model::{CoefficientStat, FittedModel};
use super::target::binary_target_values;

/// Probabilities are kept inside this margin so deviance stays finite
const PROB_EPSILON: f64 = 1e-10;

/// Relative residual below which a column is considered a linear
/// combination of the columns before it
const ALIAS_TOLERANCE: f64 = 1e-10;

const MAX_STEP_HALVINGS: usize = 30;

/// How coefficient p-values are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceTest {
    /// Drop-one likelihood-ratio test; stays meaningful under separation
    #[default]
    LikelihoodRatio,
    /// Wald z-test from the inverse Hessian
    Wald,
}

impl std::fmt::Display for SignificanceTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignificanceTest::LikelihoodRatio => write!(f, "lrt"),
            SignificanceTest::Wald => write!(f, "wald"),
        }
    }
}

impl std::str::FromStr for SignificanceTest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lrt" | "lr" | "likelihood-ratio" => Ok(SignificanceTest::LikelihoodRatio),
            "wald" => Ok(SignificanceTest::Wald),
            _ => Err(format!("Unknown significance test: '{}'. Use 'lrt' or 'wald'.", s)),
        }
    }
}

/// Fit parameters
#[derive(Debug, Clone, Serialize)]
pub struct FitOptions {
    /// Ridge penalty on non-intercept coefficients; 0 fits plain maximum likelihood
    pub lambda: f64,
    /// Folds for cross-validated AUC; below 2 disables CV
    pub nfolds: usize,
    pub seed: u64,
    /// Weight rows so both classes carry equal total weight
    pub balance_classes: bool,
    pub compute_p_values: bool,
    pub significance_test: SignificanceTest,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            lambda: 0.0,
            nfolds: 5,
            seed: 1234,
            balance_classes: false,
            compute_p_values: true,
            significance_test: SignificanceTest::LikelihoodRatio,
            max_iterations: 50,
            tolerance: 1e-8,
        }
    }
}

/// WoE-encoded partitions handed to the engine
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    pub train: &'a DataFrame,
    pub validation: Option<&'a DataFrame>,
    pub target: &'a str,
}

/// A logistic regression backend
pub trait ModelEngine: Sync {
    fn name(&self) -> &'static str;

    /// Fit `target ~ features` on the training partition
    fn fit_logistic(
        &self,
        data: &TrainingData<'_>,
        features: &[String],
        options: &FitOptions,
    ) -> Result<FittedModel>;
}

/// Counters reported when the engine is shut down
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EngineStats {
    /// Calls to `fit_logistic`
    pub fits: usize,
    /// IRLS solves including drop-one refits and CV folds
    pub solves: usize,
}

/// In-process IRLS engine
#[derive(Debug, Default)]
pub struct IrlsEngine {
    fits: AtomicUsize,
    solves: AtomicUsize,
}

impl IrlsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            fits: self.fits.load(Ordering::Relaxed),
            solves: self.solves.load(Ordering::Relaxed),
        }
    }

    /// Release the engine and return its usage counters
    pub fn shutdown(self) -> EngineStats {
        self.stats()
    }

    fn solve(&self, cols: &[&[f64]], y: &[f64], w: &[f64], options: &FitOptions) -> IrlsFit {
        self.solves.fetch_add(1, Ordering::Relaxed);
        irls(cols, y, w, options)
    }

    fn cross_validated_auc(
        &self,
        cols: &[&[f64]],
        y: &[f64],
        w: &[f64],
        options: &FitOptions,
    ) -> Option<f64> {
        let n = y.len();
        if options.nfolds < 2 || n < options.nfolds {
            return None;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(options.seed));
        let mut fold_of = vec![0usize; n];
        for (pos, &row) in order.iter().enumerate() {
            fold_of[row] = pos % options.nfolds;
        }

        let mut scores = vec![0.0; n];
        for fold in 0..options.nfolds {
            let train_rows: Vec<usize> = (0..n).filter(|&i| fold_of[i] != fold).collect();
            let fold_cols: Vec<Vec<f64>> = cols
                .iter()
                .map(|c| train_rows.iter().map(|&i| c[i]).collect())
                .collect();
            let fold_refs: Vec<&[f64]> = fold_cols.iter().map(|c| c.as_slice()).collect();
            let fold_y: Vec<f64> = train_rows.iter().map(|&i| y[i]).collect();
            let fold_w: Vec<f64> = train_rows.iter().map(|&i| w[i]).collect();

            let fit = self.solve(&fold_refs, &fold_y, &fold_w, options);
            for i in (0..n).filter(|&i| fold_of[i] == fold) {
                scores[i] = sigmoid(cols.iter().zip(&fit.beta).map(|(c, b)| c[i] * b).sum());
            }
        }

        let labels: Vec<i32> = y.iter().map(|&v| v as i32).collect();
        Some(roc_auc(&scores, &labels))
    }
}

impl ModelEngine for IrlsEngine {
    fn name(&self) -> &'static str {
        "irls"
    }

    fn fit_logistic(
        &self,
        data: &TrainingData<'_>,
        features: &[String],
        options: &FitOptions,
    ) -> Result<FittedModel> {
        self.fits.fetch_add(1, Ordering::Relaxed);

        let labels = binary_target_values(data.train, data.target)?;
        let y: Vec<f64> = labels.iter().map(|&t| t as f64).collect();
        let w = class_weights(&labels, options.balance_classes);

        let mut columns: Vec<Vec<f64>> = vec![vec![1.0; y.len()]];
        for feature in features {
            columns.push(
                numeric_column(data.train, feature)
                    .with_context(|| format!("Failed to read model input '{}'", feature))?,
            );
        }

        let aliased = detect_aliased(&columns, &w);
        if aliased[0] {
            anyhow::bail!("training partition has no rows with positive weight");
        }
        let kept: Vec<usize> = (0..columns.len()).filter(|&j| !aliased[j]).collect();
        let kept_cols: Vec<&[f64]> = kept.iter().map(|&j| columns[j].as_slice()).collect();

        let fit = self.solve(&kept_cols, &y, &w, options);
        let null_fit = self.solve(&kept_cols[..1], &y, &w, options);

        let normal = Normal::new(0.0, 1.0).map_err(|e| anyhow::anyhow!("{}", e))?;
        let chi_sq = ChiSquared::new(1.0).map_err(|e| anyhow::anyhow!("{}", e))?;

        // p-values indexed by position in `kept`
        let mut kept_p = vec![f64::NAN; kept.len()];
        if options.compute_p_values {
            match options.significance_test {
                SignificanceTest::Wald => {
                    for (pos, p) in kept_p.iter_mut().enumerate().skip(1) {
                        let z = fit.beta[pos] / fit.std_errors[pos];
                        *p = if z.is_finite() {
                            2.0 * (1.0 - normal.cdf(z.abs()))
                        } else {
                            f64::NAN
                        };
                    }
                }
                SignificanceTest::LikelihoodRatio => {
                    let reduced: Vec<f64> = (1..kept.len())
                        .into_par_iter()
                        .map(|drop| {
                            let cols: Vec<&[f64]> = kept_cols
                                .iter()
                                .enumerate()
                                .filter(|(pos, _)| *pos != drop)
                                .map(|(_, c)| *c)
                                .collect();
                            self.solve(&cols, &y, &w, options).deviance
                        })
                        .collect();
                    for (pos, dev) in reduced.into_iter().enumerate() {
                        let lr = (dev - fit.deviance).max(0.0);
                        kept_p[pos + 1] = 1.0 - chi_sq.cdf(lr);
                    }
                }
            }
        }

        let mut coefficients = Vec::with_capacity(features.len());
        for (j, feature) in features.iter().enumerate() {
            let col_idx = j + 1;
            let stat = match kept.iter().position(|&k| k == col_idx) {
                Some(pos) => {
                    let estimate = fit.beta[pos];
                    let std_error = fit.std_errors[pos];
                    CoefficientStat {
                        feature: feature.clone(),
                        estimate,
                        std_error,
                        z_value: estimate / std_error,
                        p_value: kept_p[pos],
                        aliased: false,
                        standardized: estimate * std_dev(&columns[col_idx]),
                    }
                }
                None => CoefficientStat {
                    feature: feature.clone(),
                    estimate: f64::NAN,
                    std_error: f64::NAN,
                    z_value: f64::NAN,
                    p_value: f64::NAN,
                    aliased: true,
                    standardized: f64::NAN,
                },
            };
            coefficients.push(stat);
        }

        let train_scores: Vec<f64> = (0..y.len())
            .map(|i| sigmoid(kept_cols.iter().zip(&fit.beta).map(|(c, b)| c[i] * b).sum()))
            .collect();
        let cv_auc = self.cross_validated_auc(&kept_cols, &y, &w, options);

        let mut model = FittedModel {
            intercept: fit.beta[0],
            intercept_std_error: fit.std_errors[0],
            coefficients,
            deviance: fit.deviance,
            null_deviance: null_fit.deviance,
            iterations: fit.iterations,
            converged: fit.converged,
            significance_test: options.significance_test,
            train_auc: roc_auc(&train_scores, &labels),
            validation_auc: None,
            cv_auc,
        };

        if let Some(validation) = data.validation {
            let scores = model.predict_proba(validation)?;
            let labels = binary_target_values(validation, data.target)?;
            model.validation_auc = Some(roc_auc(&scores, &labels));
        }

        Ok(model)
    }
}

/// Read a model input column as non-null f64
pub(crate) fn numeric_column(df: &DataFrame, feature: &str) -> Result<Vec<f64>> {
    let col = df
        .column(feature)
        .map_err(|_| PipelineError::Schema(format!("model input '{}' not found", feature)))?;
    let cast = col.cast(&DataType::Float64)?;
    cast.f64()?
        .into_iter()
        .map(|v| {
            v.filter(|x| x.is_finite()).ok_or_else(|| {
                PipelineError::Schema(format!(
                    "model input '{}' has missing or non-finite values",
                    feature
                ))
                .into()
            })
        })
        .collect()
}

fn class_weights(labels: &[i32], balance: bool) -> Vec<f64> {
    if !balance {
        return vec![1.0; labels.len()];
    }
    let n = labels.len() as f64;
    let events = labels.iter().filter(|&&t| t == 1).count() as f64;
    let non_events = n - events;
    labels
        .iter()
        .map(|&t| {
            let class_n = if t == 1 { events } else { non_events };
            if class_n > 0.0 {
                n / (2.0 * class_n)
            } else {
                0.0
            }
        })
        .collect()
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// Mark columns that are (numerically) linear combinations of earlier columns.
///
/// Runs a Cholesky factorization of the weighted Gram matrix in column
/// order and skips any pivot whose residual falls below the tolerance, so
/// the first of two collinear columns is kept.
fn detect_aliased(columns: &[Vec<f64>], w: &[f64]) -> Vec<bool> {
    let gram = |a: usize, b: usize| -> f64 {
        columns[a]
            .iter()
            .zip(&columns[b])
            .zip(w)
            .map(|((x, z), wi)| wi * x * z)
            .sum()
    };

    let mut aliased = vec![false; columns.len()];
    let mut kept: Vec<usize> = Vec::new();
    let mut factor: Vec<Vec<f64>> = Vec::new();

    for j in 0..columns.len() {
        let diag = gram(j, j);
        let mut row: Vec<f64> = Vec::with_capacity(kept.len() + 1);
        for (r, &k) in kept.iter().enumerate() {
            let mut v = gram(j, k);
            for s in 0..r {
                v -= row[s] * factor[r][s];
            }
            row.push(v / factor[r][r]);
        }

        let residual = diag - row.iter().map(|v| v * v).sum::<f64>();
        if diag <= 0.0 || residual <= ALIAS_TOLERANCE * diag {
            aliased[j] = true;
            continue;
        }
        row.push(residual.sqrt());
        factor.push(row);
        kept.push(j);
    }

    aliased
}

struct IrlsFit {
    beta: Vec<f64>,
    std_errors: Vec<f64>,
    deviance: f64,
    iterations: usize,
    converged: bool,
}

fn linear_predictor(cols: &[&[f64]], beta: &[f64], n: usize) -> Vec<f64> {
    let mut eta = vec![0.0; n];
    for (col, b) in cols.iter().zip(beta) {
        for (e, x) in eta.iter_mut().zip(col.iter()) {
            *e += b * x;
        }
    }
    eta
}

fn deviance(eta: &[f64], y: &[f64], w: &[f64]) -> f64 {
    -2.0 * eta
        .iter()
        .zip(y)
        .zip(w)
        .map(|((&e, &yi), &wi)| {
            let mu = sigmoid(e).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
            wi * (yi * mu.ln() + (1.0 - yi) * (1.0 - mu).ln())
        })
        .sum::<f64>()
}

fn penalty(beta: &[f64], lambda: f64) -> f64 {
    lambda * beta.iter().skip(1).map(|b| b * b).sum::<f64>()
}

/// Weighted Hessian X'WX, plus the ridge penalty on non-intercept terms
fn hessian(cols: &[&[f64]], mu: &[f64], w: &[f64], lambda: f64) -> Mat<f64> {
    let n = mu.len();
    let q = cols.len();
    let mut xw = Mat::<f64>::zeros(n, q);
    for i in 0..n {
        let s = (w[i] * mu[i] * (1.0 - mu[i])).sqrt();
        for (k, col) in cols.iter().enumerate() {
            xw[(i, k)] = col[i] * s;
        }
    }
    let mut h = xw.transpose() * &xw;
    for k in 1..q {
        h[(k, k)] += lambda;
    }
    h
}

/// Newton direction H⁻¹·g; None when the Hessian is not positive definite
fn newton_direction(h: &Mat<f64>, gradient: &[f64]) -> Option<Vec<f64>> {
    let llt = h.cholesky(Side::Lower).ok()?;
    let rhs = Col::<f64>::from_fn(gradient.len(), |k| gradient[k]);
    let delta = llt.solve(rhs.as_ref());
    let delta: Vec<f64> = (0..gradient.len()).map(|k| delta.read(k)).collect();
    delta.iter().all(|d| d.is_finite()).then_some(delta)
}

/// Square roots of the diagonal of H⁻¹
fn standard_errors(h: &Mat<f64>) -> Option<Vec<f64>> {
    let inverse = h.cholesky(Side::Lower).ok()?.inverse();
    Some(
        (0..h.nrows())
            .map(|k| inverse.read(k, k).max(0.0).sqrt())
            .collect(),
    )
}

fn irls(cols: &[&[f64]], y: &[f64], w: &[f64], options: &FitOptions) -> IrlsFit {
    let n = y.len();
    let q = cols.len();
    let mut beta = vec![0.0; q];

    let total_w: f64 = w.iter().sum();
    if total_w > 0.0 && q > 0 {
        let ybar = (y.iter().zip(w).map(|(yi, wi)| yi * wi).sum::<f64>() / total_w)
            .clamp(1e-6, 1.0 - 1e-6);
        beta[0] = (ybar / (1.0 - ybar)).ln();
    }

    let mut eta = linear_predictor(cols, &beta, n);
    let mut objective = deviance(&eta, y, w) + penalty(&beta, options.lambda);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        let mu: Vec<f64> = eta
            .iter()
            .map(|&e| sigmoid(e).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON))
            .collect();
        let h = hessian(cols, &mu, w, options.lambda);
        let gradient: Vec<f64> = (0..q)
            .map(|k| {
                let g: f64 = (0..n).map(|i| w[i] * (y[i] - mu[i]) * cols[k][i]).sum();
                if k > 0 {
                    g - options.lambda * beta[k]
                } else {
                    g
                }
            })
            .collect();

        let Some(delta) = newton_direction(&h, &gradient) else {
            break;
        };

        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_STEP_HALVINGS {
            let candidate: Vec<f64> = beta.iter().zip(&delta).map(|(b, d)| b + step * d).collect();
            let candidate_eta = linear_predictor(cols, &candidate, n);
            let candidate_obj =
                deviance(&candidate_eta, y, w) + penalty(&candidate, options.lambda);
            if candidate_obj.is_finite() && candidate_obj <= objective {
                accepted = Some((candidate, candidate_eta, candidate_obj));
                break;
            }
            step /= 2.0;
        }

        let Some((candidate, candidate_eta, candidate_obj)) = accepted else {
            // no descent direction left
            converged = true;
            break;
        };

        let change = (objective - candidate_obj).abs();
        beta = candidate;
        eta = candidate_eta;
        objective = candidate_obj;

        if change / (objective.abs() + 0.1) < options.tolerance {
            converged = true;
            break;
        }
    }

    let mu: Vec<f64> = eta
        .iter()
        .map(|&e| sigmoid(e).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON))
        .collect();
    let std_errors = standard_errors(&hessian(cols, &mu, w, options.lambda))
        .unwrap_or_else(|| vec![f64::NAN; q]);

    IrlsFit {
        beta,
        std_errors,
        deviance: deviance(&eta, y, w),
        iterations,
        converged,
    }
}
