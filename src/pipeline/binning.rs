//! Supervised binning with Weight of Evidence statistics
//!
//! Numeric features start from equal-frequency prebins cut only where the
//! value changes; categorical features start from one bin per category,
//! ordered by smoothed event rate. Bins smaller than the minimum size are
//! folded into the neighbour with the closer event rate, then adjacent bins
//! are merged bottom-up by the chi-square statistic of their 2x2 table.
//!
//! Two modes share this machinery. `Screening` lets the merge collapse to a
//! single bin when no split is significant at the family-wise screening
//! level, which drives the IV of an uninformative feature to zero.
//! `Supervised` keeps at least `min_bins`,
//! applies a monotonic WoE pass (or the MIP solver) and rejects features
//! that cannot satisfy the constraints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use super::config::{BinningConfig, BinningMethod};
use super::error::PipelineError;
use super::schema::{FeatureKind, Schema};
use super::solver::{self, MonotonicityConstraint, SolverConfig};
use super::target::binary_target_values;
use crate::utils::create_progress_bar;

/// Label of the bin that holds missing values
pub const MISSING_LABEL: &str = "MISSING";

/// Region of the feature domain covered by a bin
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BinRange {
    /// Half-open numeric interval `[lower, upper)`
    Interval { lower: f64, upper: f64 },
    /// Set of categorical values
    Categories { members: Vec<String> },
    Missing,
}

impl BinRange {
    pub fn label(&self) -> String {
        match self {
            BinRange::Interval { lower, upper } => {
                format!("[{}, {})", format_bound(*lower), format_bound(*upper))
            }
            BinRange::Categories { members } => format!("{{{}}}", members.join(", ")),
            BinRange::Missing => MISSING_LABEL.to_string(),
        }
    }

    fn merge(&self, other: &BinRange) -> BinRange {
        match (self, other) {
            (BinRange::Interval { lower, .. }, BinRange::Interval { upper, .. }) => {
                BinRange::Interval {
                    lower: *lower,
                    upper: *upper,
                }
            }
            (BinRange::Categories { members: a }, BinRange::Categories { members: b }) => {
                BinRange::Categories {
                    members: a.iter().chain(b.iter()).cloned().collect(),
                }
            }
            _ => self.clone(),
        }
    }
}

fn format_bound(v: f64) -> String {
    if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if v == f64::INFINITY {
        "+inf".to_string()
    } else {
        format!("{:.4}", v)
    }
}

/// A single bin with WoE statistics
#[derive(Debug, Clone, Serialize)]
pub struct Bin {
    pub range: BinRange,
    /// Count of events (target = 1) in this bin
    pub events: f64,
    /// Count of non-events (target = 0) in this bin
    pub non_events: f64,
    pub count: f64,
    pub woe: f64,
    /// Contribution to total IV from this bin
    pub iv_contribution: f64,
    pub event_rate: f64,
}

impl Bin {
    pub fn new(range: BinRange, events: f64, non_events: f64) -> Self {
        let count = events + non_events;
        Self {
            range,
            events,
            non_events,
            count,
            woe: 0.0,
            iv_contribution: 0.0,
            event_rate: if count > 0.0 { events / count } else { 0.0 },
        }
    }

    /// Combine two adjacent bins; statistics are recomputed by `finalize_bins`
    pub fn merged(&self, other: &Bin) -> Bin {
        Bin::new(
            self.range.merge(&other.range),
            self.events + other.events,
            self.non_events + other.non_events,
        )
    }

    pub fn label(&self) -> String {
        self.range.label()
    }

    /// Smoothed odds; ordering bins by this orders them by WoE
    fn smoothed_odds(&self, smoothing: f64) -> f64 {
        (self.events + smoothing) / (self.non_events + smoothing)
    }
}

/// Calculate WoE and IV contribution for a bin
///
/// WoE = ln(%events / %non-events), so a positive WoE marks a bin with
/// elevated churn risk. The smoothing constant keeps both shares positive.
pub fn woe_iv(
    events: f64,
    non_events: f64,
    total_events: f64,
    total_non_events: f64,
    smoothing: f64,
) -> (f64, f64) {
    let dist_events = (events + smoothing) / (total_events + smoothing);
    let dist_non_events = (non_events + smoothing) / (total_non_events + smoothing);

    let woe = (dist_events / dist_non_events).ln();
    let iv_contrib = (dist_events - dist_non_events) * woe;

    (woe, iv_contrib)
}

/// Pearson chi-square statistic of the 2x2 table formed by two bins
pub fn chi_square(a: &Bin, b: &Bin) -> f64 {
    let observed = [[a.events, a.non_events], [b.events, b.non_events]];
    let row_totals = [a.events + a.non_events, b.events + b.non_events];
    let col_totals = [a.events + b.events, a.non_events + b.non_events];
    let total = row_totals[0] + row_totals[1];
    if total <= 0.0 {
        return 0.0;
    }

    let mut chi = 0.0;
    for (i, row) in observed.iter().enumerate() {
        for (j, &obs) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / total;
            if expected > 0.0 {
                chi += (obs - expected).powi(2) / expected;
            }
        }
    }
    chi
}

/// Critical value of the chi-square distribution with one degree of freedom
pub fn chi_square_critical(alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        anyhow::bail!("chi-square alpha must be in (0, 1), got {}", alpha);
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| anyhow::anyhow!("{}", e))?;
    let z = normal.inverse_cdf(1.0 - alpha / 2.0);
    Ok(z * z)
}

/// Whether merging may stop at one bin or must keep `min_bins`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinMode {
    Screening,
    Supervised,
}

/// Raw values of one feature
#[derive(Debug, Clone)]
pub enum FeatureValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

/// Read a feature column in the representation its kind requires.
/// NaN counts as missing.
pub fn extract_feature_values(
    df: &DataFrame,
    feature: &str,
    kind: FeatureKind,
) -> Result<FeatureValues> {
    let col = df
        .column(feature)
        .map_err(|_| PipelineError::Schema(format!("feature '{}' missing from dataset", feature)))?;

    match kind {
        FeatureKind::Numeric => {
            let cast = col.cast(&DataType::Float64)?;
            Ok(FeatureValues::Numeric(
                cast.f64()?
                    .into_iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect(),
            ))
        }
        FeatureKind::Categorical => {
            let cast = col.cast(&DataType::String)?;
            Ok(FeatureValues::Categorical(
                cast.str()?
                    .into_iter()
                    .map(|v| v.map(|s| s.to_string()))
                    .collect(),
            ))
        }
    }
}

/// Fitted bins for one feature
#[derive(Debug, Clone, Serialize)]
pub struct FeatureBinning {
    pub feature: String,
    pub kind: FeatureKind,
    /// Bins over non-missing values, in domain order
    pub bins: Vec<Bin>,
    /// Always present; WoE is 0 when no training row was missing
    pub missing: Bin,
    pub iv: f64,
    pub total_events: f64,
    pub total_non_events: f64,
    pub monotonicity: MonotonicityConstraint,
    /// Index of the non-missing bin with the fewest rows
    pub fallback_index: usize,
    #[serde(skip)]
    cuts: Vec<f64>,
    #[serde(skip)]
    category_index: HashMap<String, usize>,
}

impl FeatureBinning {
    fn new(
        feature: &str,
        kind: FeatureKind,
        bins: Vec<Bin>,
        missing: Bin,
        total_events: f64,
        total_non_events: f64,
        monotonicity: MonotonicityConstraint,
    ) -> Self {
        let iv = bins.iter().map(|b| b.iv_contribution).sum::<f64>() + missing.iv_contribution;

        let cuts = bins
            .iter()
            .take(bins.len().saturating_sub(1))
            .filter_map(|b| match b.range {
                BinRange::Interval { upper, .. } => Some(upper),
                _ => None,
            })
            .collect();

        let mut category_index = HashMap::new();
        for (idx, bin) in bins.iter().enumerate() {
            if let BinRange::Categories { members } = &bin.range {
                for m in members {
                    category_index.insert(m.clone(), idx);
                }
            }
        }

        let fallback_index = bins
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (idx, b)| {
                if b.count < best.1 {
                    (idx, b.count)
                } else {
                    best
                }
            })
            .0;

        Self {
            feature: feature.to_string(),
            kind,
            bins,
            missing,
            iv,
            total_events,
            total_non_events,
            monotonicity,
            fallback_index,
            cuts,
            category_index,
        }
    }

    /// WoE of the bin containing a numeric value
    pub fn woe_for_numeric(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) if !v.is_nan() => {
                let idx = self.cuts.partition_point(|&c| c <= v);
                self.bins.get(idx).map(|b| b.woe).unwrap_or(0.0)
            }
            _ => self.missing.woe,
        }
    }

    /// WoE of the bin holding a category; None if the category was never seen
    pub fn woe_for_category(&self, value: Option<&str>) -> Option<f64> {
        match value {
            Some(v) => self.category_index.get(v).map(|&idx| self.bins[idx].woe),
            None => Some(self.missing.woe),
        }
    }

    /// Bin used for categories that were absent during fitting
    pub fn fallback_bin(&self) -> &Bin {
        &self.bins[self.fallback_index]
    }

    /// Gini of the WoE encoding on the fitting sample
    pub fn gini(&self) -> f64 {
        let mut pairs: Vec<(f64, i32, f64)> = Vec::new();
        for bin in self.bins.iter().chain(std::iter::once(&self.missing)) {
            if bin.events > 0.0 {
                pairs.push((bin.woe, 1, bin.events));
            }
            if bin.non_events > 0.0 {
                pairs.push((bin.woe, 0, bin.non_events));
            }
        }
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        2.0 * super::metrics::weighted_auc(&pairs) - 1.0
    }
}

/// Bin one feature against a binary target
pub fn bin_feature(
    feature: &str,
    values: &FeatureValues,
    targets: &[i32],
    config: &BinningConfig,
    mode: BinMode,
) -> Result<FeatureBinning, PipelineError> {
    let total_events = targets.iter().filter(|&&t| t == 1).count() as f64;
    let total_non_events = targets.len() as f64 - total_events;
    if total_events == 0.0 || total_non_events == 0.0 {
        return Err(PipelineError::DegenerateFeature {
            feature: feature.to_string(),
            reason: "target has a single class in the fitting sample".to_string(),
        });
    }

    let min_count = config.min_bin_count(targets.len());
    let (kind, mut bins, missing_events, missing_non_events) = match values {
        FeatureValues::Numeric(v) => {
            let (bins, me, mne) = numeric_prebins(feature, v, targets, config.prebins)?;
            (FeatureKind::Numeric, bins, me, mne)
        }
        FeatureValues::Categorical(v) => {
            let (bins, me, mne) = categorical_prebins(feature, v, targets, config.smoothing)?;
            (FeatureKind::Categorical, bins, me, mne)
        }
    };

    merge_undersized(&mut bins, min_count);

    let alpha = match mode {
        // Bonferroni over the cut points the merge can choose from
        BinMode::Screening => config.screening_alpha / bins.len().saturating_sub(1).max(1) as f64,
        BinMode::Supervised => config.chi_alpha,
    };
    let critical = chi_square_critical(alpha).map_err(|e| PipelineError::BinningConstraint {
        feature: feature.to_string(),
        reason: e.to_string(),
    })?;

    let monotonicity = match mode {
        BinMode::Screening => {
            chi_merge(&mut bins, 1, config.max_bins, critical);
            MonotonicityConstraint::None
        }
        BinMode::Supervised => {
            let requested = match kind {
                FeatureKind::Numeric => config.monotonicity,
                FeatureKind::Categorical => MonotonicityConstraint::Ascending,
            };
            match config.method {
                BinningMethod::ChiMerge => {
                    chi_merge(&mut bins, config.min_bins, config.max_bins, critical);
                    enforce_monotonic(&mut bins, config.min_bins, requested, config.smoothing)
                }
                BinningMethod::Solver => {
                    let solver_config = SolverConfig {
                        min_bins: config.min_bins,
                        max_bins: config.max_bins,
                        min_bin_count: min_count,
                        monotonicity: requested,
                        smoothing: config.smoothing,
                    };
                    let result = solver::solve_optimal_binning(
                        &bins,
                        total_events,
                        total_non_events,
                        &solver_config,
                    )
                    .map_err(|e| PipelineError::BinningConstraint {
                        feature: feature.to_string(),
                        reason: format!("no feasible partition: {:#}", e),
                    })?;
                    bins = solver::reconstruct_bins(&bins, &result);
                    result.monotonicity_applied
                }
            }
        }
    };

    if mode == BinMode::Supervised && bins.len() < config.min_bins {
        return Err(PipelineError::BinningConstraint {
            feature: feature.to_string(),
            reason: format!(
                "only {} bin(s) with at least {} rows; {} required",
                bins.len(),
                min_count,
                config.min_bins
            ),
        });
    }

    finalize_bins(&mut bins, total_events, total_non_events, config.smoothing);
    let mut missing = Bin::new(BinRange::Missing, missing_events, missing_non_events);
    if missing.count > 0.0 {
        let (woe, iv) = woe_iv(
            missing_events,
            missing_non_events,
            total_events,
            total_non_events,
            config.smoothing,
        );
        missing.woe = woe;
        missing.iv_contribution = iv;
    }

    Ok(FeatureBinning::new(
        feature,
        kind,
        bins,
        missing,
        total_events,
        total_non_events,
        monotonicity,
    ))
}

fn numeric_prebins(
    feature: &str,
    values: &[Option<f64>],
    targets: &[i32],
    n_prebins: usize,
) -> Result<(Vec<Bin>, f64, f64), PipelineError> {
    let mut pairs: Vec<(f64, i32)> = Vec::with_capacity(values.len());
    let mut missing_events = 0.0;
    let mut missing_non_events = 0.0;

    for (v, &t) in values.iter().zip(targets) {
        match v {
            Some(x) => pairs.push((*x, t)),
            None if t == 1 => missing_events += 1.0,
            None => missing_non_events += 1.0,
        }
    }

    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let distinct = pairs.windows(2).filter(|w| w[0].0 != w[1].0).count() + 1;
    if pairs.is_empty() || distinct < 2 {
        return Err(PipelineError::DegenerateFeature {
            feature: feature.to_string(),
            reason: if pairs.is_empty() {
                "all values are missing".to_string()
            } else {
                format!("constant value {}", pairs[0].0)
            },
        });
    }

    let n = pairs.len();
    let target_size = n.div_ceil(n_prebins.max(1));
    let mut bins = Vec::new();
    let mut lower = f64::NEG_INFINITY;
    let mut start = 0;

    while start < n {
        let mut end = (start + target_size).min(n);
        // never split a run of equal values
        while end < n && pairs[end].0 == pairs[end - 1].0 {
            end += 1;
        }

        let upper = if end < n {
            let mid = (pairs[end - 1].0 + pairs[end].0) / 2.0;
            if mid > pairs[end - 1].0 {
                mid
            } else {
                pairs[end].0
            }
        } else {
            f64::INFINITY
        };

        let events = pairs[start..end].iter().filter(|(_, t)| *t == 1).count() as f64;
        let non_events = (end - start) as f64 - events;
        bins.push(Bin::new(BinRange::Interval { lower, upper }, events, non_events));

        lower = upper;
        start = end;
    }

    Ok((bins, missing_events, missing_non_events))
}

fn categorical_prebins(
    feature: &str,
    values: &[Option<String>],
    targets: &[i32],
    smoothing: f64,
) -> Result<(Vec<Bin>, f64, f64), PipelineError> {
    let mut stats: HashMap<&str, (f64, f64)> = HashMap::new();
    let mut missing_events = 0.0;
    let mut missing_non_events = 0.0;

    for (v, &t) in values.iter().zip(targets) {
        match v {
            Some(cat) => {
                let entry = stats.entry(cat.as_str()).or_insert((0.0, 0.0));
                if t == 1 {
                    entry.0 += 1.0;
                } else {
                    entry.1 += 1.0;
                }
            }
            None if t == 1 => missing_events += 1.0,
            None => missing_non_events += 1.0,
        }
    }

    if stats.len() < 2 {
        return Err(PipelineError::DegenerateFeature {
            feature: feature.to_string(),
            reason: format!("{} distinct categor(ies)", stats.len()),
        });
    }

    let mut bins: Vec<Bin> = stats
        .into_iter()
        .map(|(cat, (e, ne))| {
            Bin::new(
                BinRange::Categories {
                    members: vec![cat.to_string()],
                },
                e,
                ne,
            )
        })
        .collect();

    bins.sort_by(|a, b| {
        a.smoothed_odds(smoothing)
            .partial_cmp(&b.smoothed_odds(smoothing))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label().cmp(&b.label()))
    });

    Ok((bins, missing_events, missing_non_events))
}

fn merge_adjacent(bins: &mut Vec<Bin>, left: usize) {
    let right = bins.remove(left + 1);
    bins[left] = bins[left].merged(&right);
}

/// Fold bins below `min_count` into the neighbour with the closer event rate
fn merge_undersized(bins: &mut Vec<Bin>, min_count: f64) {
    while bins.len() > 1 {
        let smallest = bins
            .iter()
            .enumerate()
            .filter(|(_, b)| b.count < min_count)
            .fold(None, |best: Option<(usize, f64)>, (idx, b)| match best {
                Some((_, c)) if c <= b.count => best,
                _ => Some((idx, b.count)),
            });

        let Some((idx, _)) = smallest else {
            break;
        };

        let neighbour = if idx == 0 {
            1
        } else if idx == bins.len() - 1 {
            idx - 1
        } else {
            let rate = bins[idx].event_rate;
            let left_gap = (bins[idx - 1].event_rate - rate).abs();
            let right_gap = (bins[idx + 1].event_rate - rate).abs();
            if left_gap <= right_gap {
                idx - 1
            } else {
                idx + 1
            }
        };

        merge_adjacent(bins, idx.min(neighbour));
    }
}

/// Bottom-up ChiMerge.
///
/// Merges the adjacent pair with the smallest chi-square while there are
/// more than `max_bins` bins or some pair is not significantly different,
/// never going below `floor` bins.
fn chi_merge(bins: &mut Vec<Bin>, floor: usize, max_bins: usize, critical: f64) {
    while bins.len() > floor.max(1) {
        let (idx, min_chi) = (0..bins.len() - 1)
            .map(|i| (i, chi_square(&bins[i], &bins[i + 1])))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });

        if bins.len() > max_bins || min_chi < critical {
            merge_adjacent(bins, idx);
        } else {
            break;
        }
    }
}

fn count_violations(bins: &[Bin], trend: MonotonicityConstraint, smoothing: f64) -> usize {
    bins.windows(2)
        .filter(|w| violates(&w[0], &w[1], trend, smoothing))
        .count()
}

fn violates(left: &Bin, right: &Bin, trend: MonotonicityConstraint, smoothing: f64) -> bool {
    let (l, r) = (left.smoothed_odds(smoothing), right.smoothed_odds(smoothing));
    match trend {
        MonotonicityConstraint::Ascending => l > r,
        MonotonicityConstraint::Descending => l < r,
        _ => false,
    }
}

/// Merge trend-violating neighbours until WoE is monotonic or `floor` is reached.
/// Returns the trend that was applied.
fn enforce_monotonic(
    bins: &mut Vec<Bin>,
    floor: usize,
    constraint: MonotonicityConstraint,
    smoothing: f64,
) -> MonotonicityConstraint {
    let trend = match constraint {
        MonotonicityConstraint::None => return MonotonicityConstraint::None,
        MonotonicityConstraint::Auto => {
            let asc = count_violations(bins, MonotonicityConstraint::Ascending, smoothing);
            let desc = count_violations(bins, MonotonicityConstraint::Descending, smoothing);
            if desc < asc {
                MonotonicityConstraint::Descending
            } else {
                MonotonicityConstraint::Ascending
            }
        }
        fixed => fixed,
    };

    while bins.len() > floor.max(1) {
        let candidate = (0..bins.len() - 1)
            .filter(|&i| violates(&bins[i], &bins[i + 1], trend, smoothing))
            .map(|i| (i, chi_square(&bins[i], &bins[i + 1])))
            .fold(None, |best: Option<(usize, f64)>, cur| match best {
                Some(b) if b.1 <= cur.1 => Some(b),
                _ => Some(cur),
            });

        match candidate {
            Some((idx, _)) => merge_adjacent(bins, idx),
            None => break,
        }
    }

    trend
}

/// Fill in WoE, IV contribution and event rate for every bin
pub fn finalize_bins(bins: &mut [Bin], total_events: f64, total_non_events: f64, smoothing: f64) {
    for bin in bins.iter_mut() {
        let (woe, iv) =
            woe_iv(bin.events, bin.non_events, total_events, total_non_events, smoothing);
        bin.woe = woe;
        bin.iv_contribution = iv;
        bin.count = bin.events + bin.non_events;
        bin.event_rate = if bin.count > 0.0 { bin.events / bin.count } else { 0.0 };
    }
}

/// Bins for every selected feature, fit on one partition
#[derive(Debug, Clone, Default, Serialize)]
pub struct BinningMap {
    pub features: Vec<FeatureBinning>,
}

impl BinningMap {
    pub fn get(&self, feature: &str) -> Option<&FeatureBinning> {
        self.features.iter().find(|f| f.feature == feature)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.feature.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// WoE for a numeric value of `feature`
    pub fn woe_for_numeric(&self, feature: &str, value: Option<f64>) -> Result<f64> {
        Ok(self.require(feature)?.woe_for_numeric(value))
    }

    /// WoE for a category of `feature`, with the fallback applied to unseen values
    pub fn woe_for_category(&self, feature: &str, value: Option<&str>) -> Result<f64> {
        let binning = self.require(feature)?;
        Ok(binning
            .woe_for_category(value)
            .unwrap_or_else(|| binning.fallback_bin().woe))
    }

    fn require(&self, feature: &str) -> Result<&FeatureBinning> {
        self.get(feature).ok_or_else(|| {
            PipelineError::Schema(format!("feature '{}' has no binning", feature)).into()
        })
    }
}

/// Outcome of fitting the binning map
#[derive(Debug, Clone)]
pub struct BinningOutcome {
    pub map: BinningMap,
    /// Features dropped because they are degenerate or violate constraints
    pub excluded: Vec<String>,
    pub warnings: Vec<PipelineError>,
}

/// Fit supervised bins for `features` on `df`.
///
/// Features are binned in parallel; output order follows `features`.
pub fn fit_binning_map(
    df: &DataFrame,
    schema: &Schema,
    features: &[String],
    config: &BinningConfig,
) -> Result<BinningOutcome> {
    let targets = binary_target_values(df, &schema.target)?;
    let kinds: Vec<FeatureKind> = features
        .iter()
        .map(|f| schema.require(f))
        .collect::<Result<_>>()?;

    let pb = create_progress_bar(features.len() as u64, "   Binning");
    let progress = AtomicU64::new(0);

    let results: Vec<Result<Result<FeatureBinning, PipelineError>>> = features
        .par_iter()
        .zip(kinds.par_iter())
        .map(|(feature, &kind)| {
            let values = extract_feature_values(df, feature, kind)
                .with_context(|| format!("Failed to read feature '{}'", feature))?;
            let result = bin_feature(feature, &values, &targets, config, BinMode::Supervised);
            pb.set_position(progress.fetch_add(1, Ordering::Relaxed) + 1);
            Ok(result)
        })
        .collect();
    pb.finish_and_clear();

    let mut outcome = BinningOutcome {
        map: BinningMap::default(),
        excluded: Vec::new(),
        warnings: Vec::new(),
    };
    for (feature, result) in features.iter().zip(results) {
        match result? {
            Ok(binning) => outcome.map.features.push(binning),
            Err(err) => {
                outcome.excluded.push(feature.clone());
                outcome.warnings.push(err);
            }
        }
    }

    Ok(outcome)
}
