//! Information Value (IV) screening of candidate features
//!
//! Every schema feature is binned in screening mode on the training
//! partition. Screening bins may collapse to a single bin, so a feature with
//! no significant split scores an IV of exactly zero. Features whose IV
//! exceeds the threshold move on to supervised binning.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use super::binning::{bin_feature, extract_feature_values, BinMode};
use super::config::BinningConfig;
use super::error::PipelineError;
use super::schema::{FeatureKind, Schema};
use super::target::binary_target_values;
use crate::utils::create_progress_bar;
use polars::prelude::DataFrame;

/// Screening statistics for one feature
#[derive(Debug, Clone, Serialize)]
pub struct FeatureStat {
    pub feature: String,
    pub kind: FeatureKind,
    pub iv: f64,
    /// Gini of the screening WoE encoding on the training partition
    pub gini: f64,
    pub bins: usize,
    pub selected: bool,
    /// Set when the feature could not be binned
    pub note: Option<String>,
}

/// IV of every feature and the subset kept for binning
#[derive(Debug, Clone)]
pub struct IvScreening {
    /// Sorted by IV descending, then by name
    pub stats: Vec<FeatureStat>,
    /// Selected features, in `stats` order
    pub selected: Vec<String>,
    pub warnings: Vec<PipelineError>,
}

/// Features whose IV is strictly above `threshold`
pub fn select_by_threshold(stats: &[FeatureStat], threshold: f64) -> Vec<String> {
    stats
        .iter()
        .filter(|s| s.iv > threshold)
        .map(|s| s.feature.clone())
        .collect()
}

/// Compute IV for every schema feature and select those above `threshold`.
///
/// A degenerate feature (constant, all missing) is reported with IV 0 and a
/// warning rather than failing the stage.
pub fn screen_features(
    df: &DataFrame,
    schema: &Schema,
    config: &BinningConfig,
    threshold: f64,
) -> Result<IvScreening> {
    let targets = binary_target_values(df, &schema.target)?;
    let features: Vec<(String, FeatureKind)> = schema
        .features()
        .map(|(name, kind)| (name.to_string(), kind))
        .collect();

    if features.is_empty() {
        return Ok(IvScreening {
            stats: Vec::new(),
            selected: Vec::new(),
            warnings: Vec::new(),
        });
    }

    let pb = create_progress_bar(features.len() as u64, "   Calculating IV");
    let progress = AtomicU64::new(0);

    let results: Vec<Result<(FeatureStat, Option<PipelineError>)>> = features
        .par_iter()
        .map(|(feature, kind)| {
            let values = extract_feature_values(df, feature, *kind)
                .with_context(|| format!("Failed to read feature '{}'", feature))?;
            let outcome = bin_feature(feature, &values, &targets, config, BinMode::Screening);
            pb.set_position(progress.fetch_add(1, Ordering::Relaxed) + 1);

            Ok(match outcome {
                Ok(binning) => (
                    FeatureStat {
                        feature: feature.clone(),
                        kind: *kind,
                        iv: binning.iv,
                        gini: binning.gini(),
                        bins: binning.bins.len(),
                        selected: false,
                        note: None,
                    },
                    None,
                ),
                Err(err) => (
                    FeatureStat {
                        feature: feature.clone(),
                        kind: *kind,
                        iv: 0.0,
                        gini: 0.0,
                        bins: 0,
                        selected: false,
                        note: Some(err.to_string()),
                    },
                    Some(err),
                ),
            })
        })
        .collect();
    pb.finish_and_clear();

    let mut stats = Vec::with_capacity(results.len());
    let mut warnings = Vec::new();
    for result in results {
        let (stat, warning) = result?;
        stats.push(stat);
        warnings.extend(warning);
    }

    stats.sort_by(|a, b| {
        b.iv.partial_cmp(&a.iv)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.feature.cmp(&b.feature))
    });

    let selected = select_by_threshold(&stats, threshold);
    for stat in stats.iter_mut() {
        stat.selected = selected.contains(&stat.feature);
    }

    Ok(IvScreening {
        stats,
        selected,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use super::Schema;

    fn stat(feature: &str, iv: f64) -> FeatureStat {
        FeatureStat {
            feature: feature.to_string(),
            kind: FeatureKind::Numeric,
            iv,
            gini: 0.0,
            bins: 2,
            selected: false,
            note: None,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let stats = vec![stat("a", 0.5), stat("b", 0.02), stat("c", 0.0)];
        assert_eq!(select_by_threshold(&stats, 0.02), vec!["a".to_string()]);
        assert_eq!(select_by_threshold(&stats, 0.0), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_screen_orders_by_iv_and_flags_degenerate() {
        let n = 200;
        let y: Vec<i32> = (0..n).map(|i| (i % 2) as i32).collect();
        let strong: Vec<f64> = y
            .iter()
            .enumerate()
            .map(|(i, &t)| (t * 1000) as f64 + i as f64)
            .collect();
        let noise: Vec<f64> = (0..n).map(|i| (i / 2) as f64).collect();
        let constant = vec![1.0f64; n];
        let df = DataFrame::new(vec![
            Column::new("strong".into(), strong),
            Column::new("noise".into(), noise),
            Column::new("constant".into(), constant),
            Column::new("y".into(), y),
        ])
        .unwrap();
        let (schema, _) = Schema::infer(&df, "y").unwrap();

        let screening = screen_features(&df, &schema, &BinningConfig::default(), 0.02).unwrap();

        assert_eq!(screening.stats[0].feature, "strong");
        assert!(screening.stats[0].selected);
        assert_eq!(screening.selected, vec!["strong".to_string()]);

        let noise = screening.stats.iter().find(|s| s.feature == "noise").unwrap();
        assert!(noise.iv.abs() < 1e-12);
        let constant = screening.stats.iter().find(|s| s.feature == "constant").unwrap();
        assert_eq!(constant.iv, 0.0);
        assert!(constant.note.is_some());
        assert_eq!(screening.warnings.len(), 1);
    }
}
