//! Tukey-fence outlier capping for numeric features
//!
//! Quartiles use the nearest-rank definition so that fences always sit on
//! observed order statistics. Clamping is monotone, so the quartiles of a
//! capped column equal the quartiles before capping and a second pass
//! changes nothing.

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::error::PipelineError;
use super::schema::Schema;

/// Fence multiplier applied to the interquartile range
pub const TUKEY_K: f64 = 1.5;

/// Per-feature capping outcome
#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub feature: String,
    pub q1: f64,
    pub q3: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub capped_low: usize,
    pub capped_high: usize,
    /// True when the feature was left alone because its IQR is zero or it has no values
    pub skipped: bool,
}

impl OutlierReport {
    pub fn total_capped(&self) -> usize {
        self.capped_low + self.capped_high
    }
}

/// Capped dataset plus reports
#[derive(Debug)]
pub struct CappingResult {
    pub df: DataFrame,
    pub reports: Vec<OutlierReport>,
    pub warnings: Vec<PipelineError>,
}

/// Nearest-rank quantile of an ascending slice
pub fn nearest_rank_quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[idx])
}

/// Compute (q1, q3, lower fence, upper fence) for the non-missing values
pub fn tukey_fences(values: &[f64]) -> Option<(f64, f64, f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = nearest_rank_quantile(&sorted, 0.25)?;
    let q3 = nearest_rank_quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1, q3, q1 - TUKEY_K * iqr, q3 + TUKEY_K * iqr))
}

/// Cap every numeric schema feature at its Tukey fences.
///
/// Returns a new frame. Categorical columns and the target are untouched, and
/// features without outliers keep their original column and dtype.
pub fn cap_outliers(df: &DataFrame, schema: &Schema) -> Result<CappingResult> {
    let mut out = df.clone();
    let mut reports = Vec::new();
    let mut warnings = Vec::new();

    for feature in schema.numeric_features() {
        let col = df
            .column(&feature)
            .map_err(|_| {
                PipelineError::Schema(format!("feature '{}' missing from dataset", feature))
            })?;
        let float_col = col.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = float_col.f64()?.into_iter().collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();

        let Some((q1, q3, lower, upper)) = tukey_fences(&present) else {
            warnings.push(PipelineError::DegenerateFeature {
                feature: feature.clone(),
                reason: "no non-missing values; capping skipped".to_string(),
            });
            reports.push(skipped_report(&feature, f64::NAN, f64::NAN));
            continue;
        };

        if q3 - q1 <= 0.0 {
            warnings.push(PipelineError::DegenerateFeature {
                feature: feature.clone(),
                reason: format!("interquartile range is zero (q1 = q3 = {}); capping skipped", q1),
            });
            reports.push(skipped_report(&feature, q1, q3));
            continue;
        }

        let capped_low = present.iter().filter(|&&v| v < lower).count();
        let capped_high = present.iter().filter(|&&v| v > upper).count();

        if capped_low + capped_high > 0 {
            let capped: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.map(|x| x.clamp(lower, upper)))
                .collect();
            out.with_column(Column::new(feature.as_str().into(), capped))?;
        }

        reports.push(OutlierReport {
            feature,
            q1,
            q3,
            lower_fence: lower,
            upper_fence: upper,
            capped_low,
            capped_high,
            skipped: false,
        });
    }

    Ok(CappingResult {
        df: out,
        reports,
        warnings,
    })
}

fn skipped_report(feature: &str, q1: f64, q3: f64) -> OutlierReport {
    OutlierReport {
        feature: feature.to_string(),
        q1,
        q3,
        lower_fence: q1,
        upper_fence: q3,
        capped_low: 0,
        capped_high: 0,
        skipped: true,
    }
}
