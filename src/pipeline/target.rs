//! Target label normalization
//!
//! The churn label arrives as raw text ("yes"/"no") and is normalized to an
//! Int32 0/1 indicator. Columns that are already numeric 0/1 pass through.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Mapping from raw target labels to the binary indicator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetMapping {
    /// Value that maps to 1 (churn)
    pub event_value: String,
    /// Value that maps to 0 (no churn)
    pub non_event_value: String,
}

impl TargetMapping {
    pub fn new(event_value: impl Into<String>, non_event_value: impl Into<String>) -> Self {
        Self {
            event_value: event_value.into(),
            non_event_value: non_event_value.into(),
        }
    }
}

/// How a target column should be interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum TargetAnalysis {
    /// Numeric column holding only 0 and 1
    AlreadyBinary,
    /// Labels that need the mapping; distinct non-null values, sorted
    NeedsMapping { unique_values: Vec<String> },
}

/// Inspect a target column and decide whether it needs label mapping
pub fn analyze_target_column(df: &DataFrame, target: &str) -> Result<TargetAnalysis> {
    let target_col = df
        .column(target)
        .map_err(|_| PipelineError::Schema(format!("target column '{}' not found", target)))?;

    if target_col.len() == 0 || target_col.null_count() == target_col.len() {
        return Err(PipelineError::Schema(format!(
            "target column '{}' has no non-null values",
            target
        ))
        .into());
    }

    if target_col.dtype().is_primitive_numeric() {
        let float_col = target_col.cast(&DataType::Float64)?;
        let is_binary = float_col
            .f64()?
            .into_iter()
            .flatten()
            .all(|v| v.abs() < TOLERANCE || (v - 1.0).abs() < TOLERANCE);
        if is_binary {
            return Ok(TargetAnalysis::AlreadyBinary);
        }
    }

    let mut unique_values: Vec<String> = column_to_string_vec(target_col)?
        .into_iter()
        .flatten()
        .collect();
    unique_values.sort();
    unique_values.dedup();

    Ok(TargetAnalysis::NeedsMapping { unique_values })
}

/// Map every target row to Some(1), Some(0), or None for unmapped labels
pub fn create_target_mask(
    df: &DataFrame,
    target: &str,
    mapping: &TargetMapping,
) -> Result<Vec<Option<i32>>> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    let mask = match analyze_target_column(df, target)? {
        TargetAnalysis::AlreadyBinary => target_col
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| if x > 0.5 { 1 } else { 0 }))
            .collect(),
        TargetAnalysis::NeedsMapping { .. } => column_to_string_vec(target_col)?
            .into_iter()
            .map(|v| match v {
                Some(s) if s.trim() == mapping.event_value => Some(1),
                Some(s) if s.trim() == mapping.non_event_value => Some(0),
                _ => None,
            })
            .collect(),
    };

    Ok(mask)
}

/// Read a normalized Int32 0/1 target column; nulls are a schema error
pub fn binary_target_values(df: &DataFrame, target: &str) -> Result<Vec<i32>> {
    let col = df
        .column(target)
        .map_err(|_| PipelineError::Schema(format!("target column '{}' not found", target)))?;
    let cast = col.cast(&DataType::Int32)?;
    cast.i32()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                PipelineError::Schema(format!("target column '{}' contains nulls", target)).into()
            })
        })
        .collect()
}

/// Count (events, non-events) in a binary target
pub fn count_classes(targets: &[i32]) -> (usize, usize) {
    let events = targets.iter().filter(|&&t| t == 1).count();
    (events, targets.len() - events)
}

fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let cast = col.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}
