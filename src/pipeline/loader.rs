//! Dataset loader and cleaner for CSV and Parquet files

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::config::TargetSpec;
use super::error::PipelineError;
use super::target::{create_target_mask, TargetMapping};

/// Options for reading the raw input file
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field separator for CSV input
    pub separator: u8,
    /// Rows scanned for CSV schema inference; 0 scans the whole file
    pub infer_schema_length: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            infer_schema_length: 10000,
        }
    }
}

/// Result of cleaning a raw dataset
#[derive(Debug)]
pub struct CleanedDataset {
    /// Rows with a mapped target; target column is Int32 0/1
    pub df: DataFrame,
    /// Columns actually removed (requested names that were absent are skipped)
    pub dropped_columns: Vec<String>,
    /// Rows removed because the target was null or not a known label
    pub dropped_rows: usize,
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" | "txt" => {
            let schema_length = if options.infer_schema_length == 0 {
                None
            } else {
                Some(options.infer_schema_length)
            };
            LazyCsvReader::new(path)
                .with_separator(options.separator)
                .with_infer_schema_length(schema_length)
                .finish()
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        }
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Drop irrelevant columns and normalize the target to a 0/1 indicator
pub fn clean_dataset(
    df: &DataFrame,
    target: &TargetSpec,
    drop_columns: &[String],
) -> Result<CleanedDataset> {
    let existing: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    if !existing.contains(&target.column) {
        return Err(PipelineError::Schema(format!(
            "target column '{}' not found. Available columns: {:?}",
            target.column, existing
        ))
        .into());
    }

    let dropped_columns: Vec<String> = drop_columns
        .iter()
        .filter(|c| **c != target.column && existing.contains(c))
        .cloned()
        .collect();
    let df = df.drop_many(dropped_columns.iter().map(|s| s.as_str()));

    let mapping = TargetMapping::new(target.event_value.clone(), target.non_event_value.clone());
    let mask = create_target_mask(&df, &target.column, &mapping)?;

    let keep: Vec<bool> = mask.iter().map(|m| m.is_some()).collect();
    let dropped_rows = keep.iter().filter(|k| !**k).count();
    if dropped_rows == mask.len() {
        return Err(PipelineError::Schema(format!(
            "no rows of '{}' match '{}' or '{}'",
            target.column, target.event_value, target.non_event_value
        ))
        .into());
    }

    let labels: Vec<i32> = mask.into_iter().flatten().collect();
    let keep_mask = BooleanChunked::from_slice("keep".into(), &keep);
    let mut cleaned = df.filter(&keep_mask)?;
    cleaned.with_column(Column::new(target.column.as_str().into(), labels))?;

    Ok(CleanedDataset {
        df: cleaned,
        dropped_columns,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_maps_labels_and_drops_unmapped_rows() {
        let df = df! {
            "age" => [30i64, 40, 50, 60],
            "duration" => [100i64, 200, 300, 400],
            "y" => [Some("yes"), Some("no"), None, Some("no")],
        }
        .unwrap();

        let cleaned = clean_dataset(
            &df,
            &TargetSpec::default(),
            &["duration".to_string(), "not_there".to_string()],
        )
        .unwrap();

        assert_eq!(cleaned.dropped_rows, 1);
        assert_eq!(cleaned.dropped_columns, vec!["duration".to_string()]);
        assert_eq!(cleaned.df.width(), 2);

        let y: Vec<Option<i32>> =
            cleaned.df.column("y").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(y, vec![Some(1), Some(0), Some(0)]);
        let age: Vec<Option<i64>> =
            cleaned.df.column("age").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(age, vec![Some(30), Some(40), Some(60)]);
    }

    #[test]
    fn test_clean_rejects_missing_target() {
        let df = df! {
            "age" => [30i64, 40],
        }
        .unwrap();

        let err = clean_dataset(&df, &TargetSpec::default(), &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Schema(_))
        ));
    }

    #[test]
    fn test_clean_never_drops_target_column() {
        let df = df! {
            "age" => [30i64, 40],
            "y" => ["yes", "no"],
        }
        .unwrap();

        let cleaned = clean_dataset(&df, &TargetSpec::default(), &["y".to_string()]).unwrap();
        assert!(cleaned.df.column("y").is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load_dataset(Path::new("data.xlsx"), &LoadOptions::default());
        assert!(result.is_err());
    }
}
