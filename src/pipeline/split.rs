//! Seeded, optionally stratified train/validation/test partitioning

use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::config::SplitConfig;
use super::error::PipelineError;
use super::target::{binary_target_values, count_classes};

/// Row indices of each partition, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Materialized partitions
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: DataFrame,
    pub validation: Option<DataFrame>,
    pub test: DataFrame,
}

impl DataSplit {
    /// Train, validation (when present) and test, in that order
    pub fn partitions(&self) -> impl Iterator<Item = &DataFrame> {
        std::iter::once(&self.train)
            .chain(self.validation.as_ref())
            .chain(std::iter::once(&self.test))
    }
}

/// Compute partition indices for a binary target.
///
/// With stratification each class is shuffled and cut separately, so every
/// partition keeps the overall class ratio up to rounding.
pub fn split_indices(targets: &[i32], config: &SplitConfig) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&config.test_fraction)
        || !(0.0..1.0).contains(&config.validation_fraction)
        || config.test_fraction + config.validation_fraction >= 1.0
    {
        anyhow::bail!(
            "Invalid split fractions: test={} validation={} (each in [0, 1), sum below 1)",
            config.test_fraction,
            config.validation_fraction
        );
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let groups: Vec<Vec<usize>> = if config.stratify {
        let (pos, neg): (Vec<usize>, Vec<usize>) =
            (0..targets.len()).partition(|&i| targets[i] == 1);
        vec![pos, neg]
    } else {
        vec![(0..targets.len()).collect()]
    };

    let mut indices = SplitIndices {
        train: Vec::new(),
        validation: Vec::new(),
        test: Vec::new(),
    };

    for mut group in groups {
        group.shuffle(&mut rng);
        let n = group.len();
        let n_test = (n as f64 * config.test_fraction).round() as usize;
        let n_valid = ((n as f64 * config.validation_fraction).round() as usize).min(n - n_test);

        indices.test.extend_from_slice(&group[..n_test]);
        indices.validation.extend_from_slice(&group[n_test..n_test + n_valid]);
        indices.train.extend_from_slice(&group[n_test + n_valid..]);
    }

    indices.train.sort_unstable();
    indices.validation.sort_unstable();
    indices.test.sort_unstable();
    Ok(indices)
}

/// Select rows by position
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("idx".into(), rows.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}

/// Split a cleaned dataset; the training partition must contain both classes
pub fn split_dataset(df: &DataFrame, target: &str, config: &SplitConfig) -> Result<DataSplit> {
    let targets = binary_target_values(df, target)?;
    let indices = split_indices(&targets, config)?;

    let train_targets: Vec<i32> = indices.train.iter().map(|&i| targets[i]).collect();
    let (events, non_events) = count_classes(&train_targets);
    if events == 0 || non_events == 0 {
        return Err(PipelineError::EmptyPartition {
            partition: "train".to_string(),
            reason: format!("{} event(s) and {} non-event(s)", events, non_events),
        }
        .into());
    }
    if indices.test.is_empty() {
        return Err(PipelineError::EmptyPartition {
            partition: "test".to_string(),
            reason: "no rows assigned".to_string(),
        }
        .into());
    }

    let validation = if indices.validation.is_empty() {
        None
    } else {
        Some(take_rows(df, &indices.validation)?)
    };

    Ok(DataSplit {
        train: take_rows(df, &indices.train)?,
        validation,
        test: take_rows(df, &indices.test)?,
    })
}
