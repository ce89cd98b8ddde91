//! End-to-end pipeline: clean, cap, split, screen, bin, transform, refine, evaluate
//!
//! Stages run strictly in sequence. Each one either hands its output to the
//! next or fails the run with the stage name attached. Recoverable problems
//! are passed to the observer as they happen and collected on the outcome.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use serde::Serialize;

use super::binning::{fit_binning_map, BinningMap};
use super::config::PipelineConfig;
use super::engine::{ModelEngine, TrainingData};
use super::error::{PipelineError, PipelineStage};
use super::iv::{screen_features, IvScreening};
use super::loader::clean_dataset;
use super::metrics::{evaluate, EvaluationResult};
use super::outliers::{cap_outliers, OutlierReport};
use super::refine::{refine, RefinementOutcome};
use super::schema::Schema;
use super::split::split_dataset;
use super::woe::transform;

/// Receives stage lifecycle events; every method defaults to a no-op
pub trait StageObserver {
    fn stage_started(&mut self, _stage: PipelineStage) {}

    fn stage_finished(&mut self, _stage: PipelineStage, _elapsed: Duration, _summary: &str) {}

    /// A recoverable error was handled inside `stage`
    fn recovered(&mut self, _stage: PipelineStage, _warning: &PipelineError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl StageObserver for SilentObserver {}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub seconds: f64,
}

/// A recoverable error together with the stage that handled it
#[derive(Debug, Clone, Serialize)]
pub struct StageWarning {
    pub stage: PipelineStage,
    pub message: String,
    #[serde(skip)]
    pub error: PipelineError,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PartitionRows {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub input_rows: usize,
    pub input_columns: usize,
    pub dropped_columns: Vec<String>,
    pub dropped_rows: usize,
    pub schema: Schema,
    /// Columns whose dtype is neither numeric nor categorical
    pub unsupported_columns: Vec<String>,
    pub outlier_reports: Vec<OutlierReport>,
    pub partitions: PartitionRows,
    pub iv: IvScreening,
    pub binning: BinningMap,
    /// IV-selected features that supervised binning rejected
    pub excluded_features: Vec<String>,
    pub refinement: RefinementOutcome,
    pub evaluation: EvaluationResult,
    pub warnings: Vec<StageWarning>,
    pub timings: Vec<StageTiming>,
}

impl PipelineOutcome {
    pub fn total_seconds(&self) -> f64 {
        self.timings.iter().map(|t| t.seconds).sum()
    }
}

/// Tracks timings and warnings while stages run
struct StageClock<'o> {
    observer: &'o mut dyn StageObserver,
    timings: Vec<StageTiming>,
    warnings: Vec<StageWarning>,
}

impl<'o> StageClock<'o> {
    fn run<T>(
        &mut self,
        stage: PipelineStage,
        f: impl FnOnce() -> Result<(T, String)>,
    ) -> Result<T> {
        self.observer.stage_started(stage);
        let start = Instant::now();
        let (value, summary) = f().with_context(|| format!("{} stage failed", stage))?;
        let elapsed = start.elapsed();
        self.observer.stage_finished(stage, elapsed, &summary);
        self.timings.push(StageTiming {
            stage,
            seconds: elapsed.as_secs_f64(),
        });
        Ok(value)
    }

    /// Record errors a stage handled locally; a fatal one fails the stage instead
    fn recover(&mut self, stage: PipelineStage, warnings: Vec<PipelineError>) -> Result<()> {
        for error in warnings {
            if !error.is_recoverable() {
                return Err(error).with_context(|| format!("{} stage failed", stage));
            }
            self.observer.recovered(stage, &error);
            self.warnings.push(StageWarning {
                stage,
                message: error.to_string(),
                error,
            });
        }
        Ok(())
    }
}

/// The churn scoring pipeline
#[derive(Debug, Clone, Default)]
pub struct ChurnPipeline {
    config: PipelineConfig,
}

impl ChurnPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on a raw dataset
    pub fn run<E: ModelEngine + ?Sized>(
        &self,
        raw: &DataFrame,
        engine: &E,
        observer: &mut dyn StageObserver,
    ) -> Result<PipelineOutcome> {
        let config = &self.config;
        let target = config.target.column.as_str();
        let mut clock = StageClock {
            observer,
            timings: Vec::new(),
            warnings: Vec::new(),
        };

        let cleaned = clock.run(PipelineStage::Clean, || {
            let cleaned = clean_dataset(raw, &config.target, &config.drop_columns)?;
            let summary = format!(
                "{} rows kept, {} dropped for target, {} column(s) removed",
                cleaned.df.height(),
                cleaned.dropped_rows,
                cleaned.dropped_columns.len()
            );
            Ok((cleaned, summary))
        })?;

        let (schema, unsupported_columns) = clock.run(PipelineStage::Schema, || {
            let (schema, unsupported) = Schema::infer(&cleaned.df, target)?;
            if schema.is_empty() {
                return Err(
                    PipelineError::Schema("dataset has no usable feature columns".to_string())
                        .into(),
                );
            }
            let summary = format!(
                "{} numeric, {} categorical feature(s)",
                schema.numeric_features().len(),
                schema.categorical_features().len()
            );
            Ok(((schema, unsupported), summary))
        })?;

        let capping = clock.run(PipelineStage::OutlierCapping, || {
            if !config.cap_outliers {
                return Ok((None, "skipped".to_string()));
            }
            let result = cap_outliers(&cleaned.df, &schema)?;
            let capped: usize = result.reports.iter().map(|r| r.total_capped()).sum();
            let features = result.reports.iter().filter(|r| r.total_capped() > 0).count();
            let summary = format!("{} value(s) capped across {} feature(s)", capped, features);
            Ok((Some(result), summary))
        })?;
        let (capped_df, outlier_reports) = match capping {
            Some(result) => {
                clock.recover(PipelineStage::OutlierCapping, result.warnings)?;
                (result.df, result.reports)
            }
            None => (cleaned.df.clone(), Vec::new()),
        };

        let split = clock.run(PipelineStage::Split, || {
            let split = split_dataset(&capped_df, target, &config.split)?;
            let summary = format!(
                "train {} / validation {} / test {} rows",
                split.train.height(),
                split.validation.as_ref().map_or(0, |v| v.height()),
                split.test.height()
            );
            Ok((split, summary))
        })?;
        let partitions = PartitionRows {
            train: split.train.height(),
            validation: split.validation.as_ref().map_or(0, |v| v.height()),
            test: split.test.height(),
        };

        let iv = clock.run(PipelineStage::IvScreening, || {
            let screening =
                screen_features(&split.train, &schema, &config.binning, config.iv_threshold)?;
            let summary = format!(
                "{} of {} feature(s) above IV {}",
                screening.selected.len(),
                screening.stats.len(),
                config.iv_threshold
            );
            Ok((screening, summary))
        })?;
        clock.recover(PipelineStage::IvScreening, iv.warnings.clone())?;

        let binning = clock.run(PipelineStage::Binning, || {
            let outcome = fit_binning_map(&split.train, &schema, &iv.selected, &config.binning)?;
            let summary = format!(
                "{} feature(s) binned, {} excluded",
                outcome.map.len(),
                outcome.excluded.len()
            );
            Ok((outcome, summary))
        })?;
        clock.recover(PipelineStage::Binning, binning.warnings.clone())?;

        let woe_stage = clock.run(PipelineStage::WoeTransform, || {
            for partition in split.partitions() {
                schema.validate(partition)?;
            }
            let (train, mut warnings) = transform(&binning.map, &split.train, target)?;
            let validation = match &split.validation {
                Some(v) => {
                    let (df, w) = transform(&binning.map, v, target)?;
                    warnings.extend(w);
                    Some(df)
                }
                None => None,
            };
            let (test, w) = transform(&binning.map, &split.test, target)?;
            warnings.extend(w);
            let summary = format!("{} WoE column(s) per partition", binning.map.len());
            Ok(((train, validation, test, warnings), summary))
        })?;
        let (woe_train, woe_validation, woe_test, woe_warnings) = woe_stage;
        clock.recover(PipelineStage::WoeTransform, woe_warnings)?;

        let data = TrainingData {
            train: &woe_train,
            validation: woe_validation.as_ref(),
            target,
        };

        let refinement = clock.run(PipelineStage::Refinement, || {
            let outcome = refine(
                engine,
                &data,
                &binning.map.feature_names(),
                &config.refinement,
                &config.fit,
            )?;
            let summary = format!(
                "{} feature(s) retained after {} removal(s)",
                outcome.final_features.len(),
                outcome.steps.len()
            );
            Ok((outcome, summary))
        })?;
        clock.recover(PipelineStage::Refinement, refinement.warnings.clone())?;

        let evaluation = clock.run(PipelineStage::Evaluation, || {
            let result = evaluate(&refinement.model, &woe_test, target)?;
            let summary = format!("test AUC {:.4}, Gini {:.4}", result.test_auc, result.gini);
            Ok((result, summary))
        })?;

        Ok(PipelineOutcome {
            input_rows: raw.height(),
            input_columns: raw.width(),
            dropped_columns: cleaned.dropped_columns,
            dropped_rows: cleaned.dropped_rows,
            schema,
            unsupported_columns,
            outlier_reports,
            partitions,
            iv,
            excluded_features: binning.excluded,
            binning: binning.map,
            refinement,
            evaluation,
            warnings: clock.warnings,
            timings: clock.timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        recovered: usize,
    }

    impl StageObserver for Counting {
        fn recovered(&mut self, _stage: PipelineStage, _warning: &PipelineError) {
            self.recovered += 1;
        }
    }

    fn degenerate(feature: &str) -> PipelineError {
        PipelineError::DegenerateFeature {
            feature: feature.to_string(),
            reason: "constant value 1".to_string(),
        }
    }

    #[test]
    fn test_recover_collects_recoverable_errors() {
        let mut observer = Counting::default();
        let mut clock = StageClock {
            observer: &mut observer,
            timings: Vec::new(),
            warnings: Vec::new(),
        };

        clock
            .recover(PipelineStage::IvScreening, vec![degenerate("a"), degenerate("b")])
            .unwrap();

        assert_eq!(clock.warnings.len(), 2);
        assert_eq!(clock.warnings[0].stage, PipelineStage::IvScreening);
        assert_eq!(observer.recovered, 2);
    }

    #[test]
    fn test_recover_fails_stage_on_fatal_error() {
        let mut observer = Counting::default();
        let mut clock = StageClock {
            observer: &mut observer,
            timings: Vec::new(),
            warnings: Vec::new(),
        };
        let fatal = PipelineError::Schema("feature 'age' missing from dataset".to_string());

        let err = clock
            .recover(PipelineStage::WoeTransform, vec![degenerate("a"), fatal.clone()])
            .unwrap_err();

        assert!(err.to_string().contains("stage failed"));
        assert_eq!(err.downcast_ref::<PipelineError>(), Some(&fatal));
        assert_eq!(clock.warnings.len(), 1);
    }
}
