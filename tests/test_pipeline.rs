//! Integration tests for the full churn scoring pipeline

use std::time::Duration;

use churnscore::pipeline::*;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn churn_config() -> PipelineConfig {
    PipelineConfig {
        drop_columns: vec!["customer_id".to_string()],
        ..PipelineConfig::default()
    }
}

fn run(df: &DataFrame, config: PipelineConfig) -> PipelineOutcome {
    let engine = IrlsEngine::new();
    ChurnPipeline::new(config)
        .run(df, &engine, &mut SilentObserver)
        .unwrap()
}

#[derive(Default)]
struct RecordingObserver {
    started: Vec<PipelineStage>,
    finished: Vec<PipelineStage>,
    recovered: Vec<PipelineStage>,
}

impl StageObserver for RecordingObserver {
    fn stage_started(&mut self, stage: PipelineStage) {
        self.started.push(stage);
    }

    fn stage_finished(&mut self, stage: PipelineStage, _elapsed: Duration, _summary: &str) {
        self.finished.push(stage);
    }

    fn recovered(&mut self, stage: PipelineStage, _warning: &PipelineError) {
        self.recovered.push(stage);
    }
}

#[test]
fn test_full_pipeline_keeps_separator_and_discriminates() {
    let df = create_churn_dataframe(2000, 42);
    let outcome = run(&df, churn_config());

    let final_features = &outcome.refinement.final_features;
    assert!(final_features.contains(&"score".to_string()), "final: {:?}", final_features);
    assert!(!final_features.contains(&"noise".to_string()), "final: {:?}", final_features);
    assert!(outcome.evaluation.test_auc > 0.95, "test AUC {}", outcome.evaluation.test_auc);

    assert_eq!(outcome.input_rows, 2000);
    assert_eq!(outcome.dropped_columns, vec!["customer_id"]);
    assert_eq!(outcome.partitions.train + outcome.partitions.test, 2000);
    assert_eq!(outcome.timings.len(), PipelineStage::ALL.len());
}

#[test]
fn test_scenario_keeps_separator_and_screens_out_noise() {
    for seed in 0..5 {
        let df = create_scenario_dataframe(seed);
        let outcome = run(&df, PipelineConfig::default());

        let final_features = &outcome.refinement.final_features;
        assert!(
            final_features.contains(&"sep".to_string()),
            "seed {}: final {:?}",
            seed,
            final_features
        );

        let noise = outcome.iv.stats.iter().find(|s| s.feature == "noise").unwrap();
        assert!(noise.iv <= 0.02, "seed {}: noise IV {}", seed, noise.iv);
        assert!(!outcome.iv.selected.contains(&"noise".to_string()));

        let constant = outcome.iv.stats.iter().find(|s| s.feature == "constant").unwrap();
        assert_eq!(constant.iv, 0.0);
        assert!(!constant.selected);
        let capping = outcome
            .outlier_reports
            .iter()
            .find(|r| r.feature == "constant")
            .unwrap();
        assert!(capping.skipped);
        assert_eq!(capping.total_capped(), 0);

        assert!(
            outcome.evaluation.test_auc > 0.95,
            "seed {}: test AUC {}",
            seed,
            outcome.evaluation.test_auc
        );
        assert_eq!(outcome.partitions.train + outcome.partitions.test, 1000);
    }
}

#[test]
fn test_scenario_duplicate_pair_loses_exactly_one() {
    let mut df = create_scenario_dataframe(7);
    let doubled: Vec<f64> = df
        .column("tenure")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .map(|x| 2.0 * x + 3.0)
        .collect();
    df.with_column(Column::new("tenure_scaled".into(), doubled)).unwrap();

    let outcome = run(&df, PipelineConfig::default());
    let in_model = ["tenure", "tenure_scaled"]
        .iter()
        .filter(|f| outcome.binning.get(f).is_some())
        .count();
    let removed_as_undefined = outcome
        .refinement
        .steps
        .iter()
        .filter(|s| {
            (s.removed == "tenure" || s.removed == "tenure_scaled")
                && s.reason == RemovalReason::Undefined
        })
        .count();

    assert_eq!(in_model, 2);
    assert_eq!(removed_as_undefined, 1, "steps: {:?}", outcome.refinement.steps);
}

#[test]
fn test_noise_is_not_selected() {
    let df = create_churn_dataframe(2000, 43);
    let outcome = run(&df, churn_config());

    let noise = outcome.iv.stats.iter().find(|s| s.feature == "noise").unwrap();
    assert!(noise.iv <= 0.02, "noise IV {}", noise.iv);
    assert!(!outcome.iv.selected.contains(&"noise".to_string()));
    assert!(outcome.binning.get("noise").is_none());
}

#[test]
fn test_duplicated_feature_is_pruned() {
    let mut df = create_churn_dataframe(2000, 44);
    let doubled: Vec<f64> = df
        .column("score")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .map(|x| 2.0 * x + 3.0)
        .collect();
    df.with_column(Column::new("score_scaled".into(), doubled)).unwrap();

    let outcome = run(&df, churn_config());
    let final_features = &outcome.refinement.final_features;
    let kept = ["score", "score_scaled"]
        .iter()
        .filter(|f| final_features.contains(&f.to_string()))
        .count();

    assert_eq!(kept, 1, "final: {:?}", final_features);
    assert!(outcome
        .refinement
        .steps
        .iter()
        .any(|s| s.removed == "score" || s.removed == "score_scaled"));
}

#[test]
fn test_validation_partition_is_scored() {
    let df = create_churn_dataframe(2000, 45);
    let mut config = churn_config();
    config.split.validation_fraction = 0.2;

    let outcome = run(&df, config);

    assert!(outcome.partitions.validation > 0);
    assert_eq!(
        outcome.partitions.train + outcome.partitions.validation + outcome.partitions.test,
        2000
    );
    assert!(outcome.evaluation.validation_auc.unwrap() > 0.9);
}

#[test]
fn test_solver_binning_pipeline() {
    let df = create_churn_dataframe(1500, 46);
    let mut config = churn_config();
    config.binning.method = BinningMethod::Solver;

    let outcome = run(&df, config);

    assert!(outcome.refinement.final_features.contains(&"score".to_string()));
    assert!(outcome.evaluation.test_auc > 0.95);
    for binning in &outcome.binning.features {
        assert!(binning.bins.len() <= 10);
    }
}

#[test]
fn test_same_seed_reproduces_the_model() {
    let df = create_churn_dataframe(1200, 47);

    let a = run(&df, churn_config());
    let b = run(&df, churn_config());

    assert_eq!(a.refinement.final_features, b.refinement.final_features);
    assert_eq!(a.evaluation.test_auc, b.evaluation.test_auc);
    assert_eq!(a.evaluation.threshold, b.evaluation.threshold);
}

#[test]
fn test_observer_sees_every_stage_in_order() {
    let df = create_churn_dataframe(1000, 48);
    let engine = IrlsEngine::new();
    let mut observer = RecordingObserver::default();

    let outcome = ChurnPipeline::new(churn_config())
        .run(&df, &engine, &mut observer)
        .unwrap();

    assert_eq!(observer.started, PipelineStage::ALL.to_vec());
    assert_eq!(observer.finished, PipelineStage::ALL.to_vec());
    assert_eq!(observer.recovered.len(), outcome.warnings.len());
}

#[test]
fn test_capping_can_be_disabled() {
    let df = create_churn_dataframe(1000, 49);
    let mut config = churn_config();
    config.cap_outliers = false;

    let outcome = run(&df, config);
    assert!(outcome.outlier_reports.is_empty());

    let capped = run(&df, churn_config());
    let charges = capped.outlier_reports.iter().find(|r| r.feature == "charges").unwrap();
    assert!(charges.capped_high > 0);
}

#[test]
fn test_missing_target_fails_in_clean_stage() {
    let df = create_churn_dataframe(200, 50);
    let mut config = churn_config();
    config.target.column = "churned".to_string();

    let engine = IrlsEngine::new();
    let err = ChurnPipeline::new(config)
        .run(&df, &engine, &mut SilentObserver)
        .unwrap_err();

    assert!(err.to_string().contains(&PipelineStage::Clean.to_string()));
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Schema(_))
    ));
}
