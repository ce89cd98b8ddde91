//! Pipeline module - the churn scoring stages and their orchestration

pub mod binning;
pub mod config;
pub mod engine;
pub mod error;
pub mod iv;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod outliers;
pub mod refine;
pub mod runner;
pub mod schema;
pub mod solver;
pub mod split;
pub mod target;
pub mod woe;

pub use binning::{
    fit_binning_map, woe_iv, Bin, BinMode, BinRange, BinningMap, BinningOutcome, FeatureBinning,
};
pub use config::*;
pub use engine::{EngineStats, FitOptions, IrlsEngine, ModelEngine, SignificanceTest, TrainingData};
pub use error::{PipelineError, PipelineStage};
pub use iv::{screen_features, select_by_threshold, FeatureStat, IvScreening};
pub use loader::*;
pub use metrics::{best_f1_threshold, evaluate, roc_auc, ConfusionMatrix, EvaluationResult};
pub use model::{CoefficientStat, FittedModel};
pub use outliers::{cap_outliers, OutlierReport};
pub use refine::{refine, round_p, worst_feature, RefinementOutcome, RefinementStep, RemovalReason};
pub use runner::*;
pub use schema::{FeatureKind, Schema};
pub use solver::MonotonicityConstraint;
pub use split::{split_dataset, split_indices, DataSplit, SplitIndices};
pub use target::*;
pub use woe::transform;
