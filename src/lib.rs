//! churnscore: customer churn scorecards
//!
//! A library for building WoE-encoded logistic churn models: outlier
//! capping, information value screening, supervised binning, WoE
//! transformation and significance-driven feature refinement, followed
//! by a held-out evaluation.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
