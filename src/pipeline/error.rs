//! Error kinds raised by the scoring pipeline
//!
//! Fatal kinds abort a run through `anyhow` with the failing stage attached
//! as context. Recoverable kinds never leave the stage that raised them; they
//! are collected as warnings on the run outcome instead.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Pipeline stage, used to label timings and fatal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineStage {
    Clean,
    Schema,
    OutlierCapping,
    Split,
    IvScreening,
    Binning,
    WoeTransform,
    Refinement,
    Evaluation,
}

impl PipelineStage {
    /// All stages in execution order
    pub const ALL: [PipelineStage; 9] = [
        PipelineStage::Clean,
        PipelineStage::Schema,
        PipelineStage::OutlierCapping,
        PipelineStage::Split,
        PipelineStage::IvScreening,
        PipelineStage::Binning,
        PipelineStage::WoeTransform,
        PipelineStage::Refinement,
        PipelineStage::Evaluation,
    ];

    /// One-based step number shown in terminal headers
    pub fn step_number(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|p| p as u8 + 1)
            .unwrap_or(0)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Clean => "Load & Clean",
            PipelineStage::Schema => "Schema Inference",
            PipelineStage::OutlierCapping => "Outlier Capping",
            PipelineStage::Split => "Train/Test Split",
            PipelineStage::IvScreening => "Information Value Screening",
            PipelineStage::Binning => "Supervised Binning",
            PipelineStage::WoeTransform => "WoE Transform",
            PipelineStage::Refinement => "Iterative Model Refinement",
            PipelineStage::Evaluation => "Evaluation",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by pipeline stages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Target column missing or a referenced feature absent from the dataset
    #[error("schema error: {0}")]
    Schema(String),

    /// Feature has zero spread; capping or binning is skipped for it
    #[error("feature '{feature}' is degenerate: {reason}")]
    DegenerateFeature { feature: String, reason: String },

    /// Feature cannot be split into enough bins that satisfy the size constraint
    #[error("feature '{feature}' cannot be binned: {reason}")]
    BinningConstraint { feature: String, reason: String },

    /// Categorical values seen at transform time but never during binning
    #[error(
        "feature '{feature}' has {count} row(s) with unseen categories {values:?}; \
         assigned to bin '{fallback_bin}'"
    )]
    UnseenCategory {
        feature: String,
        values: Vec<String>,
        count: usize,
        fallback_bin: String,
    },

    /// A fitted coefficient has no defined p-value (aliased or non-finite)
    #[error("p-value for '{feature}' is undefined: {reason}")]
    UndefinedSignificance { feature: String, reason: String },

    /// Refinement loop hit its iteration cap or would remove the last feature
    #[error("refinement aborted after {iterations} fit(s): {reason}")]
    RefinementNonTermination { iterations: usize, reason: String },

    /// A data partition is empty or lacks one of the classes
    #[error("{partition} partition is unusable: {reason}")]
    EmptyPartition { partition: String, reason: String },
}

impl PipelineError {
    /// Whether the pipeline can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::DegenerateFeature { .. }
                | PipelineError::BinningConstraint { .. }
                | PipelineError::UnseenCategory { .. }
                | PipelineError::UndefinedSignificance { .. }
        )
    }

    /// Feature the error refers to, if any
    pub fn feature(&self) -> Option<&str> {
        match self {
            PipelineError::DegenerateFeature { feature, .. }
            | PipelineError::BinningConstraint { feature, .. }
            | PipelineError::UnseenCategory { feature, .. }
            | PipelineError::UndefinedSignificance { feature, .. } => Some(feature),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        let degenerate = PipelineError::DegenerateFeature {
            feature: "age".to_string(),
            reason: "IQR is zero".to_string(),
        };
        assert!(degenerate.is_recoverable());
        assert_eq!(degenerate.feature(), Some("age"));

        let schema = PipelineError::Schema("target 'y' not found".to_string());
        assert!(!schema.is_recoverable());
        assert_eq!(schema.feature(), None);

        let abort = PipelineError::RefinementNonTermination {
            iterations: 50,
            reason: "iteration cap reached".to_string(),
        };
        assert!(!abort.is_recoverable());
    }

    #[test]
    fn test_stage_numbers_follow_execution_order() {
        assert_eq!(PipelineStage::Clean.step_number(), 1);
        assert_eq!(PipelineStage::Split.step_number(), 4);
        assert_eq!(PipelineStage::Evaluation.step_number(), 9);
    }

    #[test]
    fn test_error_messages_name_the_feature() {
        let err = PipelineError::UnseenCategory {
            feature: "job".to_string(),
            values: vec!["astronaut".to_string()],
            count: 2,
            fallback_bin: "{student}".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("job"));
        assert!(msg.contains("astronaut"));
        assert_eq!(PipelineStage::IvScreening.to_string(), "Information Value Screening");
    }
}
