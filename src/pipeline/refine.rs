//! Backward elimination on coefficient p-values
//!
//! Starting from every binned feature, the model is refit after removing the
//! worst feature until all remaining p-values are below the significance
//! level. Undefined p-values (aliased or non-estimable coefficients) are
//! always worst. The loop is bounded by a fit budget and refuses to remove
//! the last feature.

use anyhow::Result;
use serde::Serialize;

use super::config::RefinementConfig;
use super::engine::{FitOptions, ModelEngine, TrainingData};
use super::error::PipelineError;
use super::model::FittedModel;

/// Why a feature was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalReason {
    /// p-value was NaN or the coefficient was aliased
    Undefined,
    /// Rounded p-value at or above the significance level
    Insignificant,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalReason::Undefined => write!(f, "undefined p-value"),
            RemovalReason::Insignificant => write!(f, "not significant"),
        }
    }
}

/// One elimination step
#[derive(Debug, Clone, Serialize)]
pub struct RefinementStep {
    pub iteration: usize,
    /// Features in the model that was inspected
    pub feature_count: usize,
    pub removed: String,
    pub p_value: f64,
    pub rounded_p: f64,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub final_features: Vec<String>,
    pub model: FittedModel,
    pub steps: Vec<RefinementStep>,
    pub warnings: Vec<PipelineError>,
}

/// Round to `decimals` places
pub fn round_p(p: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (p * scale).round() / scale
}

/// Feature to remove from `model`, if any
pub fn worst_feature(model: &FittedModel, config: &RefinementConfig) -> Option<RefinementStep> {
    let undefined = model
        .coefficients
        .iter()
        .filter(|c| c.aliased || c.p_value.is_nan())
        .min_by(|a, b| a.feature.cmp(&b.feature));

    if let Some(coef) = undefined {
        return Some(RefinementStep {
            iteration: 0,
            feature_count: model.coefficients.len(),
            removed: coef.feature.clone(),
            p_value: coef.p_value,
            rounded_p: f64::NAN,
            reason: RemovalReason::Undefined,
        });
    }

    model
        .coefficients
        .iter()
        .map(|c| (c, round_p(c.p_value, config.round_decimals)))
        .filter(|(_, rounded)| *rounded >= config.significance)
        .max_by(|(a, ra), (b, rb)| {
            ra.partial_cmp(rb)
                .unwrap_or(std::cmp::Ordering::Equal)
                // reversed name order: the lexically first feature is the maximum
                .then_with(|| b.feature.cmp(&a.feature))
        })
        .map(|(coef, rounded)| RefinementStep {
            iteration: 0,
            feature_count: model.coefficients.len(),
            removed: coef.feature.clone(),
            p_value: coef.p_value,
            rounded_p: rounded,
            reason: RemovalReason::Insignificant,
        })
}

/// Refit until every remaining feature is significant
pub fn refine<E: ModelEngine + ?Sized>(
    engine: &E,
    data: &TrainingData<'_>,
    initial: &[String],
    config: &RefinementConfig,
    options: &FitOptions,
) -> Result<RefinementOutcome> {
    if initial.is_empty() {
        return Err(PipelineError::RefinementNonTermination {
            iterations: 0,
            reason: "no features left to model".to_string(),
        }
        .into());
    }

    let options = FitOptions {
        compute_p_values: true,
        ..options.clone()
    };

    let mut features = initial.to_vec();
    let mut model = engine.fit_logistic(data, &features, &options)?;
    let mut fits = 1;
    let mut steps = Vec::new();
    let mut warnings = Vec::new();

    while let Some(mut step) = worst_feature(&model, config) {
        if features.len() == 1 {
            return Err(PipelineError::RefinementNonTermination {
                iterations: fits,
                reason: format!(
                    "removing '{}' would leave no features (p = {:.4})",
                    step.removed, step.p_value
                ),
            }
            .into());
        }
        if fits >= config.max_iterations {
            return Err(PipelineError::RefinementNonTermination {
                iterations: fits,
                reason: format!("fit budget of {} exhausted", config.max_iterations),
            }
            .into());
        }

        if step.reason == RemovalReason::Undefined {
            warnings.push(PipelineError::UndefinedSignificance {
                feature: step.removed.clone(),
                reason: if model.coefficient(&step.removed).is_some_and(|c| c.aliased) {
                    "coefficient is aliased with other features".to_string()
                } else {
                    "p-value is not defined".to_string()
                },
            });
        }

        step.iteration = fits;
        features.retain(|f| *f != step.removed);
        steps.push(step);

        model = engine.fit_logistic(data, &features, &options)?;
        fits += 1;
    }

    Ok(RefinementOutcome {
        final_features: features,
        model,
        steps,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::engine::SignificanceTest;
    use crate::pipeline::model::CoefficientStat;

    fn model_with(p_values: &[(&str, f64)]) -> FittedModel {
        FittedModel {
            intercept: 0.0,
            intercept_std_error: 0.1,
            coefficients: p_values
                .iter()
                .map(|(name, p)| CoefficientStat {
                    feature: name.to_string(),
                    estimate: 1.0,
                    std_error: 0.5,
                    z_value: 2.0,
                    p_value: *p,
                    aliased: false,
                    standardized: 0.5,
                })
                .collect(),
            deviance: 1.0,
            null_deviance: 2.0,
            iterations: 3,
            converged: true,
            significance_test: SignificanceTest::LikelihoodRatio,
            train_auc: 0.7,
            validation_auc: None,
            cv_auc: None,
        }
    }

    #[test]
    fn test_round_p() {
        assert_eq!(round_p(0.04951, 3), 0.05);
        assert_eq!(round_p(0.0494, 3), 0.049);
    }

    #[test]
    fn test_nan_is_always_worst() {
        let m = model_with(&[("a", 0.9), ("b", f64::NAN), ("c", 0.2)]);
        let step = worst_feature(&m, &RefinementConfig::default()).unwrap();
        assert_eq!(step.removed, "b");
        assert_eq!(step.reason, RemovalReason::Undefined);
    }

    #[test]
    fn test_ties_break_lexically() {
        let m = model_with(&[("zeta", 0.3001), ("alpha", 0.2999), ("mid", 0.01)]);
        let step = worst_feature(&m, &RefinementConfig::default()).unwrap();
        assert_eq!(step.removed, "alpha");
        assert_eq!(step.rounded_p, 0.3);
    }

    #[test]
    fn test_rounding_decides_boundary() {
        // 0.0496 rounds to 0.050, which is not below the level
        let m = model_with(&[("a", 0.0496), ("b", 0.001)]);
        assert_eq!(worst_feature(&m, &RefinementConfig::default()).unwrap().removed, "a");

        let m = model_with(&[("a", 0.0494), ("b", 0.001)]);
        assert!(worst_feature(&m, &RefinementConfig::default()).is_none());
    }
}
