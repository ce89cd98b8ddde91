//! Fitted logistic model and scoring

use anyhow::Result;
use polars::prelude::DataFrame;
use serde::Serialize;

use super::engine::{numeric_column, sigmoid, SignificanceTest};

/// One model coefficient
#[derive(Debug, Clone, Serialize)]
pub struct CoefficientStat {
    pub feature: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    /// NaN when the coefficient is aliased or p-values were not requested
    pub p_value: f64,
    /// Column was a linear combination of earlier columns and was not estimated
    pub aliased: bool,
    /// Estimate times the standard deviation of the WoE column
    pub standardized: f64,
}

/// Result of a logistic fit
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub intercept: f64,
    pub intercept_std_error: f64,
    pub coefficients: Vec<CoefficientStat>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub iterations: usize,
    pub converged: bool,
    pub significance_test: SignificanceTest,
    pub train_auc: f64,
    pub validation_auc: Option<f64>,
    pub cv_auc: Option<f64>,
}

impl FittedModel {
    pub fn feature_names(&self) -> Vec<String> {
        self.coefficients.iter().map(|c| c.feature.clone()).collect()
    }

    pub fn coefficient(&self, feature: &str) -> Option<&CoefficientStat> {
        self.coefficients.iter().find(|c| c.feature == feature)
    }

    pub fn p_value(&self, feature: &str) -> Option<f64> {
        self.coefficient(feature).map(|c| c.p_value)
    }

    /// Event probability for every row of a WoE-encoded frame.
    /// Aliased coefficients contribute nothing.
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let mut eta = vec![self.intercept; df.height()];
        for coef in self.coefficients.iter().filter(|c| !c.aliased) {
            let values = numeric_column(df, &coef.feature)?;
            for (e, v) in eta.iter_mut().zip(values) {
                *e += coef.estimate * v;
            }
        }
        Ok(eta.into_iter().map(sigmoid).collect())
    }

    /// Non-aliased coefficients ordered by absolute standardized effect
    pub fn importance(&self) -> Vec<&CoefficientStat> {
        let mut ranked: Vec<&CoefficientStat> =
            self.coefficients.iter().filter(|c| !c.aliased).collect();
        ranked.sort_by(|a, b| {
            b.standardized
                .abs()
                .partial_cmp(&a.standardized.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        ranked
    }

    /// Share of null deviance explained (McFadden pseudo R-squared)
    pub fn pseudo_r2(&self) -> f64 {
        if self.null_deviance > 0.0 {
            1.0 - self.deviance / self.null_deviance
        } else {
            0.0
        }
    }
}
