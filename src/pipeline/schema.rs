//! Typed feature schema, inferred once after cleaning

use std::collections::BTreeMap;

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::error::PipelineError;

/// How a feature is binned and transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Numeric => write!(f, "numeric"),
            FeatureKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Feature name to kind, in dataset column order
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub target: String,
    features: Vec<(String, FeatureKind)>,
}

impl Schema {
    /// Infer feature kinds from column dtypes.
    ///
    /// Columns whose dtype is neither numeric nor text-like are not features;
    /// they are returned alongside the schema so the caller can report them.
    pub fn infer(df: &DataFrame, target: &str) -> Result<(Self, Vec<String>)> {
        if df.column(target).is_err() {
            return Err(
                PipelineError::Schema(format!("target column '{}' not found", target)).into(),
            );
        }

        let mut features = Vec::new();
        let mut unsupported = Vec::new();

        for col in df.get_columns() {
            let name = col.name().as_str();
            if name == target {
                continue;
            }
            match col.dtype() {
                dt if dt.is_primitive_numeric() => {
                    features.push((name.to_string(), FeatureKind::Numeric));
                }
                DataType::String | DataType::Categorical(_, _) | DataType::Boolean => {
                    features.push((name.to_string(), FeatureKind::Categorical));
                }
                _ => unsupported.push(name.to_string()),
            }
        }

        Ok((
            Self {
                target: target.to_string(),
                features,
            },
            unsupported,
        ))
    }

    /// Build a schema from explicit (name, kind) pairs
    pub fn from_features(target: &str, features: Vec<(String, FeatureKind)>) -> Self {
        Self {
            target: target.to_string(),
            features,
        }
    }

    pub fn kind(&self, feature: &str) -> Option<FeatureKind> {
        self.features
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, kind)| *kind)
    }

    /// Kind of a feature, or a schema error if it is unknown
    pub fn require(&self, feature: &str) -> Result<FeatureKind> {
        self.kind(feature).ok_or_else(|| {
            PipelineError::Schema(format!("feature '{}' is not in the schema", feature)).into()
        })
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, FeatureKind)> {
        self.features.iter().map(|(n, k)| (n.as_str(), *k))
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn numeric_features(&self) -> Vec<String> {
        self.of_kind(FeatureKind::Numeric)
    }

    pub fn categorical_features(&self) -> Vec<String> {
        self.of_kind(FeatureKind::Categorical)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Verify every schema feature and the target exist in `df`
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        let present: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        if !present.contains(&self.target.as_str()) {
            return Err(PipelineError::Schema(format!(
                "target column '{}' not found",
                self.target
            ))
            .into());
        }
        for (name, _) in &self.features {
            if !present.contains(&name.as_str()) {
                return Err(
                    PipelineError::Schema(format!("feature '{}' missing from dataset", name))
                        .into(),
                );
            }
        }
        Ok(())
    }

    /// Count of features per kind, for reporting
    pub fn kind_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, kind) in &self.features {
            *counts.entry(kind.to_string()).or_insert(0) += 1;
        }
        counts
    }

    fn of_kind(&self, kind: FeatureKind) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(n, _)| n.clone())
            .collect()
    }
}
