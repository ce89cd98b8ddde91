//! Replace raw feature values by the WoE of their bin

use anyhow::Result;
use polars::prelude::*;

use super::binning::{extract_feature_values, BinningMap, FeatureValues};
use super::error::PipelineError;

/// Transform every binned feature of `df` to its WoE encoding.
///
/// The output holds one Float64 column per feature in the binning map, in
/// map order, followed by the target column unchanged. Categories unseen
/// during fitting take the WoE of the feature's fallback bin and produce one
/// warning per feature.
pub fn transform(
    map: &BinningMap,
    df: &DataFrame,
    target: &str,
) -> Result<(DataFrame, Vec<PipelineError>)> {
    let target_col = df
        .column(target)
        .map_err(|_| PipelineError::Schema(format!("target column '{}' not found", target)))?
        .clone();

    let mut columns: Vec<Column> = Vec::with_capacity(map.len() + 1);
    let mut warnings = Vec::new();

    for binning in &map.features {
        let values = extract_feature_values(df, &binning.feature, binning.kind)?;

        let encoded: Vec<f64> = match values {
            FeatureValues::Numeric(values) => {
                values.iter().map(|v| binning.woe_for_numeric(*v)).collect()
            }
            FeatureValues::Categorical(values) => {
                let mut unseen: Vec<String> = Vec::new();
                let mut unseen_count = 0;
                let fallback = binning.fallback_bin();

                let encoded = values
                    .iter()
                    .map(|v| match binning.woe_for_category(v.as_deref()) {
                        Some(woe) => woe,
                        None => {
                            unseen_count += 1;
                            if let Some(cat) = v {
                                if !unseen.contains(cat) {
                                    unseen.push(cat.clone());
                                }
                            }
                            fallback.woe
                        }
                    })
                    .collect();

                if unseen_count > 0 {
                    unseen.sort();
                    warnings.push(PipelineError::UnseenCategory {
                        feature: binning.feature.clone(),
                        values: unseen,
                        count: unseen_count,
                        fallback_bin: fallback.label(),
                    });
                }
                encoded
            }
        };

        columns.push(Column::new(binning.feature.as_str().into(), encoded));
    }

    columns.push(target_col);
    Ok((DataFrame::new(columns)?, warnings))
}
