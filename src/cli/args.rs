//! Command-line argument definitions using clap

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::pipeline::{
    BinningConfig, BinningMethod, FitOptions, MonotonicityConstraint, PipelineConfig,
    RefinementConfig, SignificanceTest, SplitConfig, TargetSpec,
};

/// churnscore - Build a WoE logistic churn scorecard from a tabular dataset
#[derive(Parser, Debug)]
#[command(name = "churnscore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Target column name
    #[arg(short, long, default_value = "y")]
    pub target: String,

    /// Value in the target column that represents churn (maps to 1)
    #[arg(long, default_value = "yes")]
    pub event_value: String,

    /// Value in the target column that represents retention (maps to 0)
    #[arg(long, default_value = "no")]
    pub non_event_value: String,

    /// Directory for the model report, coefficients and binning map.
    /// Defaults to '<input stem>_churnscore' next to the input file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// CSV field separator
    #[arg(long, default_value = ",")]
    pub separator: char,

    /// Columns to drop before processing (comma-separated).
    /// Names absent from the dataset are ignored.
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Skip Tukey outlier capping of numeric features
    #[arg(long, default_value = "false")]
    pub no_capping: bool,

    /// IV threshold - keep features with IV strictly above this value
    #[arg(long, default_value = "0.02")]
    pub iv_threshold: f64,

    /// Binning method: "chimerge" (default) or "solver" (MIP optimal binning)
    #[arg(long, default_value = "chimerge")]
    pub binning_method: String,

    /// Maximum number of bins per feature
    #[arg(long, default_value = "10")]
    pub max_bins: usize,

    /// Minimum number of bins per feature
    #[arg(long, default_value = "2")]
    pub min_bins: usize,

    /// Minimum bin size as percentage of training rows (0-100)
    #[arg(long, default_value = "5.0", value_parser = validate_percentage)]
    pub min_bin_pct: f64,

    /// Number of equal-frequency prebins before merging
    #[arg(long, default_value = "20")]
    pub prebins: usize,

    /// Significance level for the ChiMerge stopping rule
    #[arg(long, default_value = "0.05", value_parser = validate_probability)]
    pub chi_alpha: f64,

    /// Family-wise significance level for IV screening splits
    #[arg(long, default_value = "0.001", value_parser = validate_probability)]
    pub screening_alpha: f64,

    /// Monotonicity of WoE across numeric bins.
    /// Options: "auto" (default), "ascending", "descending", "none"
    #[arg(long, default_value = "auto")]
    pub monotonicity: String,

    /// Significance level for removing features during refinement
    #[arg(long, default_value = "0.05", value_parser = validate_probability)]
    pub significance: f64,

    /// Per-coefficient significance test: "lrt" (default) or "wald"
    #[arg(long, default_value = "lrt")]
    pub significance_test: String,

    /// Maximum model fits during refinement before aborting
    #[arg(long, default_value = "50")]
    pub max_iterations: usize,

    /// Fraction of rows held out for testing
    #[arg(long, default_value = "0.3", value_parser = validate_probability)]
    pub test_fraction: f64,

    /// Fraction of rows held out for validation (0 disables the validation partition)
    #[arg(long, default_value = "0.0", value_parser = validate_probability)]
    pub validation_fraction: f64,

    /// Seed for the split and cross-validation folds
    #[arg(long, default_value = "1234")]
    pub seed: u64,

    /// Cross-validation folds for the training AUC (below 2 disables CV)
    #[arg(long, default_value = "5")]
    pub nfolds: usize,

    /// Weight rows so churners and non-churners carry equal total weight
    #[arg(long, default_value = "false")]
    pub balance_classes: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Output directory, derived from the input when not given
    pub fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let parent = self.input.parent().unwrap_or_else(|| Path::new("."));
            let stem = self
                .input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_churnscore", stem))
        })
    }

    /// CSV separator as a single byte
    pub fn separator_byte(&self) -> Result<u8> {
        u8::try_from(self.separator)
            .ok()
            .filter(|b| b.is_ascii())
            .with_context(|| {
                format!("Separator '{}' must be a single ASCII character", self.separator)
            })
    }

    /// Assemble the pipeline configuration from the parsed flags
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        if self.min_bins == 0 || self.min_bins > self.max_bins {
            anyhow::bail!(
                "min_bins must be between 1 and max_bins ({}), got {}",
                self.max_bins,
                self.min_bins
            );
        }
        if self.test_fraction + self.validation_fraction >= 1.0 {
            anyhow::bail!(
                "test_fraction + validation_fraction must be below 1.0, got {}",
                self.test_fraction + self.validation_fraction
            );
        }

        for (flag, alpha) in [
            ("chi-alpha", self.chi_alpha),
            ("screening-alpha", self.screening_alpha),
            ("significance", self.significance),
        ] {
            if !(alpha > 0.0 && alpha < 1.0) {
                anyhow::bail!("--{} must be strictly between 0 and 1, got {}", flag, alpha);
            }
        }

        let method: BinningMethod = self
            .binning_method
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let monotonicity: MonotonicityConstraint =
            self.monotonicity.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let significance_test: SignificanceTest =
            self.significance_test.parse().map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(PipelineConfig {
            target: TargetSpec {
                column: self.target.clone(),
                event_value: self.event_value.clone(),
                non_event_value: self.non_event_value.clone(),
            },
            drop_columns: self.drop_columns.clone(),
            cap_outliers: !self.no_capping,
            iv_threshold: self.iv_threshold,
            split: SplitConfig {
                test_fraction: self.test_fraction,
                validation_fraction: self.validation_fraction,
                seed: self.seed,
                ..SplitConfig::default()
            },
            binning: BinningConfig {
                method,
                max_bins: self.max_bins,
                min_bins: self.min_bins,
                min_bin_fraction: self.min_bin_pct / 100.0,
                prebins: self.prebins,
                chi_alpha: self.chi_alpha,
                screening_alpha: self.screening_alpha,
                monotonicity,
                ..BinningConfig::default()
            },
            refinement: RefinementConfig {
                significance: self.significance,
                max_iterations: self.max_iterations,
                ..RefinementConfig::default()
            },
            fit: FitOptions {
                nfolds: self.nfolds,
                seed: self.seed,
                balance_classes: self.balance_classes,
                significance_test,
                ..FitOptions::default()
            },
        })
    }
}

fn validate_percentage(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=100.0).contains(&value) {
        Err(format!("value must be between 0.0 and 100.0, got {}", value))
    } else {
        Ok(value)
    }
}

fn validate_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}
