//! Pipeline configuration with defaults matching the churn scorecard setup

use serde::Serialize;

use super::engine::FitOptions;
use super::solver::MonotonicityConstraint;

/// Default significance level for pruning and for ChiMerge stopping
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Merge strategy used by the supervised binner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BinningMethod {
    /// Bottom-up chi-square merging followed by a monotonic pass
    #[default]
    ChiMerge,
    /// MIP search for the IV-maximising monotonic partition
    Solver,
}

impl std::fmt::Display for BinningMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinningMethod::ChiMerge => write!(f, "chimerge"),
            BinningMethod::Solver => write!(f, "solver"),
        }
    }
}

impl std::str::FromStr for BinningMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chimerge" | "chi" => Ok(BinningMethod::ChiMerge),
            "solver" | "mip" => Ok(BinningMethod::Solver),
            _ => Err(format!(
                "Unknown binning method: '{}'. Use 'chimerge' or 'solver'.",
                s
            )),
        }
    }
}

/// Target column and the raw labels that map to 1 and 0
#[derive(Debug, Clone, Serialize)]
pub struct TargetSpec {
    pub column: String,
    pub event_value: String,
    pub non_event_value: String,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            column: "y".to_string(),
            event_value: "yes".to_string(),
            non_event_value: "no".to_string(),
        }
    }
}

/// Partition fractions and seed
#[derive(Debug, Clone, Serialize)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub validation_fraction: f64,
    pub seed: u64,
    pub stratify: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            validation_fraction: 0.0,
            seed: 1234,
            stratify: true,
        }
    }
}

/// Constraints for the supervised binner
#[derive(Debug, Clone, Serialize)]
pub struct BinningConfig {
    pub method: BinningMethod,
    pub max_bins: usize,
    pub min_bins: usize,
    /// Minimum bin size as a fraction of the rows being binned
    pub min_bin_fraction: f64,
    /// Number of quantile prebins before merging
    pub prebins: usize,
    /// Significance level for the ChiMerge stopping rule
    pub chi_alpha: f64,
    /// Family-wise significance level for screening splits, shared across
    /// the candidate cut points of a feature
    pub screening_alpha: f64,
    pub monotonicity: MonotonicityConstraint,
    /// Additive smoothing applied to bin counts before computing WoE
    pub smoothing: f64,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            method: BinningMethod::ChiMerge,
            max_bins: 10,
            min_bins: 2,
            min_bin_fraction: 0.05,
            prebins: 20,
            chi_alpha: DEFAULT_ALPHA,
            screening_alpha: 0.001,
            monotonicity: MonotonicityConstraint::Auto,
            smoothing: 0.5,
        }
    }
}

impl BinningConfig {
    /// Minimum number of rows a bin must hold for a sample of `n` rows
    pub fn min_bin_count(&self, n: usize) -> f64 {
        (self.min_bin_fraction * n as f64).ceil().max(1.0)
    }
}

/// Termination rules for the significance-pruning loop
#[derive(Debug, Clone, Serialize)]
pub struct RefinementConfig {
    pub significance: f64,
    /// Decimal places p-values are rounded to before comparison
    pub round_decimals: u32,
    /// Maximum number of model fits before the loop aborts
    pub max_iterations: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            significance: DEFAULT_ALPHA,
            round_decimals: 3,
            max_iterations: 50,
        }
    }
}

/// Complete configuration for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub target: TargetSpec,
    /// Columns removed before any analysis; absent names are ignored
    pub drop_columns: Vec<String>,
    pub cap_outliers: bool,
    /// Features with IV at or below this value are discarded
    pub iv_threshold: f64,
    pub split: SplitConfig,
    pub binning: BinningConfig,
    pub refinement: RefinementConfig,
    pub fit: FitOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: TargetSpec::default(),
            drop_columns: Vec::new(),
            cap_outliers: true,
            iv_threshold: 0.02,
            split: SplitConfig::default(),
            binning: BinningConfig::default(),
            refinement: RefinementConfig::default(),
            fit: FitOptions::default(),
        }
    }
}
