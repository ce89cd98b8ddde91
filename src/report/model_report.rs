//! JSON and CSV exports of a pipeline run
//!
//! Produces a structured model report with metadata, per-feature
//! screening results, the final coefficients and the evaluation, plus a
//! coefficient CSV and the fitted binning map.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    BinningMap, CoefficientStat, EngineStats, EvaluationResult, FeatureKind, OutlierReport,
    PartitionRows, PipelineConfig, PipelineOutcome, RefinementStep, StageTiming, StageWarning,
};

/// Metadata about the run
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub churnscore_version: String,
    pub input_file: String,
    pub engine: String,
    pub engine_stats: Option<EngineStats>,
}

/// Fate of one candidate feature
#[derive(Debug, Clone, Serialize)]
pub struct FeatureEntry {
    pub feature: String,
    pub kind: FeatureKind,
    pub iv: f64,
    pub gini: f64,
    /// "retained", "below_iv_threshold", "degenerate", "binning_rejected" or "refinement_removed"
    pub status: String,
    pub detail: Option<String>,
}

/// Final model summary
#[derive(Debug, Clone, Serialize)]
pub struct ModelSection {
    pub intercept: f64,
    pub intercept_std_error: f64,
    pub coefficients: Vec<CoefficientStat>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub pseudo_r2: f64,
    pub iterations: usize,
    pub converged: bool,
    pub significance_test: String,
}

/// Complete model report
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub metadata: ReportMetadata,
    pub config: PipelineConfig,
    pub partitions: PartitionRows,
    pub dropped_columns: Vec<String>,
    pub dropped_rows: usize,
    pub unsupported_columns: Vec<String>,
    pub outliers: Vec<OutlierReport>,
    pub features: Vec<FeatureEntry>,
    pub refinement_steps: Vec<RefinementStep>,
    pub model: ModelSection,
    pub evaluation: EvaluationResult,
    pub warnings: Vec<StageWarning>,
    pub timings: Vec<StageTiming>,
}

impl ModelReport {
    pub fn build(
        outcome: &PipelineOutcome,
        config: &PipelineConfig,
        input_file: &str,
        engine: &str,
        engine_stats: Option<EngineStats>,
    ) -> Self {
        let final_features = &outcome.refinement.final_features;
        let features = outcome
            .iv
            .stats
            .iter()
            .map(|stat| {
                let removed = outcome
                    .refinement
                    .steps
                    .iter()
                    .find(|s| s.removed == stat.feature);
                let rejected = outcome
                    .warnings
                    .iter()
                    .find(|w| {
                        w.error.feature() == Some(stat.feature.as_str())
                            && outcome.excluded_features.contains(&stat.feature)
                    });

                let (status, detail) = if final_features.contains(&stat.feature) {
                    ("retained", None)
                } else if let Some(step) = removed {
                    ("refinement_removed", Some(format!("{} (p = {})", step.reason, step.p_value)))
                } else if outcome.excluded_features.contains(&stat.feature) {
                    ("binning_rejected", rejected.map(|w| w.message.clone()))
                } else if stat.note.is_some() {
                    ("degenerate", stat.note.clone())
                } else {
                    ("below_iv_threshold", None)
                };

                FeatureEntry {
                    feature: stat.feature.clone(),
                    kind: stat.kind,
                    iv: stat.iv,
                    gini: stat.gini,
                    status: status.to_string(),
                    detail,
                }
            })
            .collect();

        let model = &outcome.refinement.model;
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                churnscore_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: input_file.to_string(),
                engine: engine.to_string(),
                engine_stats,
            },
            config: config.clone(),
            partitions: outcome.partitions,
            dropped_columns: outcome.dropped_columns.clone(),
            dropped_rows: outcome.dropped_rows,
            unsupported_columns: outcome.unsupported_columns.clone(),
            outliers: outcome.outlier_reports.clone(),
            features,
            refinement_steps: outcome.refinement.steps.clone(),
            model: ModelSection {
                intercept: model.intercept,
                intercept_std_error: model.intercept_std_error,
                coefficients: model.coefficients.clone(),
                deviance: model.deviance,
                null_deviance: model.null_deviance,
                pseudo_r2: model.pseudo_r2(),
                iterations: model.iterations,
                converged: model.converged,
                significance_test: model.significance_test.to_string(),
            },
            evaluation: outcome.evaluation.clone(),
            warnings: outcome.warnings.clone(),
            timings: outcome.timings.clone(),
        }
    }
}

/// Paths of the files written by `export_all`
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub report: PathBuf,
    pub coefficients: PathBuf,
    pub binning_map: PathBuf,
    pub archive: PathBuf,
}

/// Write the model report as pretty JSON
pub fn export_model_report(report: &ModelReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize model report to JSON")?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write model report to {}", output_path.display()))?;
    Ok(())
}

/// Write the binning map as pretty JSON
pub fn export_binning_map(map: &BinningMap, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(map)
        .context("Failed to serialize binning map to JSON")?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write binning map to {}", output_path.display()))?;
    Ok(())
}

/// Write one row per model term
pub fn export_coefficients_csv(report: &ModelReport, output_path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create CSV file: {}", output_path.display()))?;

    writeln!(file, "term,estimate,std_error,z_value,p_value,aliased,standardized,iv")?;
    writeln!(
        file,
        "(intercept),{},{},{},,false,,",
        report.model.intercept,
        report.model.intercept_std_error,
        report.model.intercept / report.model.intercept_std_error
    )?;

    for c in &report.model.coefficients {
        let iv = report
            .features
            .iter()
            .find(|f| f.feature == c.feature)
            .map(|f| format!("{:.6}", f.iv))
            .unwrap_or_default();
        writeln!(
            file,
            "{},{},{},{},{},{},{},{}",
            escape_csv_field(&c.feature),
            c.estimate,
            c.std_error,
            c.z_value,
            if c.p_value.is_nan() { String::new() } else { c.p_value.to_string() },
            c.aliased,
            c.standardized,
            iv
        )?;
    }

    Ok(())
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Bundle report files into a zip archive; the originals are kept
pub fn package_reports(files: &[&Path], zip_path: &Path) -> Result<()> {
    use std::io::{Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let zip_file = std::fs::File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for path in files {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid report file name: {}", path.display()))?;
        zip.start_file(filename, options)
            .with_context(|| format!("Failed to add {} to zip", filename))?;
        let mut content = Vec::new();
        std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize zip file")?;
    Ok(())
}

/// Write every report into `output_dir`, creating it if needed
pub fn export_all(
    report: &ModelReport,
    map: &BinningMap,
    output_dir: &Path,
) -> Result<ExportedFiles> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let files = ExportedFiles {
        report: output_dir.join("model_report.json"),
        coefficients: output_dir.join("coefficients.csv"),
        binning_map: output_dir.join("binning_map.json"),
        archive: output_dir.join("churnscore_reports.zip"),
    };

    export_model_report(report, &files.report)?;
    export_coefficients_csv(report, &files.coefficients)?;
    export_binning_map(map, &files.binning_map)?;
    package_reports(
        &[&files.report, &files.coefficients, &files.binning_map],
        &files.archive,
    )?;

    Ok(files)
}
