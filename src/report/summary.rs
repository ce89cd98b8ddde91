//! Console tables summarizing a pipeline run

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{
    EvaluationResult, FittedModel, IvScreening, PipelineOutcome, RefinementStep,
};

/// Feature counts through each narrowing stage
#[derive(Debug, Default)]
pub struct RunSummary {
    pub input_rows: usize,
    pub modelled_rows: usize,
    pub schema_features: usize,
    pub iv_selected: usize,
    pub binned: usize,
    pub final_features: usize,
    pub warnings: usize,
    pub seconds: f64,
}

impl RunSummary {
    pub fn from_outcome(outcome: &PipelineOutcome) -> Self {
        Self {
            input_rows: outcome.input_rows,
            modelled_rows: outcome.input_rows - outcome.dropped_rows,
            schema_features: outcome.schema.len(),
            iv_selected: outcome.iv.selected.len(),
            binned: outcome.binning.len(),
            final_features: outcome.refinement.final_features.len(),
            warnings: outcome.warnings.len(),
            seconds: outcome.total_seconds(),
        }
    }

    pub fn display(&self) {
        print_section("📋", "RUN SUMMARY");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Input Rows"), Cell::new(self.input_rows)]);
        table.add_row(vec![Cell::new("🧹 Rows Modelled"), Cell::new(self.modelled_rows)]);
        table.add_row(vec![Cell::new("🔢 Candidate Features"), Cell::new(self.schema_features)]);
        table.add_row(vec![Cell::new("📊 Passed IV Screen"), Cell::new(self.iv_selected)]);
        table.add_row(vec![Cell::new("🪣 Binned"), Cell::new(self.binned)]);
        table.add_row(vec![
            Cell::new("✅ Final Features"),
            Cell::new(self.final_features)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("⚠️  Warnings"),
            Cell::new(self.warnings).fg(if self.warnings == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
        table.add_row(vec![
            Cell::new("⏱️  Elapsed"),
            Cell::new(format!("{:.2}s", self.seconds)),
        ]);

        print_indented(&table);
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn format_p(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else if p < 1e-4 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}

fn format_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "-".to_string())
}

/// IV ranking, strongest first; at most `limit` rows
pub fn display_iv_table(screening: &IvScreening, threshold: f64, limit: usize) {
    print_section("📊", "INFORMATION VALUE");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Feature").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("IV").add_attribute(Attribute::Bold),
        Cell::new("Gini").add_attribute(Attribute::Bold),
        Cell::new("Bins").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
    ]);

    for stat in screening.stats.iter().take(limit) {
        let (status, color) = if stat.selected {
            ("kept", Color::Green)
        } else if stat.note.is_some() {
            ("degenerate", Color::Red)
        } else {
            ("below threshold", Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&stat.feature),
            Cell::new(stat.kind),
            Cell::new(format!("{:.4}", stat.iv)).fg(if stat.iv > threshold {
                Color::Green
            } else {
                Color::White
            }),
            Cell::new(format!("{:.4}", stat.gini)),
            Cell::new(stat.bins),
            Cell::new(status).fg(color),
        ]);
    }

    print_indented(&table);
    if screening.stats.len() > limit {
        println!(
            "      {}",
            style(format!("... {} more feature(s)", screening.stats.len() - limit)).dim()
        );
    }
}

/// Coefficients of the final model
pub fn display_coefficient_table(model: &FittedModel) {
    print_section("📐", "FINAL MODEL COEFFICIENTS");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Term").add_attribute(Attribute::Bold),
        Cell::new("Estimate").add_attribute(Attribute::Bold),
        Cell::new("Std. Error").add_attribute(Attribute::Bold),
        Cell::new("z").add_attribute(Attribute::Bold),
        Cell::new(format!("p ({})", model.significance_test)).add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("(intercept)").add_attribute(Attribute::Italic),
        Cell::new(format!("{:.4}", model.intercept)),
        Cell::new(format!("{:.4}", model.intercept_std_error)),
        Cell::new(format!("{:.3}", model.intercept / model.intercept_std_error)),
        Cell::new("-"),
    ]);
    for c in &model.coefficients {
        table.add_row(vec![
            Cell::new(&c.feature),
            Cell::new(format!("{:.4}", c.estimate)),
            Cell::new(format!("{:.4}", c.std_error)),
            Cell::new(format!("{:.3}", c.z_value)),
            Cell::new(format_p(c.p_value)),
        ]);
    }

    print_indented(&table);
    println!(
        "      {}",
        style(format!(
            "deviance {:.2} (null {:.2}), pseudo R² {:.3}, {} iteration(s){}",
            model.deviance,
            model.null_deviance,
            model.pseudo_r2(),
            model.iterations,
            if model.converged { "" } else { ", not converged" }
        ))
        .dim()
    );
}

/// Features ranked by absolute standardized coefficient
pub fn display_importance_table(model: &FittedModel) {
    print_section("🏅", "FEATURE IMPORTANCE");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Feature").add_attribute(Attribute::Bold),
        Cell::new("Std. Coefficient").add_attribute(Attribute::Bold),
    ]);
    for (rank, c) in model.importance().iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&c.feature),
            Cell::new(format!("{:.4}", c.standardized)),
        ]);
    }

    print_indented(&table);
}

/// Features removed by the refinement loop, in order
pub fn display_refinement_steps(steps: &[RefinementStep]) {
    if steps.is_empty() {
        return;
    }
    print_section("✂️ ", "REFINEMENT STEPS");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Fit").add_attribute(Attribute::Bold),
        Cell::new("Features").add_attribute(Attribute::Bold),
        Cell::new("Removed").add_attribute(Attribute::Bold),
        Cell::new("p").add_attribute(Attribute::Bold),
        Cell::new("Reason").add_attribute(Attribute::Bold),
    ]);
    for step in steps {
        table.add_row(vec![
            Cell::new(step.iteration),
            Cell::new(step.feature_count),
            Cell::new(&step.removed).fg(Color::Red),
            Cell::new(format_p(step.p_value)),
            Cell::new(step.reason),
        ]);
    }

    print_indented(&table);
}

/// Test-set metrics and the confusion matrix
pub fn display_evaluation(result: &EvaluationResult) {
    print_section("🎯", "EVALUATION");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    let auc_color = if result.test_auc >= 0.8 {
        Color::Green
    } else if result.test_auc >= 0.7 {
        Color::Yellow
    } else {
        Color::Red
    };
    table.add_row(vec![
        Cell::new("Test AUC"),
        Cell::new(format!("{:.4}", result.test_auc))
            .fg(auc_color)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Test Gini"), Cell::new(format!("{:.4}", result.gini))]);
    table.add_row(vec![Cell::new("Train AUC"), Cell::new(format!("{:.4}", result.train_auc))]);
    table.add_row(vec![Cell::new("Validation AUC"), Cell::new(format_opt(result.validation_auc))]);
    table.add_row(vec![Cell::new("CV AUC"), Cell::new(format_opt(result.cv_auc))]);
    table.add_row(vec![
        Cell::new("Best F1 Threshold"),
        Cell::new(format!("{:.4}", result.threshold)),
    ]);
    table.add_row(vec![Cell::new("F1"), Cell::new(format!("{:.4}", result.f1))]);
    table.add_row(vec![Cell::new("Precision"), Cell::new(format!("{:.4}", result.precision))]);
    table.add_row(vec![Cell::new("Recall"), Cell::new(format!("{:.4}", result.recall))]);
    table.add_row(vec![Cell::new("Accuracy"), Cell::new(format!("{:.4}", result.accuracy))]);
    print_indented(&table);

    println!();
    let cm = &result.confusion;
    let mut matrix = Table::new();
    matrix.load_preset(UTF8_FULL_CONDENSED);
    matrix.set_header(vec![
        Cell::new(""),
        Cell::new("Predicted churn").add_attribute(Attribute::Bold),
        Cell::new("Predicted stay").add_attribute(Attribute::Bold),
    ]);
    matrix.add_row(vec![
        Cell::new("Actual churn").add_attribute(Attribute::Bold),
        Cell::new(cm.true_positives).fg(Color::Green),
        Cell::new(cm.false_negatives).fg(Color::Red),
    ]);
    matrix.add_row(vec![
        Cell::new("Actual stay").add_attribute(Attribute::Bold),
        Cell::new(cm.false_positives).fg(Color::Red),
        Cell::new(cm.true_negatives).fg(Color::Green),
    ]);
    print_indented(&matrix);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_p() {
        assert_eq!(format_p(f64::NAN), "NA");
        assert_eq!(format_p(0.04321), "0.0432");
        assert_eq!(format_p(0.00001234), "1.23e-5");
    }
}
