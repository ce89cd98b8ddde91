//! churnscore: Churn Scorecard CLI Tool
//!
//! Loads a customer dataset, runs the WoE/logistic scoring pipeline and
//! writes the model report next to the input.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::style;

use churnscore::cli::{confirm_run, Cli};
use churnscore::pipeline::{
    load_dataset, ChurnPipeline, IrlsEngine, LoadOptions, ModelEngine, PipelineError, PipelineStage,
    StageObserver,
};
use churnscore::report::{
    display_coefficient_table, display_evaluation, display_importance_table, display_iv_table,
    display_refinement_steps, export_all, ModelReport, RunSummary,
};
use churnscore::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config, print_info,
    print_step_header, print_success, print_warning,
};

/// Prints a header and a timed summary line for each stage
struct ConsoleObserver;

impl StageObserver for ConsoleObserver {
    fn stage_started(&mut self, stage: PipelineStage) {
        print_step_header(stage.step_number() as usize, &stage.to_string());
    }

    fn stage_finished(&mut self, _stage: PipelineStage, elapsed: Duration, summary: &str) {
        print_success(summary);
        println!(
            "    {}",
            style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
        );
    }

    fn recovered(&mut self, _stage: PipelineStage, warning: &PipelineError) {
        print_warning(&warning.to_string());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.pipeline_config()?;
    let output_dir = cli.output_dir();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&cli.input, &output_dir, &config);

    let spinner = create_spinner("Loading dataset...");
    let load_options = LoadOptions {
        separator: cli.separator_byte()?,
        infer_schema_length: cli.infer_schema_length,
    };
    let df = load_dataset(&cli.input, &load_options)?;
    finish_with_success(&spinner, "Dataset loaded");
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", df.height());
    println!("      Columns: {}", df.width());

    if !cli.no_confirm && !confirm_run(df.height(), df.width())? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let engine = IrlsEngine::new();
    let pipeline = ChurnPipeline::new(config.clone());
    let outcome = pipeline.run(&df, &engine, &mut ConsoleObserver)?;

    display_iv_table(&outcome.iv, config.iv_threshold, 25);
    display_refinement_steps(&outcome.refinement.steps);
    display_coefficient_table(&outcome.refinement.model);
    display_importance_table(&outcome.refinement.model);
    display_evaluation(&outcome.evaluation);
    RunSummary::from_outcome(&outcome).display();

    let engine_name = engine.name();
    let stats = engine.shutdown();
    print_info(&format!(
        "{} engine: {} model fit(s), {} solve(s)",
        engine_name, stats.fits, stats.solves
    ));

    let report = ModelReport::build(
        &outcome,
        &config,
        &cli.input.display().to_string(),
        engine_name,
        Some(stats),
    );
    let spinner = create_spinner("Writing reports...");
    let files = export_all(&report, &outcome.binning, &output_dir)?;
    finish_with_success(&spinner, &format!("Reports saved to {}", output_dir.display()));
    println!("      {}", style(files.report.display()).dim());
    println!("      {}", style(files.coefficients.display()).dim());
    println!("      {}", style(files.binning_map.display()).dim());
    println!("      {}", style(files.archive.display()).dim());

    print_completion();

    Ok(())
}
