//! Terminal styling for the step-by-step console output

use console::{style, Emoji};
use std::path::Path;

use crate::pipeline::PipelineConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static SCALE: Emoji<'_, '_> = Emoji("⚖️  ", "");

pub fn print_banner(version: &str) {
    let banner = r#"
      ___ _                   ___
     / __| |_ _  _ _ _ _ _   / __| __ ___ _ _ ___
    | (__| ' \ || | '_| ' \  \__ \/ _/ _ \ '_/ -_)
     \___|_||_\_,_|_| |_||_| |___/\__\___/_| \___|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Churn scoring with WoE binning and logistic refinement").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(input: &Path, output: &Path, config: &PipelineConfig) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Input:  {:<39}│", FOLDER, truncate_path(input, 38));
    println!(
        "    │  {} Target: {:<39}│",
        TARGET,
        truncate_string(
            &format!(
                "{} ({} vs {})",
                config.target.column, config.target.event_value, config.target.non_event_value
            ),
            38
        )
    );
    println!("    │  {} Output: {:<39}│", SAVE, truncate_path(output, 38));
    println!("    ├{}┤", line);
    println!(
        "    │  {} IV threshold:          {:<24}│",
        CHART,
        style(format!("{:.3}", config.iv_threshold)).yellow()
    );
    println!(
        "    │  {} Binning:               {:<24}│",
        CHART,
        style(format!(
            "{}, {}-{} bins",
            config.binning.method, config.binning.min_bins, config.binning.max_bins
        ))
        .yellow()
    );
    println!(
        "    │  {} Significance level:    {:<24}│",
        SCALE,
        style(format!(
            "{:.2} ({})",
            config.refinement.significance, config.fit.significance_test
        ))
        .yellow()
    );
    println!(
        "    │  {} Split (test/valid):    {:<24}│",
        SCALE,
        style(format!(
            "{:.0}% / {:.0}%, seed {}",
            config.split.test_fraction * 100.0,
            config.split.validation_fraction * 100.0,
            config.split.seed
        ))
        .yellow()
    );
    println!("    └{}┘", line);
    println!();
}

pub fn print_step_header(step_num: usize, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

pub fn print_completion() {
    println!();
    println!("    {} {}", ROCKET, style("Churn scoring complete!").green().bold());
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, threshold_info: Option<&str>) {
    if let Some(info) = threshold_info {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(len - max_len + 3).collect();
        format!("...{}", tail)
    }
}
