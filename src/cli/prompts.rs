//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask before starting a run over `rows` x `columns`
pub fn confirm_run(rows: usize, columns: usize) -> Result<bool> {
    confirm_step(&format!(
        "Build a churn model from {} rows and {} columns?",
        rows, columns
    ))
}
