//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

/// Standard normal draw via Box-Muller
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Create a seeded churn dataset with known structure
///
/// Columns:
/// - `customer_id`: unique string per row (meant to be dropped)
/// - `score`: strong separator, N(+2, 1) for churners and N(-2, 1) otherwise
/// - `contract`: categorical, month-to-month is common among churners
/// - `charges`: weak numeric signal with a handful of extreme values
/// - `noise`: uniform, independent of the target
/// - `y`: "yes" for churn, "no" otherwise; about 30% churn
pub fn create_churn_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(rows);
    let mut score = Vec::with_capacity(rows);
    let mut contract = Vec::with_capacity(rows);
    let mut charges = Vec::with_capacity(rows);
    let mut noise = Vec::with_capacity(rows);
    let mut y = Vec::with_capacity(rows);

    for i in 0..rows {
        let churn = rng.gen::<f64>() < 0.3;
        ids.push(format!("C{:06}", i));
        let centre = if churn { 2.0 } else { -2.0 };
        score.push(centre + normal(&mut rng));

        let u = rng.gen::<f64>();
        let plan = if churn {
            if u < 0.7 { "month-to-month" } else if u < 0.9 { "one-year" } else { "two-year" }
        } else if u < 0.3 {
            "month-to-month"
        } else if u < 0.65 {
            "one-year"
        } else {
            "two-year"
        };
        contract.push(plan.to_string());

        let uplift = if churn { 8.0 } else { 0.0 };
        let base = 60.0 + uplift + 15.0 * normal(&mut rng);
        charges.push(if i % 97 == 0 { base * 20.0 } else { base });

        noise.push(rng.gen::<f64>() * 100.0);
        y.push(if churn { "yes" } else { "no" }.to_string());
    }

    DataFrame::new(vec![
        Column::new("customer_id".into(), ids),
        Column::new("score".into(), score),
        Column::new("contract".into(), contract),
        Column::new("charges".into(), charges),
        Column::new("noise".into(), noise),
        Column::new("y".into(), y),
    ])
    .unwrap()
}

/// Scorecard acceptance dataset: 1000 rows, exactly balanced target
///
/// Numeric columns:
/// - `sep`: equals the target (0.0 / 1.0), a perfect separator
/// - `tenure`: strong signal, churners have shorter tenure
/// - `balance`: moderate signal
/// - `noise`: uniform on [0, 100), independent of the target
/// - `constant`: 7.0 on every row
///
/// Categorical columns: `plan` (informative), `region` and `channel` (random).
/// `y` is "yes" for churn and "no" otherwise.
pub fn create_scenario_dataframe(seed: u64) -> DataFrame {
    const ROWS: usize = 1000;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut churn: Vec<bool> = (0..ROWS).map(|i| i < ROWS / 2).collect();
    churn.shuffle(&mut rng);

    let regions = ["north", "south", "east", "west"];
    let channels = ["web", "store", "phone"];

    let mut sep = Vec::with_capacity(ROWS);
    let mut tenure = Vec::with_capacity(ROWS);
    let mut balance = Vec::with_capacity(ROWS);
    let mut noise = Vec::with_capacity(ROWS);
    let mut plan = Vec::with_capacity(ROWS);
    let mut region = Vec::with_capacity(ROWS);
    let mut channel = Vec::with_capacity(ROWS);
    let mut y = Vec::with_capacity(ROWS);

    for &c in &churn {
        let shift = if c { 1.0 } else { 0.0 };
        sep.push(shift);
        tenure.push(30.0 - 12.0 * shift + 8.0 * normal(&mut rng));
        balance.push(1000.0 + 300.0 * shift + 800.0 * normal(&mut rng));
        noise.push(rng.gen::<f64>() * 100.0);

        let u = rng.gen::<f64>();
        let monthly_share = if c { 0.7 } else { 0.3 };
        plan.push(if u < monthly_share { "monthly" } else { "annual" }.to_string());
        region.push(regions[rng.gen_range(0..regions.len())].to_string());
        channel.push(channels[rng.gen_range(0..channels.len())].to_string());
        y.push(if c { "yes" } else { "no" }.to_string());
    }

    DataFrame::new(vec![
        Column::new("sep".into(), sep),
        Column::new("tenure".into(), tenure),
        Column::new("balance".into(), balance),
        Column::new("noise".into(), noise),
        Column::new("constant".into(), vec![7.0f64; ROWS]),
        Column::new("plan".into(), plan),
        Column::new("region".into(), region),
        Column::new("channel".into(), channel),
        Column::new("y".into(), y),
    ])
    .unwrap()
}

/// WoE-style numeric frame with a 0/1 target, for engine and refinement tests
///
/// `signal` drives the target through a logistic link; `weak` and `noise` do not.
pub fn create_logistic_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut signal = Vec::with_capacity(rows);
    let mut weak = Vec::with_capacity(rows);
    let mut noise = Vec::with_capacity(rows);
    let mut target = Vec::with_capacity(rows);

    for _ in 0..rows {
        let s = normal(&mut rng);
        let w = normal(&mut rng);
        let p = 1.0 / (1.0 + (-(-0.5 + 2.0 * s)).exp());
        signal.push(s);
        weak.push(w);
        noise.push(normal(&mut rng));
        target.push(i32::from(rng.gen::<f64>() < p));
    }

    DataFrame::new(vec![
        Column::new("signal".into(), signal),
        Column::new("weak".into(), weak),
        Column::new("noise".into(), noise),
        Column::new("target".into(), target),
    ])
    .unwrap()
}

/// Numeric target vector of a frame
pub fn targets(df: &DataFrame, column: &str) -> Vec<i32> {
    df.column(column)
        .unwrap()
        .cast(&DataType::Int32)
        .unwrap()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
