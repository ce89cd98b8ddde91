//! Discrimination metrics and test-set evaluation

use anyhow::Result;
use polars::prelude::DataFrame;
use serde::Serialize;

use super::model::FittedModel;
use super::target::binary_target_values;

/// Spacing of the fixed threshold grid scanned alongside the observed probabilities
const THRESHOLD_GRID_STEP: f64 = 0.01;

/// Calculate weighted AUC using weighted Mann-Whitney U statistic
///
/// `sorted_pairs` holds (score, label, weight) ordered by score ascending.
/// Tied scores share their average rank.
pub fn weighted_auc(sorted_pairs: &[(f64, i32, f64)]) -> f64 {
    if sorted_pairs.is_empty() {
        return 0.5;
    }

    let total_pos: f64 = sorted_pairs
        .iter()
        .filter(|(_, t, _)| *t == 1)
        .map(|(_, _, w)| w)
        .sum();
    let total_neg: f64 = sorted_pairs
        .iter()
        .filter(|(_, t, _)| *t == 0)
        .map(|(_, _, w)| w)
        .sum();

    if total_pos <= 0.0 || total_neg <= 0.0 {
        return 0.5;
    }

    let n = sorted_pairs.len();
    let mut weighted_rank_sum_pos = 0.0;
    let mut cumulative_weight = 0.0;
    let mut i = 0;

    while i < n {
        let current_value = sorted_pairs[i].0;
        let mut j = i;
        while j < n && (sorted_pairs[j].0 - current_value).abs() < 1e-10 {
            j += 1;
        }

        let group_weight: f64 = sorted_pairs[i..j].iter().map(|(_, _, w)| w).sum();
        let avg_rank = cumulative_weight + group_weight / 2.0;

        for pair in &sorted_pairs[i..j] {
            if pair.1 == 1 {
                weighted_rank_sum_pos += avg_rank * pair.2;
            }
        }

        cumulative_weight += group_weight;
        i = j;
    }

    let u = weighted_rank_sum_pos - total_pos * total_pos / 2.0;
    (u / (total_pos * total_neg)).clamp(0.0, 1.0)
}

/// Unweighted ROC AUC of scores against 0/1 labels
pub fn roc_auc(scores: &[f64], labels: &[i32]) -> f64 {
    let mut pairs: Vec<(f64, i32, f64)> =
        scores.iter().zip(labels).map(|(&s, &l)| (s, l, 1.0)).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    weighted_auc(&pairs)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Predict positive when the probability is at least `threshold`
    pub fn at_threshold(scores: &[f64], labels: &[i32], threshold: f64) -> Self {
        let mut cm = Self::default();
        for (&p, &y) in scores.iter().zip(labels) {
            match (p >= threshold, y == 1) {
                (true, true) => cm.true_positives += 1,
                (true, false) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (false, true) => cm.false_negatives += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives + self.false_negatives,
        )
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Threshold in [0, 1] with the highest F1; the lowest such threshold on ties.
///
/// Candidates are every distinct predicted probability plus a 0.01 grid.
pub fn best_f1_threshold(scores: &[f64], labels: &[i32]) -> (f64, ConfusionMatrix) {
    let mut sorted: Vec<(f64, i32)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    // negatives_below[i] / positives_below[i]: class counts among sorted[..i]
    let mut positives_below = Vec::with_capacity(sorted.len() + 1);
    let mut negatives_below = Vec::with_capacity(sorted.len() + 1);
    positives_below.push(0);
    negatives_below.push(0);
    for &(_, y) in &sorted {
        let (p, n) = (
            positives_below[positives_below.len() - 1],
            negatives_below[negatives_below.len() - 1],
        );
        positives_below.push(p + usize::from(y == 1));
        negatives_below.push(n + usize::from(y != 1));
    }
    let total_pos = positives_below[sorted.len()];
    let total_neg = negatives_below[sorted.len()];

    let steps = (1.0 / THRESHOLD_GRID_STEP).round() as usize;
    let mut candidates: Vec<f64> = (0..=steps).map(|i| i as f64 / steps as f64).collect();
    candidates.extend(sorted.iter().map(|(p, _)| *p).filter(|p| (0.0..=1.0).contains(p)));
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    candidates.dedup();

    let mut best = (0.0, ConfusionMatrix::default(), f64::NEG_INFINITY);
    for t in candidates {
        let idx = sorted.partition_point(|(p, _)| *p < t);
        let cm = ConfusionMatrix {
            true_positives: total_pos - positives_below[idx],
            false_positives: total_neg - negatives_below[idx],
            true_negatives: negatives_below[idx],
            false_negatives: positives_below[idx],
        };
        let f1 = cm.f1();
        if f1 > best.2 {
            best = (t, cm, f1);
        }
    }

    (best.0, best.1)
}

/// Test-set performance of the final model
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub test_auc: f64,
    pub gini: f64,
    pub threshold: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub train_auc: f64,
    pub validation_auc: Option<f64>,
    pub cv_auc: Option<f64>,
    pub test_rows: usize,
}

/// Score the WoE-encoded test partition
pub fn evaluate(
    model: &FittedModel,
    test_df: &DataFrame,
    target: &str,
) -> Result<EvaluationResult> {
    let labels = binary_target_values(test_df, target)?;
    let scores = model.predict_proba(test_df)?;

    let test_auc = roc_auc(&scores, &labels);
    let (threshold, confusion) = best_f1_threshold(&scores, &labels);

    Ok(EvaluationResult {
        test_auc,
        gini: 2.0 * test_auc - 1.0,
        threshold,
        f1: confusion.f1(),
        precision: confusion.precision(),
        recall: confusion.recall(),
        accuracy: confusion.accuracy(),
        confusion,
        train_auc: model.train_auc,
        validation_auc: model.validation_auc,
        cv_auc: model.cv_auc,
        test_rows: labels.len(),
    })
}
