//! Classifier evaluation against a labelled dataset.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::intent::IntentPredictor;
use super::knowledge::{IntentDataset, FALLBACK_TAG};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Number of true instances of this label.
    pub support: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f32,
    pub per_label: BTreeMap<String, LabelMetrics>,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

/// Predict every text and score it against its label. Predictor errors count
/// as the `fallback` label.
pub fn evaluate(predictor: &dyn IntentPredictor, dataset: &IntentDataset) -> EvaluationReport {
    let mut true_positive: BTreeMap<String, usize> = BTreeMap::new();
    let mut predicted_count: BTreeMap<String, usize> = BTreeMap::new();
    let mut support: BTreeMap<String, usize> = BTreeMap::new();
    let mut correct = 0;

    for (text, expected) in dataset.iter() {
        let predicted = predictor
            .predict(text)
            .map(|p| p.label)
            .unwrap_or_else(|_| FALLBACK_TAG.to_string());

        *support.entry(expected.to_string()).or_default() += 1;
        *predicted_count.entry(predicted.clone()).or_default() += 1;
        if predicted == expected {
            correct += 1;
            *true_positive.entry(predicted).or_default() += 1;
        }
    }

    let labels: BTreeSet<&String> = support.keys().chain(predicted_count.keys()).collect();
    let per_label = labels
        .into_iter()
        .map(|label| {
            let tp = true_positive.get(label).copied().unwrap_or(0);
            let precision = ratio(tp, predicted_count.get(label).copied().unwrap_or(0));
            let label_support = support.get(label).copied().unwrap_or(0);
            let recall = ratio(tp, label_support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (
                label.clone(),
                LabelMetrics {
                    precision,
                    recall,
                    f1,
                    support: label_support,
                },
            )
        })
        .collect();

    EvaluationReport {
        total: dataset.len(),
        correct,
        accuracy: ratio(correct, dataset.len()),
        per_label,
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24} {:>9} {:>9} {:>9} {:>9}", "label", "precision", "recall", "f1", "support")?;
        for (label, m) in &self.per_label {
            writeln!(
                f,
                "{:<24} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        write!(f, "\naccuracy: {:.3} ({}/{})", self.accuracy, self.correct, self.total)
    }
}
