//! Binary classification metrics.
//!
//! The positive class is `true` (a negative review). Log-loss and entropy are
//! measured in bits.

use crate::ml::logistic::Prediction;
use crate::utils::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

const PROBABILITY_EPSILON: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_count: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryClassificationMetrics {
    pub accuracy: f64,
    /// `None` when the set contains a single class.
    pub auc: Option<f64>,
    pub area_under_precision_recall_curve: Option<f64>,
    pub f1_score: f64,
    pub positive_precision: f64,
    pub positive_recall: f64,
    pub negative_precision: f64,
    pub negative_recall: f64,
    pub log_loss: f64,
    pub log_loss_reduction: Option<f64>,
    /// Entropy of the label prior.
    pub entropy: f64,
    pub confusion_matrix: ConfusionMatrix,
}

pub fn evaluate(predictions: &[Prediction], labels: &[bool]) -> Result<BinaryClassificationMetrics> {
    if predictions.len() != labels.len() {
        return Err(PipelineError::EvaluationError {
            message: format!(
                "{} predictions but {} labels",
                predictions.len(),
                labels.len()
            ),
        });
    }
    if predictions.is_empty() {
        return Err(PipelineError::EvaluationError {
            message: "cannot evaluate on an empty set".to_string(),
        });
    }

    let mut cm = ConfusionMatrix::default();
    for (p, &label) in predictions.iter().zip(labels) {
        match (p.predicted_label, label) {
            (true, true) => cm.tp += 1,
            (true, false) => cm.fp += 1,
            (false, false) => cm.tn += 1,
            (false, true) => cm.fn_count += 1,
        }
    }

    let n = labels.len() as f64;
    let positives = cm.tp + cm.fn_count;
    let negatives = cm.tn + cm.fp;

    let positive_precision = ratio(cm.tp, cm.tp + cm.fp);
    let positive_recall = ratio(cm.tp, positives);
    let f1_score = if positive_precision + positive_recall > 0.0 {
        2.0 * positive_precision * positive_recall / (positive_precision + positive_recall)
    } else {
        0.0
    };

    let log_loss = predictions
        .iter()
        .zip(labels)
        .map(|(p, &label)| {
            let prob = (p.probability as f64).clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
            if label {
                -prob.log2()
            } else {
                -(1.0 - prob).log2()
            }
        })
        .sum::<f64>()
        / n;

    let prior = positives as f64 / n;
    let entropy = binary_entropy(prior);
    let log_loss_reduction = (entropy > 0.0).then(|| (entropy - log_loss) / entropy);

    let both_classes = positives > 0 && negatives > 0;
    let scores: Vec<f64> = predictions.iter().map(|p| p.score as f64).collect();

    Ok(BinaryClassificationMetrics {
        accuracy: (cm.tp + cm.tn) as f64 / n,
        auc: both_classes.then(|| roc_auc(&scores, labels)),
        area_under_precision_recall_curve: both_classes.then(|| average_precision(&scores, labels)),
        f1_score,
        positive_precision,
        positive_recall,
        negative_precision: ratio(cm.tn, cm.tn + cm.fn_count),
        negative_recall: ratio(cm.tn, negatives),
        log_loss,
        log_loss_reduction,
        entropy,
        confusion_matrix: cm,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}

/// Mann-Whitney U statistic normalized to [0, 1]; tied scores share their average rank.
fn roc_auc(scores: &[f64], labels: &[bool]) -> f64 {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based
        let average_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] {
                positive_rank_sum += average_rank;
            }
        }
        i = j + 1;
    }

    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let negatives = labels.len() as f64 - positives;
    (positive_rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
}

/// Step-wise area under the precision/recall curve, thresholds taken at each distinct score.
fn average_precision(scores: &[f64], labels: &[bool]) -> f64 {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let mut tp = 0.0;
    let mut seen = 0.0;
    let mut previous_recall = 0.0;
    let mut area = 0.0;

    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            if labels[order[j]] {
                tp += 1.0;
            }
            seen += 1.0;
            j += 1;
        }
        let recall = tp / positives;
        let precision = tp / seen;
        area += (recall - previous_recall) * precision;
        previous_recall = recall;
        i = j;
    }
    area
}

impl std::fmt::Display for BinaryClassificationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opt = |v: Option<f64>| v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "n/a".to_string());
        write!(
            f,
            "acc={:.4} auc={} auprc={} f1={:.4} log_loss={:.4} log_loss_reduction={} (tp={} fp={} tn={} fn={})",
            self.accuracy,
            opt(self.auc),
            opt(self.area_under_precision_recall_curve),
            self.f1_score,
            self.log_loss,
            opt(self.log_loss_reduction),
            self.confusion_matrix.tp,
            self.confusion_matrix.fp,
            self.confusion_matrix.tn,
            self.confusion_matrix.fn_count,
        )
    }
}
