use crate::data::loader::DatasetSchema;
use crate::ml::logistic::TrainingSummary;
use crate::ml::metrics::BinaryClassificationMetrics;
use crate::ml::TrainedModel;
use serde::{Deserialize, Serialize};

/// One labeled row of the input file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub text: String,
    pub is_negative: bool,
}

impl SentimentRecord {
    pub fn new(text: impl Into<String>, is_negative: bool) -> Self {
        Self {
            text: text.into(),
            is_negative,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<SentimentRecord>,
    pub test: Vec<SentimentRecord>,
}

/// Result of the fit phase, handed to evaluation and persistence.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub summary: TrainingSummary,
    pub schema: DatasetSchema,
    pub training_rows: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub output_path: String,
    pub training_rows: usize,
    pub validation_rows: usize,
    pub summary: TrainingSummary,
    pub metrics: Option<BinaryClassificationMetrics>,
}

impl std::fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Rows: {} training / {} validation",
            self.training_rows, self.validation_rows
        )?;
        writeln!(
            f,
            "Optimizer: {} iterations, converged: {}, non-zero weights: {}",
            self.summary.iterations, self.summary.converged, self.summary.non_zero_weights
        )?;
        match &self.metrics {
            Some(metrics) => {
                writeln!(f, "Accuracy: {:.2}%", metrics.accuracy * 100.0)?;
                if let Some(auc) = metrics.auc {
                    writeln!(f, "AUC: {:.2}%", auc * 100.0)?;
                }
                writeln!(f, "F1 score: {:.2}%", metrics.f1_score * 100.0)?;
            }
            None => writeln!(f, "No validation rows, metrics skipped")?,
        }
        write!(f, "Model saved to: {}", self.output_path)
    }
}
