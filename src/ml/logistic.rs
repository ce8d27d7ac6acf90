use crate::ml::featurizer::SparseVector;
use crate::ml::lbfgs::{Minimizer, Objective};
use crate::utils::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbfgsOptions {
    pub l1_regularization: f32,
    pub l2_regularization: f32,
    pub optimization_tolerance: f64,
    /// Number of correction pairs kept for the Hessian approximation.
    pub history_size: usize,
    pub max_iterations: usize,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            l1_regularization: 1.0,
            l2_regularization: 1.0,
            optimization_tolerance: 1e-7,
            history_size: 20,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub objective: f64,
    pub converged: bool,
    pub non_zero_weights: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw margin `w·x + b`.
    pub score: f32,
    pub probability: f32,
    pub predicted_label: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionModel {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LogisticRegressionModel {
    pub fn score(&self, features: &SparseVector) -> f32 {
        features.dot(&self.weights) + self.bias
    }

    pub fn predict(&self, features: &SparseVector) -> Prediction {
        let score = self.score(features);
        Prediction {
            score,
            probability: sigmoid(score as f64) as f32,
            predicted_label: score > 0.0,
        }
    }
}

pub struct LbfgsLogisticRegressionTrainer {
    options: LbfgsOptions,
}

impl LbfgsLogisticRegressionTrainer {
    pub fn new(options: LbfgsOptions) -> Self {
        Self { options }
    }

    /// Fit on rows labelled `true` (positive class) / `false`.
    pub fn fit(
        &self,
        features: &[SparseVector],
        labels: &[bool],
        dimension: usize,
    ) -> Result<(LogisticRegressionModel, TrainingSummary)> {
        if features.len() != labels.len() {
            return Err(PipelineError::TrainingError {
                message: format!(
                    "{} feature rows but {} labels",
                    features.len(),
                    labels.len()
                ),
            });
        }
        if features.is_empty() {
            return Err(PipelineError::EmptyDataset {
                message: "training set has no rows".to_string(),
            });
        }

        let positives = labels.iter().filter(|&&l| l).count();
        if positives == 0 || positives == labels.len() {
            return Err(PipelineError::TrainingError {
                message: format!(
                    "training set contains a single class ({} of {} rows are positive)",
                    positives,
                    labels.len()
                ),
            });
        }

        tracing::info!(
            "Fitting logistic regression: {} rows, {} features, l1={}, l2={}",
            features.len(),
            dimension,
            self.options.l1_regularization,
            self.options.l2_regularization
        );

        let objective = LogLoss {
            features,
            labels,
            dimension,
            l2: self.options.l2_regularization as f64,
        };
        let minimizer = Minimizer {
            history_size: self.options.history_size.max(1),
            tolerance: self.options.optimization_tolerance,
            max_iterations: self.options.max_iterations,
            l1_weight: self.options.l1_regularization as f64,
            l1_dims: dimension,
        };

        let minimum = minimizer.minimize(&objective, vec![0.0; dimension + 1])?;
        if minimum.x.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::TrainingError {
                message: "optimization diverged to non-finite weights".to_string(),
            });
        }

        let weights: Vec<f32> = minimum.x[..dimension].iter().map(|&w| w as f32).collect();
        let bias = minimum.x[dimension] as f32;
        let summary = TrainingSummary {
            iterations: minimum.iterations,
            objective: minimum.value,
            converged: minimum.converged,
            non_zero_weights: weights.iter().filter(|w| **w != 0.0).count(),
        };

        if !summary.converged {
            tracing::warn!(
                "L-BFGS stopped after {} iterations without meeting tolerance {}",
                summary.iterations,
                self.options.optimization_tolerance
            );
        }

        Ok((LogisticRegressionModel { weights, bias }, summary))
    }
}

/// Σ log(1 + exp(-y·s)) + ½·l2·‖w‖², with the bias stored last in `x`.
struct LogLoss<'a> {
    features: &'a [SparseVector],
    labels: &'a [bool],
    dimension: usize,
    l2: f64,
}

impl Objective for LogLoss<'_> {
    fn dimension(&self) -> usize {
        self.dimension + 1
    }

    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        grad.iter_mut().for_each(|g| *g = 0.0);
        let bias = x[self.dimension];
        let mut loss = 0.0;

        for (row, &label) in self.features.iter().zip(self.labels) {
            let margin: f64 = row
                .iter()
                .filter(|(i, _)| *i < self.dimension)
                .map(|(i, v)| x[i] * v as f64)
                .sum::<f64>()
                + bias;

            let y = if label { 1.0 } else { 0.0 };
            loss += if label {
                softplus(-margin)
            } else {
                softplus(margin)
            };

            let residual = sigmoid(margin) - y;
            for (i, v) in row.iter().filter(|(i, _)| *i < self.dimension) {
                grad[i] += residual * v as f64;
            }
            grad[self.dimension] += residual;
        }

        if self.l2 > 0.0 {
            for i in 0..self.dimension {
                loss += 0.5 * self.l2 * x[i] * x[i];
                grad[i] += self.l2 * x[i];
            }
        }

        loss
    }
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + eᶻ) without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(index: u32, dimension: usize) -> SparseVector {
        SparseVector {
            dimension,
            indices: vec![index],
            values: vec![1.0],
        }
    }

    fn options() -> LbfgsOptions {
        LbfgsOptions {
            l1_regularization: 0.0,
            l2_regularization: 0.1,
            ..LbfgsOptions::default()
        }
    }

    #[test]
    fn test_separable_data_is_learned() {
        // feature 0 marks negative reviews, feature 1 positive ones
        let features: Vec<_> = (0..20).map(|i| one_hot(i % 2, 2)).collect();
        let labels: Vec<_> = (0..20).map(|i| i % 2 == 0).collect();

        let trainer = LbfgsLogisticRegressionTrainer::new(options());
        let (model, summary) = trainer.fit(&features, &labels, 2).unwrap();

        assert!(model.weights[0] > 0.0);
        assert!(model.weights[1] < 0.0);
        assert!(model.predict(&one_hot(0, 2)).predicted_label);
        assert!(!model.predict(&one_hot(1, 2)).predicted_label);
        assert!(model.predict(&one_hot(0, 2)).probability > 0.9);
        assert!(summary.iterations > 0);
        assert_eq!(summary.non_zero_weights, 2);
    }

    #[test]
    fn test_strong_l1_zeroes_noise_feature() {
        // feature 2 appears equally in both classes
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let label = i % 2 == 0;
            features.push(SparseVector {
                dimension: 3,
                indices: vec![if label { 0 } else { 1 }, 2],
                values: vec![1.0, 1.0],
            });
            labels.push(label);
        }

        let trainer = LbfgsLogisticRegressionTrainer::new(LbfgsOptions {
            l1_regularization: 2.0,
            ..options()
        });
        let (model, summary) = trainer.fit(&features, &labels, 3).unwrap();
        assert!(model.weights[2].abs() < 1e-6);
        assert!(summary.non_zero_weights <= 2);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let features = vec![one_hot(0, 1), one_hot(0, 1)];
        let trainer = LbfgsLogisticRegressionTrainer::new(options());
        let err = trainer.fit(&features, &[true, true], 1).unwrap_err();
        assert!(matches!(err, PipelineError::TrainingError { .. }));
    }

    #[test]
    fn test_empty_and_mismatched_input() {
        let trainer = LbfgsLogisticRegressionTrainer::new(options());
        assert!(matches!(
            trainer.fit(&[], &[], 3),
            Err(PipelineError::EmptyDataset { .. })
        ));
        assert!(trainer.fit(&[one_hot(0, 1)], &[true, false], 1).is_err());
    }

    #[test]
    fn test_sigmoid_and_softplus_are_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(800.0) - 1.0).abs() < 1e-12);
        assert!(softplus(800.0).is_finite());
        assert!((softplus(0.0) - 2.0_f64.ln()).abs() < 1e-12);
    }
}
