//! Limited-memory quasi-Newton minimizer.
//!
//! Plain L-BFGS when `l1_weight == 0`, OWL-QN (orthant-wise L-BFGS) otherwise.
//! The L1 penalty applies to the first `l1_dims` coordinates only, so callers
//! can leave a bias term unregularized.

use crate::utils::error::{PipelineError, Result};
use std::collections::VecDeque;

const ARMIJO_C1: f64 = 1e-4;
const MAX_LINE_SEARCH_STEPS: usize = 60;
const CONVERGENCE_WINDOW: usize = 5;
const GRADIENT_EPSILON: f64 = 1e-10;

/// Smooth part of the function being minimized.
pub trait Objective {
    fn dimension(&self) -> usize;

    /// Returns f(x) and writes ∇f(x) into `grad`.
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64;
}

#[derive(Debug, Clone)]
pub struct Minimizer {
    pub history_size: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub l1_weight: f64,
    pub l1_dims: usize,
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

struct Step {
    x: Vec<f64>,
    value: f64,
    grad: Vec<f64>,
}

impl Minimizer {
    pub fn minimize<F: Objective>(&self, objective: &F, x0: Vec<f64>) -> Result<Minimum> {
        let n = objective.dimension();
        if x0.len() != n {
            return Err(PipelineError::TrainingError {
                message: format!("initial point has {} coordinates, expected {}", x0.len(), n),
            });
        }

        let mut x = x0;
        let mut grad = vec![0.0; n];
        let mut value = objective.evaluate(&x, &mut grad) + self.l1_term(&x);
        if !value.is_finite() {
            return Err(PipelineError::TrainingError {
                message: "objective is not finite at the starting point".to_string(),
            });
        }

        let mut s_hist: VecDeque<Vec<f64>> = VecDeque::with_capacity(self.history_size);
        let mut y_hist: VecDeque<Vec<f64>> = VecDeque::with_capacity(self.history_size);
        let mut rho_hist: VecDeque<f64> = VecDeque::with_capacity(self.history_size);
        let mut recent_values: VecDeque<f64> = VecDeque::from([value]);

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            let pg = self.pseudo_gradient(&x, &grad);
            if norm(&pg) < GRADIENT_EPSILON {
                converged = true;
                break;
            }

            let mut dir = two_loop(&pg, &s_hist, &y_hist, &rho_hist);
            if self.l1_weight > 0.0 {
                // 方向必須與最速下降方向同號
                for j in 0..self.l1_dims.min(n) {
                    if dir[j] * pg[j] >= 0.0 {
                        dir[j] = 0.0;
                    }
                }
            }
            if dot(&dir, &pg) >= 0.0 {
                tracing::debug!("Quasi-Newton direction is not a descent direction, resetting history");
                s_hist.clear();
                y_hist.clear();
                rho_hist.clear();
                dir = pg.iter().map(|g| -g).collect();
            }

            iterations += 1;
            let Some(step) = self.line_search(objective, &x, value, &pg, &dir, iterations == 1)
            else {
                tracing::debug!("Line search made no progress at iteration {}", iterations);
                converged = true;
                break;
            };

            let s: Vec<f64> = step.x.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = step.grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            if sy > 1e-10 {
                if s_hist.len() == self.history_size {
                    s_hist.pop_front();
                    y_hist.pop_front();
                    rho_hist.pop_front();
                }
                s_hist.push_back(s);
                y_hist.push_back(y);
                rho_hist.push_back(1.0 / sy);
            }

            x = step.x;
            grad = step.grad;
            value = step.value;

            recent_values.push_back(value);
            if recent_values.len() > CONVERGENCE_WINDOW + 1 {
                recent_values.pop_front();
            }

            tracing::trace!("iteration {}: objective={:.6}", iterations, value);

            if recent_values.len() > CONVERGENCE_WINDOW {
                let oldest = recent_values.front().copied().unwrap_or(value);
                let mean_improvement =
                    (oldest - value) / value.abs().max(1e-12) / CONVERGENCE_WINDOW as f64;
                if mean_improvement < self.tolerance {
                    converged = true;
                    break;
                }
            }
        }

        Ok(Minimum {
            x,
            value,
            iterations,
            converged,
        })
    }

    fn l1_term(&self, x: &[f64]) -> f64 {
        if self.l1_weight == 0.0 {
            return 0.0;
        }
        self.l1_weight * x.iter().take(self.l1_dims).map(|v| v.abs()).sum::<f64>()
    }

    /// Subgradient of minimum norm for the L1-penalized objective.
    fn pseudo_gradient(&self, x: &[f64], grad: &[f64]) -> Vec<f64> {
        if self.l1_weight == 0.0 {
            return grad.to_vec();
        }

        let c = self.l1_weight;
        x.iter()
            .zip(grad)
            .enumerate()
            .map(|(j, (&xj, &gj))| {
                if j >= self.l1_dims {
                    gj
                } else if xj > 0.0 {
                    gj + c
                } else if xj < 0.0 {
                    gj - c
                } else if gj + c < 0.0 {
                    gj + c
                } else if gj - c > 0.0 {
                    gj - c
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn line_search<F: Objective>(
        &self,
        objective: &F,
        x: &[f64],
        value: f64,
        pg: &[f64],
        dir: &[f64],
        first: bool,
    ) -> Option<Step> {
        let l1 = self.l1_weight > 0.0;
        let orthant: Vec<f64> = if l1 {
            x.iter()
                .zip(pg)
                .map(|(&xj, &gj)| if xj != 0.0 { xj.signum() } else { -gj.signum() })
                .collect()
        } else {
            Vec::new()
        };

        let mut alpha = if first {
            1.0 / norm(dir).max(1.0)
        } else {
            1.0
        };
        let mut grad = vec![0.0; x.len()];

        for _ in 0..MAX_LINE_SEARCH_STEPS {
            let mut candidate: Vec<f64> = x.iter().zip(dir).map(|(a, d)| a + alpha * d).collect();
            if l1 {
                for j in 0..self.l1_dims.min(candidate.len()) {
                    if candidate[j] * orthant[j] <= 0.0 {
                        candidate[j] = 0.0;
                    }
                }
            }

            let candidate_value = objective.evaluate(&candidate, &mut grad) + self.l1_term(&candidate);
            if candidate_value.is_finite() {
                let expected: f64 = candidate
                    .iter()
                    .zip(x)
                    .zip(pg)
                    .map(|((c, xi), g)| (c - xi) * g)
                    .sum();
                if candidate_value <= value + ARMIJO_C1 * expected && candidate_value < value {
                    return Some(Step {
                        x: candidate,
                        value: candidate_value,
                        grad,
                    });
                }
            }
            alpha *= 0.5;
        }
        None
    }
}

fn two_loop(
    pg: &[f64],
    s_hist: &VecDeque<Vec<f64>>,
    y_hist: &VecDeque<Vec<f64>>,
    rho_hist: &VecDeque<f64>,
) -> Vec<f64> {
    let k = s_hist.len();
    let mut q = pg.to_vec();
    let mut alphas = vec![0.0; k];

    for i in (0..k).rev() {
        let a = rho_hist[i] * dot(&s_hist[i], &q);
        axpy(-a, &y_hist[i], &mut q);
        alphas[i] = a;
    }

    let gamma = match (s_hist.back(), y_hist.back()) {
        (Some(s), Some(y)) => {
            let yy = dot(y, y);
            if yy > 0.0 {
                dot(s, y) / yy
            } else {
                1.0
            }
        }
        _ => 1.0,
    };
    for v in q.iter_mut() {
        *v *= gamma;
    }

    for i in 0..k {
        let b = rho_hist[i] * dot(&y_hist[i], &q);
        axpy(alphas[i] - b, &s_hist[i], &mut q);
    }

    q.iter().map(|v| -v).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// f(x) = Σ (x_i - c_i)²
    struct Quadratic {
        center: Vec<f64>,
    }

    impl Objective for Quadratic {
        fn dimension(&self) -> usize {
            self.center.len()
        }

        fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
            let mut value = 0.0;
            for i in 0..x.len() {
                let d = x[i] - self.center[i];
                value += d * d;
                grad[i] = 2.0 * d;
            }
            value
        }
    }

    fn minimizer(l1_weight: f64) -> Minimizer {
        Minimizer {
            history_size: 10,
            tolerance: 1e-12,
            max_iterations: 200,
            l1_weight,
            l1_dims: 3,
        }
    }

    #[test]
    fn test_lbfgs_finds_quadratic_minimum() {
        let objective = Quadratic {
            center: vec![1.0, -2.0, 3.0],
        };
        let min = minimizer(0.0).minimize(&objective, vec![0.0; 3]).unwrap();
        for (got, want) in min.x.iter().zip(&objective.center) {
            assert!((got - want).abs() < 1e-4, "got {got}, want {want}");
        }
        assert!(min.value < 1e-6);
    }

    #[test]
    fn test_owlqn_soft_thresholds() {
        // argmin (x - c)² + λ|x| = sign(c)·max(|c| - λ/2, 0)
        let objective = Quadratic {
            center: vec![1.0, -0.2, 3.0],
        };
        let min = minimizer(1.0).minimize(&objective, vec![0.0; 3]).unwrap();
        assert!((min.x[0] - 0.5).abs() < 1e-4);
        assert_eq!(min.x[1], 0.0);
        assert!((min.x[2] - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let objective = Quadratic {
            center: vec![1.0, 2.0],
        };
        assert!(minimizer(0.0).minimize(&objective, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_starting_at_minimum_converges_immediately() {
        let objective = Quadratic {
            center: vec![0.0, 0.0, 0.0],
        };
        let min = minimizer(0.0).minimize(&objective, vec![0.0; 3]).unwrap();
        assert!(min.converged);
        assert_eq!(min.iterations, 0);
    }
}
