use log::debug;
use rayon::prelude::*;

use crate::error::PredictorError;

/// Numerically stable `ln(1 + e^z)`
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fitted parameters of a one-feature logistic model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticFit {
    pub coefficient: f64,
    pub intercept: f64,
    pub iterations: usize,
}

/// L2-regularized logistic regression over a single feature, solved by
/// damped Newton–Raphson on (coefficient, intercept).
///
/// Objective: `0.5·w² + C·Σ logloss(w·x + b, y)`; the intercept is not
/// penalized.
#[derive(Debug, Clone, Copy)]
pub struct LogisticRegression {
    pub c: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            tolerance: 1e-8,
            max_iterations: 100,
        }
    }
}

/// Sums needed for one Newton step
#[derive(Default, Clone, Copy)]
struct Moments {
    loss: f64,
    grad_w: f64,
    grad_b: f64,
    h_ww: f64,
    h_wb: f64,
    h_bb: f64,
}

impl Moments {
    fn add(self, other: Self) -> Self {
        Self {
            loss: self.loss + other.loss,
            grad_w: self.grad_w + other.grad_w,
            grad_b: self.grad_b + other.grad_b,
            h_ww: self.h_ww + other.h_ww,
            h_wb: self.h_wb + other.h_wb,
            h_bb: self.h_bb + other.h_bb,
        }
    }
}

impl LogisticRegression {
    pub fn fit(&self, features: &[f64], labels: &[u8]) -> Result<LogisticFit, PredictorError> {
        if features.is_empty() {
            return Err(PredictorError::Empty);
        }
        let positives = labels.iter().filter(|&&y| y == 1).count();
        if positives == 0 {
            return Err(PredictorError::SingleClass("negative"));
        }
        if positives == labels.len() {
            return Err(PredictorError::SingleClass("positive"));
        }

        // Start from the base rate so the first step only has to learn the slope
        let base_rate = positives as f64 / labels.len() as f64;
        let mut w = 0.0;
        let mut b = (base_rate / (1.0 - base_rate)).ln();

        for iteration in 1..=self.max_iterations {
            let m = self.moments(features, labels, w, b);
            let objective = 0.5 * w * w + self.c * m.loss;

            let g_w = w + self.c * m.grad_w;
            let g_b = self.c * m.grad_b;
            let h_ww = 1.0 + self.c * m.h_ww;
            let h_wb = self.c * m.h_wb;
            let h_bb = self.c * m.h_bb;

            let det = h_ww * h_bb - h_wb * h_wb;
            let (step_w, step_b) = if det.abs() > f64::EPSILON {
                ((h_bb * g_w - h_wb * g_b) / det, (h_ww * g_b - h_wb * g_w) / det)
            } else {
                // Fall back to a diagonal step when the Hessian is singular
                (g_w / h_ww, g_b / h_bb.max(f64::EPSILON))
            };

            // Halve the step until the objective stops increasing
            let mut scale = 1.0;
            let (mut next_w, mut next_b) = (w - step_w, b - step_b);
            for _ in 0..30 {
                let next = self.moments(features, labels, next_w, next_b);
                if 0.5 * next_w * next_w + self.c * next.loss <= objective {
                    break;
                }
                scale *= 0.5;
                next_w = w - scale * step_w;
                next_b = b - scale * step_b;
            }

            let change = (next_w - w).abs().max((next_b - b).abs());
            w = next_w;
            b = next_b;

            if !w.is_finite() || !b.is_finite() {
                return Err(PredictorError::NotConverged(iteration));
            }
            if change < self.tolerance {
                debug!("Logistic regression converged after {} iterations", iteration);
                return Ok(LogisticFit {
                    coefficient: w,
                    intercept: b,
                    iterations: iteration,
                });
            }
        }

        Err(PredictorError::NotConverged(self.max_iterations))
    }

    fn moments(&self, features: &[f64], labels: &[u8], w: f64, b: f64) -> Moments {
        features
            .par_iter()
            .zip(labels.par_iter())
            .map(|(&x, &y)| {
                let z = w * x + b;
                let p = sigmoid(z);
                let y = y as f64;
                let residual = p - y;
                let curvature = p * (1.0 - p);
                Moments {
                    loss: softplus(z) - y * z,
                    grad_w: residual * x,
                    grad_b: residual,
                    h_ww: curvature * x * x,
                    h_wb: curvature * x,
                    h_bb: curvature,
                }
            })
            .reduce(Moments::default, Moments::add)
    }
}
