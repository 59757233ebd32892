//! Parabola fitting for the eigenvalue peak
//!
//! Fits `y = a (x - x0)^2 + c` by Levenberg-Marquardt on centered and
//! scaled data, so curvatures of order 1e-3 s^3 and eigenvalues of order
//! 1e6 are handled alike.

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

/// Errors that can occur during parabola fitting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("insufficient data: expected at least {expected}, got {got}")]
    InsufficientData { expected: usize, got: usize },

    #[error("length mismatch: x has {x_len} points, y has {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },

    #[error("fit did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("fit produced non-finite parameters")]
    NonFinite,
}

/// Minimum number of points for a three-parameter fit
pub const MIN_DATA_POINTS: usize = 3;

/// Iteration cap, matching the usual 200 * (parameters + 1) evaluation budget
const MAX_ITERATIONS: usize = 800;

/// `y = a (x - x0)^2 + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parabola {
    pub a: f64,
    pub x0: f64,
    pub c: f64,
}

impl Parabola {
    pub fn new(a: f64, x0: f64, c: f64) -> Self {
        Self { a, x0, c }
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.a * (x - self.x0).powi(2) + self.c
    }

    /// `y - eval(x)` for each point
    pub fn residuals(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        x.iter().zip(y).map(|(&xi, &yi)| yi - self.eval(xi)).collect()
    }
}

/// Affine map `v -> (v - center) / scale` used to condition the problem
#[derive(Debug, Clone, Copy)]
struct Scaling {
    center: f64,
    scale: f64,
}

impl Scaling {
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let center = values.iter().sum::<f64>() / n;
        let spread = values
            .iter()
            .map(|v| (v - center).abs())
            .fold(0.0, f64::max);
        Self {
            center,
            scale: if spread > 0.0 { spread } else { 1.0 },
        }
    }

    fn apply(&self, v: f64) -> f64 {
        (v - self.center) / self.scale
    }
}

fn cost(p: &Parabola, x: &[f64], y: &[f64]) -> f64 {
    p.residuals(x, y).iter().map(|r| r * r).sum()
}

/// Least-squares fit of a parabola starting from `guess`.
///
/// # Errors
/// * `FitError::LengthMismatch` - `x` and `y` differ in length
/// * `FitError::InsufficientData` - fewer than [`MIN_DATA_POINTS`] points
/// * `FitError::NoConvergence` - iteration cap reached
/// * `FitError::NonFinite` - inputs or solution not finite
pub fn fit_parabola(x: &[f64], y: &[f64], guess: Parabola) -> Result<Parabola, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < MIN_DATA_POINTS {
        return Err(FitError::InsufficientData {
            expected: MIN_DATA_POINTS,
            got: x.len(),
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let sx = Scaling::of(x);
    let sy = Scaling::of(y);
    let xn: Vec<f64> = x.iter().map(|&v| sx.apply(v)).collect();
    let yn: Vec<f64> = y.iter().map(|&v| sy.apply(v)).collect();

    let mut p = Parabola::new(
        guess.a * sx.scale * sx.scale / sy.scale,
        sx.apply(guess.x0),
        sy.apply(guess.c),
    );
    if ![p.a, p.x0, p.c].iter().all(|v| v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let mut lambda = 1e-3;
    let mut current = cost(&p, &xn, &yn);
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        // Normal equations J^T J and J^T r for parameters (a, x0, c)
        let mut jtj = Matrix3::<f64>::zeros();
        let mut jtr = Vector3::<f64>::zeros();
        for (&xi, &yi) in xn.iter().zip(&yn) {
            let d = xi - p.x0;
            let j = Vector3::new(d * d, -2.0 * p.a * d, 1.0);
            jtj += j * j.transpose();
            jtr += j * (yi - p.eval(xi));
        }

        let mut damped = jtj;
        for k in 0..3 {
            damped[(k, k)] += lambda * jtj[(k, k)].max(1e-12);
        }
        let Some(step) = damped.lu().solve(&jtr) else {
            lambda *= 10.0;
            continue;
        };

        let trial = Parabola::new(p.a + step[0], p.x0 + step[1], p.c + step[2]);
        let trial_cost = cost(&trial, &xn, &yn);

        if trial_cost.is_finite() && trial_cost <= current {
            let improvement = current - trial_cost;
            p = trial;
            current = trial_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= 1e-14 * current.max(1e-300) || step.norm() < 1e-12 {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                // No downhill step left: already at the minimum
                converged = true;
                break;
            }
        }
    }

    if !converged {
        return Err(FitError::NoConvergence {
            iterations: MAX_ITERATIONS,
        });
    }

    let fitted = Parabola::new(
        p.a * sy.scale / (sx.scale * sx.scale),
        sx.center + p.x0 * sx.scale,
        sy.center + p.c * sy.scale,
    );
    if [fitted.a, fitted.x0, fitted.c].iter().all(|v| v.is_finite()) {
        Ok(fitted)
    } else {
        Err(FitError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_exact_parabola_recovered() {
        let truth = Parabola::new(-3.0e9, 0.012, 4.0e4);
        let x: Vec<f64> = (0..21).map(|i| 0.011 + i as f64 * 1e-4).collect();
        let y: Vec<f64> = x.iter().map(|&v| truth.eval(v)).collect();

        let guess = Parabola::new(-1.0e9, 0.0115, 3.9e4);
        let fit = fit_parabola(&x, &y, guess).unwrap();
        assert_relative_eq!(fit.a, truth.a, max_relative = 1e-6);
        assert_relative_eq!(fit.x0, truth.x0, max_relative = 1e-9);
        assert_relative_eq!(fit.c, truth.c, max_relative = 1e-9);
    }

    #[test]
    fn test_noisy_parabola_close_to_truth() {
        let truth = Parabola::new(-2.0, 1.0, 5.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let x: Vec<f64> = (0..40).map(|i| 0.6 + i as f64 * 0.02).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&v| truth.eval(v) + rng.random_range(-0.005..0.005))
            .collect();

        let fit = fit_parabola(&x, &y, Parabola::new(-1.0, 0.9, 4.9)).unwrap();
        assert_relative_eq!(fit.x0, 1.0, epsilon = 0.01);
        assert_relative_eq!(fit.a, -2.0, epsilon = 0.1);
        assert_relative_eq!(fit.c, 5.0, epsilon = 0.01);

        let rms = (fit.residuals(&x, &y).iter().map(|r| r * r).sum::<f64>() / 40.0).sqrt();
        assert!(rms < 0.005);
    }

    #[test]
    fn test_rejects_bad_input() {
        let guess = Parabola::new(1.0, 0.0, 0.0);
        assert_eq!(
            fit_parabola(&[1.0, 2.0], &[1.0, 2.0], guess).unwrap_err(),
            FitError::InsufficientData {
                expected: 3,
                got: 2
            }
        );
        assert_eq!(
            fit_parabola(&[1.0, 2.0, 3.0], &[1.0, 2.0], guess).unwrap_err(),
            FitError::LengthMismatch { x_len: 3, y_len: 2 }
        );
        assert_eq!(
            fit_parabola(&[1.0, 2.0, 3.0], &[1.0, f64::NAN, 2.0], guess).unwrap_err(),
            FitError::NonFinite
        );
    }

    #[test]
    fn test_eval_and_residuals() {
        let p = Parabola::new(2.0, 1.0, -1.0);
        assert_eq!(p.eval(1.0), -1.0);
        assert_eq!(p.eval(3.0), 7.0);
        assert_eq!(p.residuals(&[3.0], &[8.0]), vec![1.0]);
    }
}
