use crate::error::{PcrError, Result};
use crate::{Matrix, Vector};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Binary logistic regression with an L2 penalty.
///
/// Minimizes `0.5 * ||w||^2 + C * sum(logloss)`; the intercept is not
/// penalized. Larger `C` means weaker regularization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Option<Vector>,
    pub intercept: Option<f64>,
    c: f64,
    max_iterations: usize,
    tolerance: f64,
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }

    pub fn c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PcrError::DimensionMismatch(
                "Number of samples in X and y must match".to_string(),
            ));
        }
        if x.nrows() == 0 {
            return Err(PcrError::InvalidInput("cannot fit on zero samples".to_string()));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(PcrError::InvalidInput(format!(
                "C must be positive and finite, got {}",
                self.c
            )));
        }

        validate_labels(y)?;

        let (coeffs, intercept) = self.fit_with_intercept(x, y)?;

        self.coefficients = Some(coeffs);
        self.intercept = Some(intercept);
        Ok(())
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vector> {
        let probabilities = self.predict_proba(x)?;
        let predictions = probabilities.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 });
        Ok(predictions)
    }

    /// Probability of the positive class for every row of `x`.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vector> {
        let coeffs = self
            .coefficients
            .as_ref()
            .ok_or(PcrError::NotFitted("LogisticRegression"))?;
        let intercept = self.intercept.unwrap_or(0.0);

        if x.ncols() != coeffs.len() {
            return Err(PcrError::DimensionMismatch(format!(
                "Number of features in X ({}) doesn't match training data ({})",
                x.ncols(),
                coeffs.len()
            )));
        }

        let linear_combination = x.dot(coeffs) + intercept;
        Ok(linear_combination.mapv(sigmoid))
    }

    /// Mean accuracy on `x`, `y`.
    pub fn score(&self, x: &Matrix, y: &Vector) -> Result<f64> {
        let predictions = self.predict(x)?;
        crate::metrics::accuracy_score(y, &predictions)
    }

    fn fit_with_intercept(&self, x: &Matrix, y: &Vector) -> Result<(Vector, f64)> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let mut x_with_intercept = Matrix::ones((n_samples, n_features + 1));
        x_with_intercept.slice_mut(ndarray::s![.., 1..]).assign(x);

        let coeffs_with_intercept = self.newton(&x_with_intercept, y)?;

        let intercept = coeffs_with_intercept[0];
        let coeffs = coeffs_with_intercept.slice(ndarray::s![1..]).to_owned();

        Ok((coeffs, intercept))
    }

    /// Newton's method with backtracking. The first column of `x` is the
    /// constant intercept column and is left unpenalized.
    fn newton(&self, x: &Matrix, y: &Vector) -> Result<Vector> {
        let n_params = x.ncols();
        let penalty = Vector::from_shape_fn(n_params, |j| if j == 0 { 0.0 } else { 1.0 });

        let mut weights = Vector::zeros(n_params);
        let mut cost = self.objective(x, y, &weights, &penalty);

        for iteration in 0..self.max_iterations {
            let probabilities = x.dot(&weights).mapv(sigmoid);
            let gradient = &penalty * &weights + &(x.t().dot(&(&probabilities - y)) * self.c);

            let gradient_norm = gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
            if gradient_norm < self.tolerance {
                debug!("Logistic regression converged after {} iterations", iteration);
                break;
            }

            // H = diag(penalty) + C * X^T W X
            let curvature = probabilities.mapv(|p| p * (1.0 - p));
            let weighted_x = x * &curvature.view().insert_axis(ndarray::Axis(1));
            let hessian = x.t().dot(&weighted_x) * self.c;

            let step = solve_newton_step(&hessian, &penalty, &gradient)?;

            let slope = gradient.dot(&step);
            let mut step_size = 1.0;
            let mut accepted = false;
            while step_size > 1e-10 {
                let candidate = &weights - &(&step * step_size);
                let candidate_cost = self.objective(x, y, &candidate, &penalty);
                if candidate_cost <= cost - 1e-4 * step_size * slope {
                    weights = candidate;
                    cost = candidate_cost;
                    accepted = true;
                    break;
                }
                step_size *= 0.5;
            }

            if cost.is_nan() || cost.is_infinite() {
                return Err(PcrError::Numerical("Newton iterations diverged".to_string()));
            }
            if !accepted {
                debug!(
                    "Line search stalled at iteration {} (max |gradient| = {:.3e})",
                    iteration, gradient_norm
                );
                break;
            }
            if iteration + 1 == self.max_iterations {
                debug!(
                    "Logistic regression hit max_iterations={} (max |gradient| = {:.3e})",
                    self.max_iterations, gradient_norm
                );
            }
        }

        Ok(weights)
    }

    fn objective(&self, x: &Matrix, y: &Vector, weights: &Vector, penalty: &Vector) -> f64 {
        let z = x.dot(weights);
        let loss = z
            .iter()
            .zip(y.iter())
            .map(|(&z, &y)| softplus(z) - y * z)
            .sum::<f64>();
        let ridge = 0.5 * (penalty * &weights.mapv(|w| w * w)).sum();
        ridge + self.c * loss
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn solve_newton_step(hessian: &Matrix, penalty: &Vector, gradient: &Vector) -> Result<Vector> {
    let n = hessian.nrows();
    // Jitter keeps the unpenalized intercept block positive definite when
    // predictions saturate.
    let system = DMatrix::from_fn(n, n, |i, j| {
        let diagonal = if i == j { penalty[i] + 1e-10 } else { 0.0 };
        hessian[(i, j)] + diagonal
    });
    let rhs = DVector::from_iterator(n, gradient.iter().copied());

    let cholesky = system.cholesky().ok_or_else(|| {
        PcrError::Numerical("Hessian is not positive definite".to_string())
    })?;
    let solution = cholesky.solve(&rhs);
    Ok(solution.iter().copied().collect())
}

/// Fails unless every label is exactly 0 or 1.
pub fn validate_labels(y: &Vector) -> Result<()> {
    for &label in y.iter() {
        if label != 0.0 && label != 1.0 {
            return Err(PcrError::NonBinaryLabels(label.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_logistic_regression_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let probabilities = model.predict_proba(&x).unwrap();

        assert_eq!(predictions.len(), 4);
        assert_eq!(probabilities.len(), 4);

        assert!(probabilities[0] < 0.5);
        assert!(probabilities[3] > 0.5);
    }

    #[test]
    fn test_logistic_regression_score() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let score = model.score(&x, &y).unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_gradient_vanishes_at_solution() {
        let x = array![[0.5, 1.0], [1.5, -0.5], [2.0, 0.3], [3.5, 1.2], [-1.0, 0.4], [2.5, -1.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let c = 2.0;
        let mut model = LogisticRegression::new().c(c).tolerance(1e-10);
        model.fit(&x, &y).unwrap();

        let w = model.coefficients.as_ref().unwrap();
        let b = model.intercept.unwrap();
        let residual = model.predict_proba(&x).unwrap() - &y;

        // d/dw: w + C X^T (p - y), d/db: C sum(p - y)
        let grad_w = w + &(x.t().dot(&residual) * c);
        for g in grad_w.iter() {
            assert_abs_diff_eq!(*g, 0.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(residual.sum() * c, 0.0, epsilon = 1e-6);
        assert!(b.is_finite());
    }

    #[test]
    fn test_stronger_regularization_shrinks_coefficients() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [2.5], [1.5]];
        let y = array![0.0, 0.0, 1.0, 1.0, 1.0, 0.0];

        let mut weak = LogisticRegression::new().c(100.0);
        weak.fit(&x, &y).unwrap();
        let mut strong = LogisticRegression::new().c(0.01);
        strong.fit(&x, &y).unwrap();

        let weak_w = weak.coefficients.as_ref().unwrap()[0].abs();
        let strong_w = strong.coefficients.as_ref().unwrap()[0].abs();
        assert!(strong_w < weak_w);
    }

    #[test]
    fn test_separable_data_stays_finite() {
        let x = array![[-2.0], [-1.0], [1.0], [2.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = LogisticRegression::new().c(100.0);
        model.fit(&x, &y).unwrap();

        assert!(model.coefficients.as_ref().unwrap()[0].is_finite());
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_probability_of_one_half_predicts_negative() {
        let model = LogisticRegression {
            coefficients: Some(array![0.0, 1.0]),
            intercept: Some(0.0),
            ..LogisticRegression::new()
        };
        let x = array![[3.0, 0.0], [0.0, 1e-3], [0.0, -1e-3]];

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba[0], 0.5);
        assert_eq!(model.predict(&x).unwrap(), array![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_intercept_is_not_penalized() {
        // Constant feature: the intercept alone matches the base rate
        let x = array![[0.0], [0.0], [0.0], [0.0], [0.0], [0.0]];
        let y = array![1.0, 1.0, 1.0, 1.0, 1.0, 0.0];

        let mut model = LogisticRegression::new().c(0.01).tolerance(1e-10);
        model.fit(&x, &y).unwrap();
        assert_abs_diff_eq!(model.intercept.unwrap(), 5.0_f64.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_logistic_regression_invalid_labels() {
        let x = array![[1.0], [2.0]];
        let y = array![0.5, 2.0];

        let mut model = LogisticRegression::new();
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_invalid_c() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 1.0];

        let mut model = LogisticRegression::new().c(0.0);
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_logistic_regression_predict_without_fit() {
        let x = array![[1.0], [2.0]];
        let model = LogisticRegression::new();

        assert!(model.predict(&x).is_err());
        assert!(model.predict_proba(&x).is_err());
    }

    #[test]
    fn test_sigmoid_function() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10);
        assert!(sigmoid(1000.0) > 0.99);
        assert!(sigmoid(-1000.0) < 0.01);
        assert!(softplus(1000.0).is_finite());
        assert_abs_diff_eq!(softplus(0.0), std::f64::consts::LN_2, epsilon = 1e-12);
    }
}
