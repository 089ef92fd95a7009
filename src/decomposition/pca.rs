use crate::error::{PcrError, Result};
use crate::{Matrix, Vector};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Eigenvalues below this fraction of the largest one are treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PCA {
    /// Unit-norm principal axes, one per row. Shape: (n_components, n_features)
    pub components: Option<Matrix>,
    /// Variance (ddof = 1) of the data along each component.
    pub explained_variance: Option<Vector>,
    /// `explained_variance` divided by the total variance of the data, so a
    /// truncated decomposition sums to less than one.
    pub explained_variance_ratio: Option<Vector>,
    pub mean: Option<Vector>,
    n_components: Option<usize>,
}

impl PCA {
    pub fn new() -> Self {
        Self {
            components: None,
            explained_variance: None,
            explained_variance_ratio: None,
            mean: None,
            n_components: None,
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(PcrError::InvalidInput(
                "Input matrix must have at least one sample and one feature".to_string(),
            ));
        }
        if x.nrows() < 2 {
            return Err(PcrError::InvalidInput(
                "PCA needs at least 2 samples".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let max_components = n_features.min(n_samples);

        let n_components = self.n_components.unwrap_or(max_components);
        if n_components == 0 || n_components > max_components {
            return Err(PcrError::InvalidInput(format!(
                "n_components={} must be between 1 and min(n_samples, n_features)={}",
                n_components, max_components
            )));
        }

        // Center the data
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PcrError::InvalidInput("empty input".to_string()))?;
        let x_centered = x - &mean.view().insert_axis(Axis(0));
        let total_variance = x_centered.mapv(|v| v * v).sum() / (n_samples as f64 - 1.0);

        let (mut components, explained_variance) = if n_samples > n_features {
            self.fit_covariance(&x_centered, n_components)?
        } else {
            self.fit_gram(&x_centered, n_components)?
        };
        flip_signs(&mut components);

        let explained_variance_ratio = if total_variance > 0.0 {
            &explained_variance / total_variance
        } else {
            Vector::zeros(explained_variance.len())
        };

        self.components = Some(components);
        self.explained_variance = Some(explained_variance);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        self.mean = Some(mean);

        Ok(())
    }

    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let components = self.components.as_ref().ok_or(PcrError::NotFitted("PCA"))?;
        let mean = self.mean.as_ref().ok_or(PcrError::NotFitted("PCA"))?;

        if x.ncols() != mean.len() {
            return Err(PcrError::DimensionMismatch(format!(
                "Number of features in X ({}) doesn't match training data ({})",
                x.ncols(),
                mean.len()
            )));
        }

        let x_centered = x - &mean.view().insert_axis(Axis(0));
        Ok(x_centered.dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Feature × component weight table (the transposed components).
    pub fn loadings(&self) -> Option<Matrix> {
        self.components.as_ref().map(|c| c.t().to_owned())
    }

    pub fn n_components_fitted(&self) -> Option<usize> {
        self.components.as_ref().map(|c| c.nrows())
    }

    pub fn cumulative_explained_variance_ratio(&self) -> Option<Vector> {
        self.explained_variance_ratio.as_ref().map(|ratio| {
            let mut running = 0.0;
            ratio.mapv(|r| {
                running += r;
                running
            })
        })
    }

    /// Smallest number of components whose cumulative ratio reaches
    /// `threshold`, if any.
    pub fn components_for_variance(&self, threshold: f64) -> Option<usize> {
        self.cumulative_explained_variance_ratio()?
            .iter()
            .position(|&c| c >= threshold)
            .map(|i| i + 1)
    }

    fn fit_covariance(&self, x_centered: &Matrix, n_components: usize) -> Result<(Matrix, Vector)> {
        let n_samples = x_centered.nrows() as f64;
        let cov = x_centered.t().dot(x_centered) / (n_samples - 1.0);

        let (eigenvalues, eigenvectors) = symmetric_eigen(&cov)?;

        let mut components = Matrix::zeros((n_components, x_centered.ncols()));
        for i in 0..n_components {
            components.row_mut(i).assign(&eigenvectors.column(i));
        }
        let variance = eigenvalues
            .iter()
            .take(n_components)
            .map(|&v| v.max(0.0))
            .collect::<Vector>();

        Ok((components, variance))
    }

    /// Decomposes the n × n Gram matrix instead of the p × p covariance and
    /// maps each eigenvector back to feature space.
    fn fit_gram(&self, x_centered: &Matrix, n_components: usize) -> Result<(Matrix, Vector)> {
        let n_samples = x_centered.nrows() as f64;
        let gram = x_centered.dot(&x_centered.t()) / (n_samples - 1.0);

        let (eigenvalues, eigenvectors) = symmetric_eigen(&gram)?;
        let cutoff = eigenvalues[0].max(0.0) * RANK_TOLERANCE;

        let mut components = Matrix::zeros((n_components, x_centered.ncols()));
        let mut variance = Vector::zeros(n_components);
        for i in 0..n_components {
            let lambda = eigenvalues[i];
            // Directions beyond the rank of the data stay zero.
            if lambda > cutoff {
                let axis = x_centered.t().dot(&eigenvectors.column(i)) / (lambda * (n_samples - 1.0)).sqrt();
                components.row_mut(i).assign(&axis);
                variance[i] = lambda;
            }
        }

        Ok((components, variance))
    }
}

impl Default for PCA {
    fn default() -> Self {
        Self::new()
    }
}

/// Eigen-decomposes a symmetric matrix, returning eigenvalues in descending
/// order and the matching unit eigenvectors as columns.
fn symmetric_eigen(matrix: &Matrix) -> Result<(Vector, Matrix)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(PcrError::DimensionMismatch(
            "Matrix must be square for eigenvalue decomposition".to_string(),
        ));
    }

    let dense = DMatrix::from_fn(n, n, |i, j| matrix[(i, j)]);
    let eigen = SymmetricEigen::try_new(dense, f64::EPSILON, 0)
        .ok_or_else(|| PcrError::Numerical("eigendecomposition did not converge".to_string()))?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(Ordering::Equal)
    });

    let eigenvalues: Vector = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    if eigenvalues.iter().any(|v| !v.is_finite()) {
        return Err(PcrError::Numerical("non-finite eigenvalue".to_string()));
    }
    let eigenvectors = Matrix::from_shape_fn((n, n), |(r, c)| eigen.eigenvectors[(r, order[c])]);

    Ok((eigenvalues, eigenvectors))
}

/// Makes the largest-magnitude entry of every component positive.
fn flip_signs(components: &mut Matrix) {
    for mut row in components.axis_iter_mut(Axis(0)) {
        let pivot = row
            .iter()
            .copied()
            .max_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Equal))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            row.mapv_inplace(|v| -v);
        }
    }
}
