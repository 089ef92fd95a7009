//! Standardize → PCA → logistic regression, fitted and persisted as one unit.

use crate::decomposition::PCA;
use crate::error::{PcrError, Result};
use crate::linear_model::LogisticRegression;
use crate::preprocessing::StandardScaler;
use crate::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// One point of the hyperparameter grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcrParams {
    /// Number of principal components fed to the classifier
    pub n_components: usize,
    /// Inverse regularization strength of the classifier
    pub c: f64,
}

impl fmt::Display for PcrParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n_components={}, C={}", self.n_components, self.c)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PcrPipeline {
    pub params: PcrParams,
    max_iter: usize,
    scaler: StandardScaler,
    pca: PCA,
    classifier: LogisticRegression,
    fitted: bool,
}

impl PcrPipeline {
    pub fn new(params: PcrParams) -> Self {
        Self {
            params,
            max_iter: 1000,
            scaler: StandardScaler::new(),
            pca: PCA::new().n_components(params.n_components),
            classifier: LogisticRegression::new().c(params.c),
            fitted: false,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fits every stage on `x` (raw, unstandardized features) and `y`.
    pub fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(x)?;

        let mut pca = PCA::new().n_components(self.params.n_components);
        let scores = pca.fit_transform(&scaled)?;

        let mut classifier = LogisticRegression::new()
            .c(self.params.c)
            .max_iterations(self.max_iter);
        classifier.fit(&scores, y)?;

        self.scaler = scaler;
        self.pca = pca;
        self.classifier = classifier;
        self.fitted = true;
        Ok(())
    }

    /// Component scores of `x`.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        if !self.fitted {
            return Err(PcrError::NotFitted("PcrPipeline"));
        }
        let scaled = self.scaler.transform(x)?;
        self.pca.transform(&scaled)
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vector> {
        self.classifier.predict(&self.transform(x)?)
    }

    pub fn predict_proba(&self, x: &Matrix) -> Result<Vector> {
        self.classifier.predict_proba(&self.transform(x)?)
    }

    pub fn score(&self, x: &Matrix, y: &Vector) -> Result<f64> {
        self.classifier.score(&self.transform(x)?, y)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn pca(&self) -> &PCA {
        &self.pca
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    /// Writes the fitted pipeline to `path` as bincode.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.fitted {
            return Err(PcrError::NotFitted("PcrPipeline"));
        }
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| PcrError::Serialization(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let pipeline: PcrPipeline =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .map_err(|e| PcrError::Serialization(e.to_string()))?;

        if !pipeline.fitted {
            return Err(PcrError::Serialization(
                "loaded pipeline was never fitted".to_string(),
            ));
        }
        Ok(pipeline)
    }
}
