//! Configuration for the PCR run and the demo data generator.

use std::path::PathBuf;

/// Parameters of a single PCR run.
#[derive(Debug, Clone)]
pub struct PcrConfig {
    /// Sample × feature table, first column is the sample ID
    pub expression: PathBuf,

    /// Label table, first column is the sample ID
    pub labels: PathBuf,

    /// Column of the label table holding the 0/1 target
    pub label_column: String,

    /// Field delimiter shared by both input tables (default: tab)
    pub delimiter: char,

    /// Every output file is written as `{output_prefix}_{suffix}`
    pub output_prefix: String,

    // Hyperparameter search
    /// Upper bound on the PCA component count searched (default: 50)
    pub max_components: usize,

    /// Inverse regularization strengths searched (default: 0.01 .. 100)
    pub c_grid: Vec<f64>,

    /// Number of stratified cross-validation folds (default: 5)
    pub n_folds: usize,

    /// Newton iteration cap for logistic regression (default: 1000)
    pub max_iter: usize,

    // Reporting
    /// Reference line drawn on the scree plot (default: 0.9)
    pub variance_threshold: f64,

    /// Features kept per component in the top-genes table (default: 10)
    pub top_per_component: usize,

    /// Features kept in the weighted influence ranking (default: 20)
    pub top_weighted: usize,
}

impl PcrConfig {
    pub fn new(
        expression: impl Into<PathBuf>,
        labels: impl Into<PathBuf>,
        label_column: impl Into<String>,
    ) -> Self {
        Self {
            expression: expression.into(),
            labels: labels.into(),
            label_column: label_column.into(),
            ..Self::default()
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Path of the output file `{prefix}_{suffix}`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}", self.output_prefix, suffix))
    }
}

impl Default for PcrConfig {
    fn default() -> Self {
        Self {
            expression: PathBuf::new(),
            labels: PathBuf::new(),
            label_column: String::new(),
            delimiter: '\t',
            output_prefix: "pcr_result".to_string(),
            max_components: 50,
            c_grid: vec![0.01, 0.1, 1.0, 10.0, 100.0],
            n_folds: 5,
            max_iter: 1000,
            variance_threshold: 0.9,
            top_per_component: 10,
            top_weighted: 20,
        }
    }
}

/// Parameters of the synthetic expression data set.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub n_samples: usize,
    pub n_features: usize,

    /// Leading features whose mean is shifted for positive samples
    pub n_informative: usize,

    pub seed: u64,

    /// Offset added to informative features of positive samples (default: 2.0)
    pub shift: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            n_samples: 100,
            n_features: 1000,
            n_informative: 50,
            seed: 42,
            shift: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_prefix() {
        let config = PcrConfig::new("x.tsv", "y.tsv", "Disease").output_prefix("run1");
        assert_eq!(config.output_path("loadings.tsv"), PathBuf::from("run1_loadings.tsv"));
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.c_grid.len(), 5);
    }
}
