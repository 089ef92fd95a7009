//! Synthetic two-class expression data with a block of informative features.

use crate::config::DemoConfig;
use crate::dataset::{Dataset, Table};
use crate::error::{PcrError, Result};
use crate::Vector;
use log::info;
use ndarray::s;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

pub const EXPRESSION_FILE: &str = "demo_expression.tsv";
pub const LABELS_FILE: &str = "demo_labels.tsv";
pub const LABEL_COLUMN: &str = "Disease";
const INDEX_NAME: &str = "Sample";

#[derive(Clone, Debug)]
pub struct DemoData {
    pub dataset: Dataset,
}

impl DemoData {
    /// Sample × gene table with a `Sample` index header.
    pub fn expression_table(&self) -> Result<Table> {
        let ds = &self.dataset;
        let mut table = Table::new(INDEX_NAME, ds.feature_names.clone());
        for (id, row) in ds.sample_ids.iter().zip(ds.features.rows()) {
            table.push_row(id.clone(), row.iter().map(|v| v.to_string()).collect())?;
        }
        Ok(table)
    }

    /// Single `Disease` column of 0/1 labels.
    pub fn labels_table(&self) -> Result<Table> {
        let ds = &self.dataset;
        let mut table = Table::new(INDEX_NAME, vec![LABEL_COLUMN.to_string()]);
        for (id, label) in ds.sample_ids.iter().zip(ds.labels.iter()) {
            table.push_row(id.clone(), vec![label.to_string()])?;
        }
        Ok(table)
    }
}

/// Draws `n_samples × n_features` standard-normal values and shifts the first
/// `n_informative` features of the positive half by `config.shift`.
///
/// The first `n_samples / 2` samples are labeled 0, the rest 1.
pub fn generate_demo_data(config: &DemoConfig) -> Result<DemoData> {
    if config.n_samples < 2 {
        return Err(PcrError::InvalidInput(format!(
            "need at least 2 samples, got {}",
            config.n_samples
        )));
    }
    if config.n_features == 0 || config.n_informative > config.n_features {
        return Err(PcrError::InvalidInput(format!(
            "n_informative ({}) must not exceed n_features ({}), which must be positive",
            config.n_informative, config.n_features
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut features = crate::Matrix::random_using(
        (config.n_samples, config.n_features),
        StandardNormal,
        &mut rng,
    );

    let n_negative = config.n_samples / 2;
    let labels = Vector::from_shape_fn(config.n_samples, |i| if i < n_negative { 0.0 } else { 1.0 });
    features
        .slice_mut(s![n_negative.., ..config.n_informative])
        .mapv_inplace(|v| v + config.shift);

    let dataset = Dataset {
        features,
        labels,
        sample_ids: (1..=config.n_samples).map(|i| format!("S{}", i)).collect(),
        feature_names: (1..=config.n_features).map(|i| format!("Gene_{}", i)).collect(),
    };
    Ok(DemoData { dataset })
}

/// Writes the expression and label tables into `dir` and returns their paths.
pub fn write_demo_data(data: &DemoData, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let expression_path = dir.as_ref().join(EXPRESSION_FILE);
    let labels_path = dir.as_ref().join(LABELS_FILE);

    data.expression_table()?.write(&expression_path, '\t')?;
    data.labels_table()?.write(&labels_path, '\t')?;

    info!(
        "Wrote {} samples x {} genes to {} and {}",
        data.dataset.n_samples(),
        data.dataset.n_features(),
        expression_path.display(),
        labels_path.display()
    );
    Ok((expression_path, labels_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small() -> DemoConfig {
        DemoConfig {
            n_samples: 40,
            n_features: 30,
            n_informative: 5,
            seed: 7,
            shift: 2.0,
        }
    }

    #[test]
    fn test_labels_split_in_half() {
        let data = generate_demo_data(&small()).unwrap();
        assert_eq!(data.dataset.class_counts(), (20, 20));
        assert_eq!(data.dataset.labels[19], 0.0);
        assert_eq!(data.dataset.labels[20], 1.0);

        let odd = DemoConfig { n_samples: 5, ..small() };
        let data = generate_demo_data(&odd).unwrap();
        assert_eq!(data.dataset.class_counts(), (2, 3));
    }

    #[test]
    fn test_shift_only_on_informative_positive_block() {
        let config = small();
        let shifted = generate_demo_data(&config).unwrap().dataset.features;
        let plain = generate_demo_data(&DemoConfig { shift: 0.0, ..config.clone() })
            .unwrap()
            .dataset
            .features;

        for i in 0..config.n_samples {
            for j in 0..config.n_features {
                let expected = if i >= 20 && j < 5 { 2.0 } else { 0.0 };
                assert_abs_diff_eq!(shifted[(i, j)] - plain[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = generate_demo_data(&small()).unwrap();
        let b = generate_demo_data(&small()).unwrap();
        assert_eq!(a.dataset.features, b.dataset.features);

        let c = generate_demo_data(&DemoConfig { seed: 8, ..small() }).unwrap();
        assert_ne!(a.dataset.features, c.dataset.features);
    }

    #[test]
    fn test_names_and_tables() {
        let data = generate_demo_data(&small()).unwrap();
        let expression = data.expression_table().unwrap();
        assert_eq!(expression.index_name, "Sample");
        assert_eq!(expression.columns[0], "Gene_1");
        assert_eq!(expression.index[39], "S40");

        let labels = data.labels_table().unwrap();
        assert_eq!(labels.columns, vec!["Disease"]);
        assert_eq!(labels.rows[0], vec!["0"]);
        assert_eq!(labels.rows[39], vec!["1"]);
    }

    #[test]
    fn test_invalid_config() {
        assert!(generate_demo_data(&DemoConfig { n_samples: 1, ..small() }).is_err());
        assert!(generate_demo_data(&DemoConfig { n_informative: 31, ..small() }).is_err());
    }

    #[test]
    fn test_written_tables_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let data = generate_demo_data(&small()).unwrap();
        let (expression, labels) = write_demo_data(&data, dir.path()).unwrap();

        let features = Table::read(&expression, '\t').unwrap();
        let labels = Table::read(&labels, '\t').unwrap();
        let aligned = Dataset::align(&features, &labels, LABEL_COLUMN).unwrap();
        assert_eq!(aligned.features, data.dataset.features);
        assert_eq!(aligned.labels, data.dataset.labels);
    }
}
