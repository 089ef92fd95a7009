//! Principal component regression for expression-style tables.
//!
//! The crate is a small tabular-ML toolkit (`StandardScaler`, `PCA`,
//! `LogisticRegression`, stratified grid search, classification metrics)
//! wired into an end-to-end run that reads a sample × feature table and a
//! label table, picks the number of components and the regularization
//! strength by cross-validation, and reports which features drive the
//! retained components.
//!
//! ```rust
//! use expression_pcr::{PcrPipeline, PcrParams, Matrix, Vector};
//! use ndarray::array;
//!
//! let x: Matrix = array![
//!     [0.1, 1.0, 2.0],
//!     [0.2, 1.1, 2.2],
//!     [0.0, 0.9, 1.9],
//!     [2.1, 0.0, 0.1],
//!     [2.0, 0.2, 0.0],
//!     [2.2, 0.1, 0.2]
//! ];
//! let y: Vector = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
//!
//! let mut pipeline = PcrPipeline::new(PcrParams { n_components: 1, c: 1.0 });
//! pipeline.fit(&x, &y).unwrap();
//! let predictions = pipeline.predict(&x).unwrap();
//! assert_eq!(predictions, y);
//! ```

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod config;
pub mod dataset;
pub mod decomposition;
pub mod error;
pub mod generator;
pub mod linear_model;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod plot;
pub mod preprocessing;
pub mod report;
pub mod run;

pub use config::{DemoConfig, PcrConfig};
pub use dataset::{Dataset, Table};
pub use decomposition::PCA;
pub use error::{PcrError, Result};
pub use linear_model::LogisticRegression;
pub use model_selection::{GridSearch, GridSearchResult, ParamGrid, StratifiedKFold};
pub use pipeline::{PcrParams, PcrPipeline};
pub use preprocessing::StandardScaler;

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_types_work() {
        let vec = Vector::zeros(5);
        let mat = Matrix::zeros((3, 4));
        assert_eq!(vec.len(), 5);
        assert_eq!(mat.shape(), &[3, 4]);
    }
}
