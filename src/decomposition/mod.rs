//! Principal component analysis.
//!
//! `PCA` centers the data and eigen-decomposes either the covariance matrix
//! (more samples than features) or the Gram matrix (more features than
//! samples, the usual shape of expression data).
//!
//! # Examples
//!
//! ```rust
//! use expression_pcr::{PCA, Matrix};
//! use ndarray::array;
//!
//! let x: Matrix = array![
//!     [1.0, 2.0, 3.0],
//!     [4.0, 5.0, 6.5],
//!     [7.0, 8.5, 9.0],
//!     [2.0, 1.0, 0.0]
//! ];
//!
//! let mut pca = PCA::new().n_components(2);
//! let transformed = pca.fit_transform(&x).unwrap();
//! assert_eq!(transformed.shape(), &[4, 2]);
//!
//! // Loadings are feature x component
//! let loadings = pca.loadings().unwrap();
//! assert_eq!(loadings.shape(), &[3, 2]);
//! ```

mod pca;

pub use pca::PCA;
