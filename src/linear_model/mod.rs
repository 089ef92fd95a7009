//! Linear models for classification.
//!
//! `LogisticRegression` fits an L2-penalized binary classifier whose penalty
//! strength is controlled by the inverse regularization parameter `C`.
//!
//! # Examples
//!
//! ```rust
//! use expression_pcr::{LogisticRegression, Matrix, Vector};
//! use ndarray::array;
//!
//! let x: Matrix = array![[1.0], [2.0], [3.0], [4.0]];
//! let y: Vector = array![0.0, 0.0, 1.0, 1.0];
//!
//! let mut model = LogisticRegression::new().c(10.0);
//! model.fit(&x, &y).unwrap();
//! let predictions = model.predict(&x).unwrap();
//! let probabilities = model.predict_proba(&x).unwrap();
//! assert_eq!(predictions, y);
//! assert!(probabilities[3] > probabilities[0]);
//! ```

mod logistic_regression;

pub use logistic_regression::{validate_labels, LogisticRegression};
