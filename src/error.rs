//! Error types for the PCR toolkit.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading tables, fitting models, or writing reports.
#[derive(Error, Debug)]
pub enum PcrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path:?} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Column '{0}' not found in label table")]
    MissingColumn(String),

    #[error("{count} label sample(s) missing from the feature table (first: {first:?})")]
    MissingSamples { count: usize, first: Vec<String> },

    #[error("Labels must be 0 or 1 for binary classification, found {0}")]
    NonBinaryLabels(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("{0} not fitted. Call fit() first.")]
    NotFitted(&'static str),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Model serialization failed: {0}")]
    Serialization(String),

    #[error("Plot rendering failed: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, PcrError>;
