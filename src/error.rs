use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),

    #[error("required column not found: {0}")]
    MissingColumn(String),

    #[error("empty data: {0}")]
    EmptyData(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("row length mismatch: expected {expected}, found {found}")]
    InconsistentRowCount { expected: usize, found: usize },

    #[error("computation failed: {0}")]
    ComputationError(String),

    #[error("no dataset has been uploaded; upload a dataset first")]
    NoDataset,

    #[error("model fit failed for product {product}: {reason}")]
    ModelFit { product: String, reason: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
