//! Error types for Vivarium Flux

use thiserror::Error;

/// Errors that can occur while loading tables or computing series
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse table: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Row {row} has {found} readings, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} is missing subject '{subject}'")]
    SchemaMismatch { row: usize, subject: String },

    #[error("Row {row} has a non-numeric reading for subject '{subject}'")]
    NonNumericReading { row: usize, subject: String },

    #[error("Failed to load dataset {dataset}: {message}")]
    DatasetLoad { dataset: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Undefined value in {view} series at index {index}")]
    UndefinedValue { view: String, index: usize },

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
