/// Error types for the legacy model file readers and writers
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IwfmError {
    /// The structural signature that anchors a data block was not found
    #[error("{file}: expected a line containing {signature}")]
    Format { file: String, signature: String },

    /// A populated cell failed type conversion
    #[error("{file}, line {line}, column {column}: cannot read '{value}' ({reason})")]
    Parse {
        file: String,
        line: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// Caller supplied an unusable parameter (e.g. zero model layers)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read or write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using IwfmError
pub type Result<T> = std::result::Result<T, IwfmError>;
