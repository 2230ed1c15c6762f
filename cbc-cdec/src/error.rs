/// Error types for CDEC observations and station selections
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdecError {
    /// Download failed after every retry and header fallback
    #[error("Network request for station {station} failed: {message}")]
    Network { station: String, message: String },

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// A required column is absent from the CSV header
    #[error("CSV is missing required column {0}")]
    MissingColumn(String),

    /// A populated VALUE cell is neither numeric nor a known missing marker
    #[error("Station {station}, line {line}: invalid value '{value}'")]
    InvalidValue {
        station: String,
        line: u64,
        value: String,
    },

    /// DATE TIME cell did not match "YYYYMMDD HHMM"
    #[error("Station {station}, line {line}: failed to parse date '{value}'")]
    DateParse {
        station: String,
        line: u64,
        value: String,
    },

    /// Station selection row is unusable
    #[error("Invalid station selection: {0}")]
    InvalidSelection(String),
}

/// Type alias for Results using CdecError
pub type Result<T> = std::result::Result<T, CdecError>;
