use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Cutoff {cutoff} precedes the first time-series date {first}")]
    CutoffBeforeStart { cutoff: NaiveDate, first: NaiveDate },

    #[error("Failed to read node associations: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;
