use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// Nothing usable survived filtering
    #[error("No usable observations for station {station}")]
    NoData { station: String },

    #[error("Station {station} mixes sensor types: {sensors}")]
    MixedSensors { station: String, sensors: String },

    #[error("Rating curve for {reservoir} has no points")]
    EmptyRatingCurve { reservoir: String },

    /// Two anchors share a storage but disagree on elevation
    #[error("Rating curve for {reservoir} has conflicting elevations at storage {storage}")]
    AmbiguousRatingCurve { reservoir: String, storage: f64 },

    #[error("Storage {storage} for {reservoir} is not a finite number")]
    NonFiniteStorage { reservoir: String, storage: f64 },
}

pub type Result<T> = std::result::Result<T, DataError>;
