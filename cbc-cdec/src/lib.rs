//! Reservoir observations from the California Data Exchange Center (CDEC).
//!
//! Holds the observation model, the operator's station selection contract
//! and, behind the `api` feature, the HTTP client used by the fetch step.

#[cfg(feature = "api")]
pub mod client;
pub mod error;
pub mod observation;
pub mod station;

pub use error::{CdecError, Result};
pub use observation::{Observation, SensorType};
pub use station::{Duration, StationSelection};
