//! Merges new lake boundary conditions into an existing constrained-head
//! specification and its time-series table.

pub mod association;
pub mod error;
pub mod merger;
pub mod slots;
pub mod warning;

pub use association::{normalize_name, NodeAssociation};
pub use error::{MergeError, Result};
pub use merger::{merge, AddedReservoir, MergeConfig, MergeInput, MergeOutput, ReservoirData};
pub use slots::SlotPair;
pub use warning::{MergeWarning, UnmatchedReason};
