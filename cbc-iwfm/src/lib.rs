//! Readers and writers for the groundwater model's legacy fixed-layout files.
//!
//! Each file kind is located through a declarative [`schema::BlockSchema`];
//! the per-file modules turn the located lines into typed rows.

pub mod error;
pub mod gw_main;
pub mod preprocessor;
pub mod rating_table;
pub mod schema;
pub mod spec_file;
pub mod stratigraphy;
pub mod timeseries;

pub use error::{IwfmError, Result};
pub use gw_main::{parse_gw_main, AquiferParameters};
pub use preprocessor::{parse_layer_elevations, parse_nodal_areas, LayerElevation, NodalArea, NodalAreaTable};
pub use rating_table::{parse_rating_table, RatingRow};
pub use spec_file::{BoundaryConditionRecord, SpecTable, SPEC_COLUMNS};
pub use stratigraphy::{parse_stratigraphy, StratigraphyRow};
pub use timeseries::{column_name, TimeSeriesRow, TimeSeriesTable};
