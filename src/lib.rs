// Hospital Capacity Dashboard - Core Library
// Exposes the selector pipeline for use in the CLI, TUI, API server, and tests

pub mod assets;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod stats;
pub mod table;
pub mod view;

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use assets::{list_available, AssetLookup, AssetStatus, AssetTable};
pub use config::{DashboardConfig, SheetNames};
pub use error::{DashboardError, Result};
pub use export::{export_filename, parse_csv, to_csv, write_export, ParsedCsv};
pub use loader::{load_from_bytes, load_workbook, Dataset, DatasetCache};
pub use model::{
    AggregationMode, Category, DisplayMode, FacilityRecord, PacFacilityRecord, ViewRequest,
    EMS_REGION_COUNT, STATE_COUNTY_COUNT,
};
pub use stats::{stats, Coverage, Stats};
pub use table::{project, Cell, SortOrder, TableShape, TableView, UNPARSEABLE_BEDS};
pub use view::{resolve_view, AssetContext, ViewBody, ViewOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
