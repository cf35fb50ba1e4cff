// ⚠️ Error taxonomy for the capacity dashboard
// Load-time failures stop a render pass; per-field anomalies never reach here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Workbook missing, unreadable, or missing a required sheet/column
    #[error("hospital data unavailable from {path:?}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    /// A resolved map asset has no file behind it
    #[error("map asset not found: {file}")]
    AssetMissing { file: String, available: Vec<String> },

    /// A selector string that doesn't name a category/aggregation/display mode
    #[error("unknown {kind} '{value}'")]
    InvalidSelector { kind: &'static str, value: String },

    #[error("invalid configuration in {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DashboardError::DataUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that must stop rendering entirely
    pub fn is_hard_stop(&self) -> bool {
        matches!(self, DashboardError::DataUnavailable { .. })
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        DashboardError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

// ============================================================================
// TESTS
// ============================================================================
