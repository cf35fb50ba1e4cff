// 🗺️ Map Asset Resolver
// Maps a (category, aggregation) pair to one of four pre-built HTML maps.
// The maps themselves are opaque files; this module only resolves and checks them.

use crate::error::DashboardError;
use crate::model::{AggregationMode, Category};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Closed 4-entry table of map files, one per selector pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTable {
    pub acute_by_county: String,
    pub pac_by_county: String,
    pub acute_by_region: String,
    pub pac_by_region: String,
}

impl Default for AssetTable {
    fn default() -> Self {
        AssetTable {
            acute_by_county: "maryland_acute_hospitals_counties.html".to_string(),
            pac_by_county: "maryland_pac_hospitals_counties.html".to_string(),
            acute_by_region: "maryland_beds_interactive_map.html".to_string(),
            pac_by_region: "maryland_pac_beds_interactive_map.html".to_string(),
        }
    }
}

/// Result of a key lookup in the asset table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetLookup {
    Found { file: String },
    NotFound,
}

/// Result of checking a resolved asset on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Available { file: String, path: PathBuf },
    /// `file` is `None` when the table has no entry for the key at all
    Missing {
        file: Option<String>,
        available: Vec<String>,
    },
}

impl AssetStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, AssetStatus::Available { .. })
    }

    /// Convert to a result for callers that cannot continue without the map
    pub fn into_result(self) -> Result<PathBuf, DashboardError> {
        match self {
            AssetStatus::Available { path, .. } => Ok(path),
            AssetStatus::Missing { file, available } => Err(DashboardError::AssetMissing {
                file: file.unwrap_or_else(|| "<unmapped>".to_string()),
                available,
            }),
        }
    }
}

impl AssetTable {
    /// File name for a selector pair, `None` when the entry is blank
    pub fn file_for(&self, category: Category, aggregation: AggregationMode) -> Option<&str> {
        let file = match (category, aggregation) {
            (Category::Acute, AggregationMode::ByCounty) => &self.acute_by_county,
            (Category::PostAcuteCare, AggregationMode::ByCounty) => &self.pac_by_county,
            (Category::Acute, AggregationMode::ByRegion) => &self.acute_by_region,
            (Category::PostAcuteCare, AggregationMode::ByRegion) => &self.pac_by_region,
        };
        let file = file.trim();
        if file.is_empty() {
            None
        } else {
            Some(file)
        }
    }

    pub fn resolve(&self, category: Category, aggregation: AggregationMode) -> AssetLookup {
        match self.file_for(category, aggregation) {
            Some(file) => AssetLookup::Found {
                file: file.to_string(),
            },
            None => AssetLookup::NotFound,
        }
    }

    /// Resolve and check the file under `assets_dir`
    pub fn locate(
        &self,
        category: Category,
        aggregation: AggregationMode,
        assets_dir: &Path,
        filter: &str,
    ) -> AssetStatus {
        let file = match self.resolve(category, aggregation) {
            AssetLookup::Found { file } => file,
            AssetLookup::NotFound => {
                warn!(
                    category = category.code(),
                    aggregation = aggregation.code(),
                    "no map asset configured"
                );
                return AssetStatus::Missing {
                    file: None,
                    available: list_available(assets_dir, filter),
                };
            }
        };

        let path = assets_dir.join(&file);
        if path.is_file() {
            debug!(path = %path.display(), "map asset found");
            AssetStatus::Available { file, path }
        } else {
            warn!(path = %path.display(), "map asset missing");
            AssetStatus::Missing {
                file: Some(file),
                available: list_available(assets_dir, filter),
            }
        }
    }
}

/// HTML files in `dir` whose lowercase name contains `filter`, sorted.
/// An unreadable directory simply lists nothing.
pub fn list_available(dir: &Path, filter: &str) -> Vec<String> {
    let filter = filter.to_lowercase();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "cannot list assets directory");
            return Vec::new();
        }
    };

    let mut files: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            let lower = name.to_lowercase();
            lower.ends_with(".html") && lower.contains(&filter)
        })
        .collect();

    files.sort();
    files
}

// ============================================================================
// TESTS
// ============================================================================
