// ⚙️ Dashboard configuration
// Optional TOML file; every field has a default so an empty file is valid.

use crate::assets::AssetTable;
use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Source workbook holding both facility sheets
    pub workbook: PathBuf,

    /// Directory holding the pre-built map HTML files
    pub assets_dir: PathBuf,

    /// Where CSV exports are written
    pub export_dir: PathBuf,

    /// First segment of export filenames
    pub export_prefix: String,

    /// Substring an HTML file must contain to be listed as an available map
    pub asset_filter: String,

    /// Server bind address
    pub bind: String,

    pub sheets: SheetNames,

    pub maps: AssetTable,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            workbook: PathBuf::from("MIEMSS.xlsx"),
            assets_dir: PathBuf::from("."),
            export_dir: PathBuf::from("."),
            export_prefix: "maryland".to_string(),
            asset_filter: "maryland".to_string(),
            bind: "0.0.0.0:3000".to_string(),
            sheets: SheetNames::default(),
            maps: AssetTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub acute: String,
    pub pac: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            acute: "Acute Hospitals".to_string(),
            pac: "PAC Hospitals".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from a TOML file; relative paths resolve against the file's directory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DashboardError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            DashboardError::Config { reason, .. } => DashboardError::Config {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DashboardError::Config {
            path: PathBuf::new(),
            reason: e.to_string(),
        })
    }

    /// Config file if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.workbook, &mut self.assets_dir, &mut self.export_dir] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AggregationMode, Category};

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.workbook, PathBuf::from("MIEMSS.xlsx"));
        assert_eq!(config.sheets.acute, "Acute Hospitals");
        assert_eq!(config.sheets.pac, "PAC Hospitals");
        assert_eq!(config.export_prefix, "maryland");
        assert_eq!(
            config.maps.file_for(Category::Acute, AggregationMode::ByRegion),
            Some("maryland_beds_interactive_map.html")
        );
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = DashboardConfig::from_toml_str(
            r#"
            workbook = "data/capacity.xlsx"
            bind = "127.0.0.1:8080"

            [sheets]
            pac = "PAC"

            [maps]
            pac_by_region = "pac_regions.html"
            "#,
        )
        .unwrap();

        assert_eq!(config.workbook, PathBuf::from("data/capacity.xlsx"));
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.sheets.acute, "Acute Hospitals");
        assert_eq!(config.sheets.pac, "PAC");
        assert_eq!(
            config.maps.file_for(Category::PostAcuteCare, AggregationMode::ByRegion),
            Some("pac_regions.html")
        );
        assert_eq!(
            config.maps.file_for(Category::Acute, AggregationMode::ByCounty),
            Some("maryland_acute_hospitals_counties.html")
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = DashboardConfig::from_toml_str("workbook = [").unwrap_err();
        assert!(matches!(err, DashboardError::Config { .. }));
    }

    #[test]
    fn test_from_file_rebases_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        fs::write(&path, "workbook = \"MIEMSS.xlsx\"\nassets_dir = \"/srv/maps\"\n").unwrap();

        let config = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(config.workbook, dir.path().join("MIEMSS.xlsx"));
        assert_eq!(config.assets_dir, PathBuf::from("/srv/maps"));
        assert_eq!(config.export_dir, dir.path().join("."));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = DashboardConfig::load(Some(Path::new("/nonexistent/dashboard.toml"))).unwrap_err();
        assert!(matches!(err, DashboardError::Config { .. }));
    }
}
