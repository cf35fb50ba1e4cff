// 🏥 Facility records and view selectors
// Records are immutable after load; the selectors form the whole session state.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed number of EMS regions in the state
pub const EMS_REGION_COUNT: usize = 5;

/// Fixed number of counties shown in the region view
pub const STATE_COUNTY_COUNT: usize = 23;

// ============================================================================
// RECORDS
// ============================================================================

/// Acute care hospital (one row of the "Acute Hospitals" sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub name: String,
    pub county: String,
    pub region: Option<String>,
    /// Raw "Num Bed" value; `None` when the cell could not be parsed
    pub beds: Option<f64>,
}

impl FacilityRecord {
    pub fn new(name: &str, county: &str, region: Option<&str>, beds: Option<f64>) -> Self {
        FacilityRecord {
            name: name.to_string(),
            county: county.to_string(),
            region: region.map(str::to_string),
            beds,
        }
    }
}

/// Post-acute care facility (one row of the "PAC Hospitals" sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacFacilityRecord {
    pub name: String,
    pub county: String,
    pub region: Option<String>,
    /// "Sum Physical Beds", already coerced to 0 when unparseable
    pub physical_beds: f64,
}

impl PacFacilityRecord {
    pub fn new(name: &str, county: &str, region: Option<&str>, physical_beds: f64) -> Self {
        PacFacilityRecord {
            name: name.to_string(),
            county: county.to_string(),
            region: region.map(str::to_string),
            physical_beds,
        }
    }
}

// ============================================================================
// SELECTORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Acute,
    PostAcuteCare,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Acute, Category::PostAcuteCare];

    /// Human-readable name for display
    pub fn label(&self) -> &'static str {
        match self {
            Category::Acute => "Acute Care Hospitals",
            Category::PostAcuteCare => "Post-Acute Care (PAC)",
        }
    }

    /// Short code used in URLs and CLI flags
    pub fn code(&self) -> &'static str {
        match self {
            Category::Acute => "acute",
            Category::PostAcuteCare => "pac",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Category::Acute => Category::PostAcuteCare,
            Category::PostAcuteCare => Category::Acute,
        }
    }
}

impl FromStr for Category {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "acute" | "acute-care" | "acute-care-hospitals" => Ok(Category::Acute),
            "pac" | "post-acute" | "post-acute-care" | "post-acute-care-pac" | "postacutecare" => {
                Ok(Category::PostAcuteCare)
            }
            _ => Err(DashboardError::InvalidSelector {
                kind: "category",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    ByRegion,
    ByCounty,
}

impl AggregationMode {
    pub const ALL: [AggregationMode; 2] = [AggregationMode::ByRegion, AggregationMode::ByCounty];

    pub fn label(&self) -> &'static str {
        match self {
            AggregationMode::ByRegion => "By Region",
            AggregationMode::ByCounty => "By County",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AggregationMode::ByRegion => "region",
            AggregationMode::ByCounty => "county",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            AggregationMode::ByRegion => AggregationMode::ByCounty,
            AggregationMode::ByCounty => AggregationMode::ByRegion,
        }
    }
}

impl FromStr for AggregationMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "region" | "by-region" | "byregion" => Ok(AggregationMode::ByRegion),
            "county" | "by-county" | "bycounty" => Ok(AggregationMode::ByCounty),
            _ => Err(DashboardError::InvalidSelector {
                kind: "aggregation",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Map,
    Table,
}

impl DisplayMode {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Map => "Map View",
            DisplayMode::Table => "Data View",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            DisplayMode::Map => DisplayMode::Table,
            DisplayMode::Table => DisplayMode::Map,
        }
    }
}

impl FromStr for DisplayMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "map" | "map-view" => Ok(DisplayMode::Map),
            "table" | "data" | "data-view" => Ok(DisplayMode::Table),
            _ => Err(DashboardError::InvalidSelector {
                kind: "display mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Lowercase, spaces/underscores to dashes, parentheses dropped
fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect()
}

// ============================================================================
// VIEW REQUEST
// ============================================================================

/// The full selection driving one recomputation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub category: Category,
    pub aggregation: AggregationMode,
    pub display: DisplayMode,
}

impl ViewRequest {
    pub fn new(category: Category, aggregation: AggregationMode, display: DisplayMode) -> Self {
        ViewRequest {
            category,
            aggregation,
            display,
        }
    }

    pub fn with_category(self, category: Category) -> Self {
        ViewRequest { category, ..self }
    }

    pub fn with_aggregation(self, aggregation: AggregationMode) -> Self {
        ViewRequest { aggregation, ..self }
    }

    pub fn with_display(self, display: DisplayMode) -> Self {
        ViewRequest { display, ..self }
    }
}

/// Matches the dashboard's initial selection
impl Default for ViewRequest {
    fn default() -> Self {
        ViewRequest::new(Category::Acute, AggregationMode::ByRegion, DisplayMode::Map)
    }
}

impl fmt::Display for ViewRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.category.label(),
            self.aggregation.label(),
            self.display.label()
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
