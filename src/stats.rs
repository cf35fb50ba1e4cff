// 📊 Statistics Resolver
// Summary figures for the selected facility category and aggregation.

use crate::loader::Dataset;
use crate::model::{AggregationMode, Category};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Distinct-county figure; only meaningful in the county view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Counties(usize),
    NotApplicable,
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coverage::Counties(n) => write!(f, "{}", n),
            Coverage::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Serialized as a number or the string "N/A"
impl Serialize for Coverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Coverage::Counties(n) => serializer.serialize_u64(*n as u64),
            Coverage::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub facility_count: usize,
    pub coverage: Coverage,
    pub total_beds: i64,
}

impl Stats {
    pub fn summary(&self) -> String {
        format!(
            "Facilities: {}, Counties: {}, Beds: {}",
            self.facility_count, self.coverage, self.total_beds
        )
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.collect::<HashSet<_>>().len()
}

/// Compute the summary figures for a selection
pub fn stats(category: Category, aggregation: AggregationMode, dataset: &Dataset) -> Stats {
    let (facility_count, counties, total_beds) = match category {
        Category::Acute => {
            let beds: f64 = dataset.acute.iter().filter_map(|r| r.beds).sum();
            (
                dataset.acute.len(),
                distinct(dataset.acute.iter().map(|r| r.county.as_str())),
                beds,
            )
        }
        Category::PostAcuteCare => {
            let beds: f64 = dataset.pac.iter().map(|r| r.physical_beds).sum();
            (
                dataset.pac.len(),
                distinct(dataset.pac.iter().map(|r| r.county.as_str())),
                beds,
            )
        }
    };

    let coverage = match aggregation {
        AggregationMode::ByCounty => Coverage::Counties(counties),
        AggregationMode::ByRegion => Coverage::NotApplicable,
    };

    Stats {
        facility_count,
        coverage,
        total_beds: total_beds as i64,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FacilityRecord, PacFacilityRecord};

    fn dataset() -> Dataset {
        Dataset::from_records(
            vec![
                FacilityRecord::new("Johns Hopkins", "Baltimore City", Some("III"), Some(10.0)),
                FacilityRecord::new("Mercy", "Baltimore City", Some("III"), Some(20.0)),
                FacilityRecord::new("Meritus", "Washington", Some("II"), None),
            ],
            vec![
                PacFacilityRecord::new("Genesis", "Baltimore", Some("III"), 120.5),
                PacFacilityRecord::new("Sinai Rehab", "Baltimore City", Some("III"), 0.0),
                PacFacilityRecord::new("Frederick PAC", "Frederick", Some("II"), 64.0),
                PacFacilityRecord::new("Laurel PAC", "Prince George's", Some("V"), 30.0),
            ],
        )
    }

    #[test]
    fn test_acute_by_region_example() {
        let s = stats(Category::Acute, AggregationMode::ByRegion, &dataset());
        assert_eq!(
            s,
            Stats {
                facility_count: 3,
                coverage: Coverage::NotApplicable,
                total_beds: 30,
            }
        );
    }

    #[test]
    fn test_facility_count_independent_of_aggregation() {
        let data = dataset();
        for aggregation in AggregationMode::ALL {
            assert_eq!(stats(Category::Acute, aggregation, &data).facility_count, 3);
            assert_eq!(stats(Category::PostAcuteCare, aggregation, &data).facility_count, 4);
        }
    }

    #[test]
    fn test_region_view_coverage_is_not_applicable() {
        let data = dataset();
        for category in Category::ALL {
            assert_eq!(
                stats(category, AggregationMode::ByRegion, &data).coverage,
                Coverage::NotApplicable
            );
        }
    }

    #[test]
    fn test_county_view_counts_distinct_counties() {
        let data = dataset();
        assert_eq!(
            stats(Category::Acute, AggregationMode::ByCounty, &data).coverage,
            Coverage::Counties(2)
        );
        assert_eq!(
            stats(Category::PostAcuteCare, AggregationMode::ByCounty, &data).coverage,
            Coverage::Counties(4)
        );
    }

    #[test]
    fn test_pac_total_beds_truncated() {
        let s = stats(Category::PostAcuteCare, AggregationMode::ByCounty, &dataset());
        assert_eq!(s.total_beds, 214);
    }

    #[test]
    fn test_empty_dataset() {
        let data = Dataset::from_records(Vec::new(), Vec::new());
        let s = stats(Category::Acute, AggregationMode::ByCounty, &data);
        assert_eq!(s.facility_count, 0);
        assert_eq!(s.coverage, Coverage::Counties(0));
        assert_eq!(s.total_beds, 0);
    }

    #[test]
    fn test_coverage_rendering() {
        assert_eq!(Coverage::NotApplicable.to_string(), "N/A");
        assert_eq!(Coverage::Counties(0).to_string(), "0");
        assert_eq!(
            serde_json::to_value(Coverage::NotApplicable).unwrap(),
            serde_json::json!("N/A")
        );
        assert_eq!(
            serde_json::to_value(Coverage::Counties(23)).unwrap(),
            serde_json::json!(23)
        );
    }
}
