// 📋 Table Projector
// Shapes the record sets for tabular display. The schema depends on the selector pair:
//
//   Acute / ByCounty  → Hospital Name, County, Region, Beds        (per facility)
//   Acute / ByRegion  → Hospital Name, Region, Beds                (per facility)
//   PAC   / ByCounty  → Hospital Name, County, Region, Beds        (per facility)
//   PAC   / ByRegion  → Region, Number of Facilities, Total Beds   (rollup)

use crate::loader::Dataset;
use crate::model::{AggregationMode, Category, FacilityRecord, PacFacilityRecord};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Bed value written for an acute listing row whose count could not be parsed
pub const UNPARSEABLE_BEDS: i64 = -1;

// ============================================================================
// CELLS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl Cell {
    fn text(value: &str) -> Self {
        Cell::Text(value.to_string())
    }

    fn optional(value: Option<&str>) -> Self {
        value.map(Cell::text).unwrap_or(Cell::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Empty => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(v) => serializer.serialize_f64(*v),
            Cell::Empty => serializer.serialize_none(),
        }
    }
}

/// Numbers first (numerically), then text (case-insensitive), empty cells last
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Empty, Cell::Empty) => Ordering::Equal,
        (Cell::Empty, _) => Ordering::Greater,
        (_, Cell::Empty) => Ordering::Less,
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.to_string().to_lowercase().cmp(&b.to_string().to_lowercase()),
        },
    }
}

// ============================================================================
// TABLE SHAPES
// ============================================================================

/// One variant per selector pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableShape {
    AcuteCountyListing,
    AcuteRegionListing,
    PacCountyListing,
    PacRegionRollup,
}

impl TableShape {
    pub fn for_selection(category: Category, aggregation: AggregationMode) -> Self {
        match (category, aggregation) {
            (Category::Acute, AggregationMode::ByCounty) => TableShape::AcuteCountyListing,
            (Category::Acute, AggregationMode::ByRegion) => TableShape::AcuteRegionListing,
            (Category::PostAcuteCare, AggregationMode::ByCounty) => TableShape::PacCountyListing,
            (Category::PostAcuteCare, AggregationMode::ByRegion) => TableShape::PacRegionRollup,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableShape::AcuteCountyListing | TableShape::PacCountyListing => {
                &["Hospital Name", "County", "Region", "Beds"]
            }
            TableShape::AcuteRegionListing => &["Hospital Name", "Region", "Beds"],
            TableShape::PacRegionRollup => &["Region", "Number of Facilities", "Total Beds"],
        }
    }

    pub fn is_rollup(&self) -> bool {
        matches!(self, TableShape::PacRegionRollup)
    }
}

fn listing_beds(beds: Option<f64>) -> Cell {
    Cell::Int(beds.map(|b| b as i64).unwrap_or(UNPARSEABLE_BEDS))
}

fn acute_county_row(r: &FacilityRecord) -> Vec<Cell> {
    vec![
        Cell::text(&r.name),
        Cell::text(&r.county),
        Cell::optional(r.region.as_deref()),
        listing_beds(r.beds),
    ]
}

fn acute_region_row(r: &FacilityRecord) -> Vec<Cell> {
    vec![
        Cell::text(&r.name),
        Cell::optional(r.region.as_deref()),
        listing_beds(r.beds),
    ]
}

fn pac_county_row(r: &PacFacilityRecord) -> Vec<Cell> {
    vec![
        Cell::text(&r.name),
        Cell::text(&r.county),
        Cell::optional(r.region.as_deref()),
        Cell::Float(r.physical_beds),
    ]
}

/// Group by region in first-appearance order; facilities without a region form no group
fn pac_region_rollup(records: &[PacFacilityRecord]) -> Vec<Vec<Cell>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (i64, f64)> = HashMap::new();

    for r in records {
        let Some(region) = r.region.as_deref() else {
            continue;
        };
        let entry = groups.entry(region).or_insert_with(|| {
            order.push(region);
            (0, 0.0)
        });
        entry.0 += 1;
        entry.1 += r.physical_beds;
    }

    order
        .into_iter()
        .map(|region| {
            let (count, beds) = groups[region];
            vec![Cell::text(region), Cell::Int(count), Cell::Float(beds)]
        })
        .collect()
}

// ============================================================================
// TABLE VIEW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reverse(&self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub shape: TableShape,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableView {
    fn new(shape: TableShape, rows: Vec<Vec<Cell>>) -> Self {
        TableView {
            shape,
            columns: shape.columns().iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index by case-insensitive name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name.trim()))
    }

    /// Stable sort by one column; an out-of-range column leaves the order unchanged
    pub fn sorted_by(&self, column: usize, order: SortOrder) -> TableView {
        let mut sorted = self.clone();
        if column >= self.columns.len() {
            return sorted;
        }
        sorted.rows.sort_by(|a, b| {
            let ord = compare_cells(&a[column], &b[column]);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        sorted
    }

    /// Rows where any cell contains `query`, case-insensitively
    pub fn filtered(&self, query: &str) -> TableView {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        TableView {
            shape: self.shape,
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| {
                    row.iter()
                        .any(|cell| cell.to_string().to_lowercase().contains(&needle))
                })
                .cloned()
                .collect(),
        }
    }
}

/// Project the dataset into the table for a selector pair
pub fn project(category: Category, aggregation: AggregationMode, dataset: &Dataset) -> TableView {
    let shape = TableShape::for_selection(category, aggregation);
    let rows = match shape {
        TableShape::AcuteCountyListing => dataset.acute.iter().map(acute_county_row).collect(),
        TableShape::AcuteRegionListing => dataset.acute.iter().map(acute_region_row).collect(),
        TableShape::PacCountyListing => dataset.pac.iter().map(pac_county_row).collect(),
        TableShape::PacRegionRollup => pac_region_rollup(&dataset.pac),
    };
    TableView::new(shape, rows)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_records(
            vec![
                FacilityRecord::new("Johns Hopkins", "Baltimore City", Some("III"), Some(10.0)),
                FacilityRecord::new("Mercy", "Baltimore City", Some("III"), Some(20.9)),
                FacilityRecord::new("Meritus", "Washington", Some("II"), None),
            ],
            vec![
                PacFacilityRecord::new("Western PAC", "Allegany", Some("V"), 40.0),
                PacFacilityRecord::new("Genesis", "Baltimore", Some("III"), 120.0),
                PacFacilityRecord::new("Frederick PAC", "Frederick", Some("II"), 64.0),
                PacFacilityRecord::new("Sinai Rehab", "Baltimore City", Some("III"), 0.0),
                PacFacilityRecord::new("Unassigned", "Howard", None, 12.0),
                PacFacilityRecord::new("Cumberland PAC", "Allegany", Some("V"), 15.5),
            ],
        )
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_shape_per_selection() {
        assert_eq!(
            TableShape::for_selection(Category::Acute, AggregationMode::ByCounty),
            TableShape::AcuteCountyListing
        );
        assert_eq!(
            TableShape::for_selection(Category::Acute, AggregationMode::ByRegion),
            TableShape::AcuteRegionListing
        );
        assert_eq!(
            TableShape::for_selection(Category::PostAcuteCare, AggregationMode::ByCounty),
            TableShape::PacCountyListing
        );
        assert!(TableShape::for_selection(Category::PostAcuteCare, AggregationMode::ByRegion).is_rollup());
        assert!(!TableShape::AcuteRegionListing.is_rollup());
    }

    #[test]
    fn test_acute_county_listing() {
        let table = project(Category::Acute, AggregationMode::ByCounty, &dataset());

        assert_eq!(table.columns, vec!["Hospital Name", "County", "Region", "Beds"]);
        assert_eq!(
            table.rows,
            vec![
                vec![text("Johns Hopkins"), text("Baltimore City"), text("III"), Cell::Int(10)],
                vec![text("Mercy"), text("Baltimore City"), text("III"), Cell::Int(20)],
                vec![text("Meritus"), text("Washington"), text("II"), Cell::Int(-1)],
            ]
        );
    }

    #[test]
    fn test_acute_region_listing_is_not_rolled_up() {
        let table = project(Category::Acute, AggregationMode::ByRegion, &dataset());

        assert_eq!(table.columns, vec!["Hospital Name", "Region", "Beds"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2], vec![text("Meritus"), text("II"), Cell::Int(UNPARSEABLE_BEDS)]);
    }

    #[test]
    fn test_pac_county_listing_keeps_input_order() {
        let data = dataset();
        let table = project(Category::PostAcuteCare, AggregationMode::ByCounty, &data);

        assert_eq!(table.columns, vec!["Hospital Name", "County", "Region", "Beds"]);
        assert_eq!(table.len(), data.pac.len());
        let names: Vec<String> = table.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(
            names,
            vec!["Western PAC", "Genesis", "Frederick PAC", "Sinai Rehab", "Unassigned", "Cumberland PAC"]
        );
        assert_eq!(table.rows[3][3], Cell::Float(0.0));
        assert_eq!(table.rows[4][2], Cell::Empty);
    }

    #[test]
    fn test_pac_region_rollup_first_appearance_order() {
        let table = project(Category::PostAcuteCare, AggregationMode::ByRegion, &dataset());

        assert_eq!(table.columns, vec!["Region", "Number of Facilities", "Total Beds"]);
        // V appears first in the sheet, so it leads even though II < III < V alphabetically
        assert_eq!(
            table.rows,
            vec![
                vec![text("V"), Cell::Int(2), Cell::Float(55.5)],
                vec![text("III"), Cell::Int(2), Cell::Float(120.0)],
                vec![text("II"), Cell::Int(1), Cell::Float(64.0)],
            ]
        );
    }

    #[test]
    fn test_rollup_counts_match_records() {
        let data = dataset();
        let table = project(Category::PostAcuteCare, AggregationMode::ByRegion, &data);

        for row in &table.rows {
            let region = row[0].to_string();
            let members: Vec<&PacFacilityRecord> = data
                .pac
                .iter()
                .filter(|r| r.region.as_deref() == Some(region.as_str()))
                .collect();
            assert_eq!(row[1], Cell::Int(members.len() as i64));
            assert_eq!(
                row[2],
                Cell::Float(members.iter().map(|r| r.physical_beds).sum())
            );
        }
    }

    #[test]
    fn test_sort_numeric_and_text() {
        let table = project(Category::Acute, AggregationMode::ByCounty, &dataset());

        let by_beds = table.sorted_by(3, SortOrder::Descending);
        let beds: Vec<Cell> = by_beds.rows.iter().map(|r| r[3].clone()).collect();
        assert_eq!(beds, vec![Cell::Int(20), Cell::Int(10), Cell::Int(-1)]);

        let by_name = table.sorted_by(0, SortOrder::Ascending);
        assert_eq!(by_name.rows[0][0], text("Johns Hopkins"));
        assert_eq!(by_name.rows[2][0], text("Meritus"));

        let unchanged = table.sorted_by(9, SortOrder::Ascending);
        assert_eq!(unchanged, table);
    }

    #[test]
    fn test_sort_is_stable_and_puts_empty_last() {
        let table = project(Category::PostAcuteCare, AggregationMode::ByCounty, &dataset());
        let by_region = table.sorted_by(2, SortOrder::Ascending);
        let names: Vec<String> = by_region.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(
            names,
            vec!["Frederick PAC", "Genesis", "Sinai Rehab", "Western PAC", "Cumberland PAC", "Unassigned"]
        );
    }

    #[test]
    fn test_filter_case_insensitive() {
        let table = project(Category::Acute, AggregationMode::ByCounty, &dataset());

        assert_eq!(table.filtered("baltimore").len(), 2);
        assert_eq!(table.filtered("MERITUS").len(), 1);
        assert_eq!(table.filtered("  ").len(), 3);
        assert!(table.filtered("virginia").is_empty());
    }

    #[test]
    fn test_column_index() {
        let table = project(Category::PostAcuteCare, AggregationMode::ByRegion, &dataset());
        assert_eq!(table.column_index("total beds"), Some(2));
        assert_eq!(table.column_index("County"), None);
    }

    #[test]
    fn test_cells_serialize_as_plain_json() {
        let row = vec![text("III"), Cell::Int(-1), Cell::Float(1.5), Cell::Empty];
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!(["III", -1, 1.5, null])
        );
    }
}
