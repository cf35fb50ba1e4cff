// 📥 CSV export of projected tables

use crate::error::{DashboardError, Result};
use crate::model::{AggregationMode, Category};
use crate::table::TableView;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Serialize a table as CSV: header row, then one record per row
pub fn to_csv(table: &TableView) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::Export(e.to_string()))
}

/// Lowercase, spaces to underscores, anything but [a-z0-9_-] dropped
fn slug(label: &str) -> String {
    label
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// e.g. `maryland_acute_care_hospitals_by_region.csv`
pub fn export_filename(prefix: &str, category: Category, aggregation: AggregationMode) -> String {
    let mut parts = Vec::new();
    let prefix = slug(prefix);
    if !prefix.is_empty() {
        parts.push(prefix);
    }
    parts.push(slug(category.label()));
    parts.push(slug(aggregation.label()));
    format!("{}.csv", parts.join("_"))
}

/// Write the table under `dir` and return the file path
pub fn write_export(
    dir: &Path,
    prefix: &str,
    category: Category,
    aggregation: AggregationMode,
    table: &TableView,
) -> Result<PathBuf> {
    let csv = to_csv(table)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(prefix, category, aggregation));
    fs::write(&path, csv)?;
    info!(path = %path.display(), rows = table.len(), "table exported");
    Ok(path)
}

/// Exported CSV read back as strings
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn parse_csv(content: &str) -> Result<ParsedCsv> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let columns = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(ParsedCsv { columns, rows })
}

// ============================================================================
// TESTS
// ============================================================================
