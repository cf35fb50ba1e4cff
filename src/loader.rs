// 📂 Dataset Loader - workbook → immutable record sets
// Reads the acute and PAC sheets, drops incomplete rows, coerces bed counts.
// Results are memoized per source version (SHA-256 of the workbook bytes).

use crate::config::SheetNames;
use crate::error::{DashboardError, Result};
use crate::model::{FacilityRecord, PacFacilityRecord};
use calamine::{Data, Range, Reader, Xlsx};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Acute sheet columns, matched by trimmed header name
pub const ACUTE_NAME: &str = "Hospital Name";
pub const ACUTE_COUNTY: &str = "County";
pub const ACUTE_REGION: &str = "Region";
pub const ACUTE_BEDS: &str = "Num Bed";

/// Positional schema applied to the PAC sheet
pub const PAC_COLUMNS: [&str; 4] = ["Facility Name", "County", "Region", "Sum Physical Beds"];

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub acute: Vec<FacilityRecord>,
    pub pac: Vec<PacFacilityRecord>,
    /// SHA-256 of the workbook bytes
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    pub dropped_acute: usize,
    pub dropped_pac: usize,
}

impl Dataset {
    /// Build from in-memory records (no workbook behind it)
    pub fn from_records(acute: Vec<FacilityRecord>, pac: Vec<PacFacilityRecord>) -> Self {
        Dataset {
            acute,
            pac,
            fingerprint: String::new(),
            loaded_at: Utc::now(),
            dropped_acute: 0,
            dropped_pac: 0,
        }
    }
}

/// Rows kept plus how many were discarded
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRecords<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

// ============================================================================
// CELL COERCION
// ============================================================================

/// Cell as trimmed text; empty, whitespace-only and error cells are missing
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cell as a number; numeric strings are accepted, anything else is unparseable
pub fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn cell_at(row: &[Data], idx: usize) -> &Data {
    static EMPTY: Data = Data::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

// ============================================================================
// SHEET PARSING
// ============================================================================

fn header_index(header: &[Data], column: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell_text(cell).map(|h| h == column).unwrap_or(false))
}

/// Parse the acute sheet; first row is the header
pub fn parse_acute_sheet(range: &Range<Data>, source: &Path) -> Result<SheetRecords<FacilityRecord>> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| DashboardError::unavailable(source, "acute sheet is empty"))?;

    let find = |column: &str| {
        header_index(header, column).ok_or_else(|| {
            DashboardError::unavailable(source, format!("acute sheet has no '{}' column", column))
        })
    };
    let name_idx = find(ACUTE_NAME)?;
    let county_idx = find(ACUTE_COUNTY)?;
    let region_idx = find(ACUTE_REGION)?;
    let beds_idx = find(ACUTE_BEDS)?;

    let mut records = Vec::new();
    let mut dropped = 0;

    for (line, row) in rows.enumerate() {
        let (name, county) = match (
            cell_text(cell_at(row, name_idx)),
            cell_text(cell_at(row, county_idx)),
        ) {
            (Some(name), Some(county)) => (name, county),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let raw_beds = cell_at(row, beds_idx);
        let beds = cell_number(raw_beds);
        if beds.is_none() {
            debug!(row = line + 2, hospital = %name, value = %raw_beds, "unparseable bed count");
        }

        records.push(FacilityRecord {
            name,
            county,
            region: cell_text(cell_at(row, region_idx)),
            beds,
        });
    }

    Ok(SheetRecords { records, dropped })
}

/// Parse the PAC sheet, renaming its first four columns positionally
pub fn parse_pac_sheet(range: &Range<Data>, source: &Path) -> Result<SheetRecords<PacFacilityRecord>> {
    let width = range.width();
    if width < PAC_COLUMNS.len() {
        return Err(DashboardError::unavailable(
            source,
            format!(
                "PAC sheet has {} columns, expected {} ({})",
                width,
                PAC_COLUMNS.len(),
                PAC_COLUMNS.join(", ")
            ),
        ));
    }
    if width > PAC_COLUMNS.len() {
        warn!(columns = width, "PAC sheet has extra columns, ignoring all but the first four");
    }

    let mut rows = range.rows();
    if rows.next().is_none() {
        return Err(DashboardError::unavailable(source, "PAC sheet is empty"));
    }

    let mut records = Vec::new();
    let mut dropped = 0;

    for (line, row) in rows.enumerate() {
        let (name, county) = match (cell_text(cell_at(row, 0)), cell_text(cell_at(row, 1))) {
            (Some(name), Some(county)) => (name, county),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let raw_beds = cell_at(row, 3);
        let physical_beds = cell_number(raw_beds).unwrap_or_else(|| {
            debug!(row = line + 2, facility = %name, value = %raw_beds, "bed count coerced to 0");
            0.0
        });

        records.push(PacFacilityRecord {
            name,
            county,
            region: cell_text(cell_at(row, 2)),
            physical_beds,
        });
    }

    Ok(SheetRecords { records, dropped })
}

// ============================================================================
// WORKBOOK LOADING
// ============================================================================

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn read_sheet(
    workbook: &mut Xlsx<Cursor<&[u8]>>,
    sheet: &str,
    source: &Path,
) -> Result<Range<Data>> {
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(DashboardError::unavailable(
            source,
            format!("sheet '{}' not found", sheet),
        ));
    }

    workbook
        .worksheet_range(sheet)
        .map_err(|e| DashboardError::unavailable(source, format!("cannot read sheet '{}': {}", sheet, e)))
}

/// Parse a workbook already read into memory
pub fn load_from_bytes(bytes: &[u8], sheets: &SheetNames, source: &Path) -> Result<Dataset> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| DashboardError::unavailable(source, format!("invalid workbook: {}", e)))?;

    let acute_range = read_sheet(&mut workbook, &sheets.acute, source)?;
    let pac_range = read_sheet(&mut workbook, &sheets.pac, source)?;

    let acute = parse_acute_sheet(&acute_range, source)?;
    let pac = parse_pac_sheet(&pac_range, source)?;

    info!(
        acute = acute.records.len(),
        pac = pac.records.len(),
        dropped_acute = acute.dropped,
        dropped_pac = pac.dropped,
        "hospital data loaded"
    );

    Ok(Dataset {
        acute: acute.records,
        pac: pac.records,
        fingerprint: fingerprint(bytes),
        loaded_at: Utc::now(),
        dropped_acute: acute.dropped,
        dropped_pac: pac.dropped,
    })
}

/// Read and parse the workbook at `path`
pub fn load_workbook(path: &Path, sheets: &SheetNames) -> Result<Dataset> {
    let bytes = fs::read(path)
        .map_err(|e| DashboardError::unavailable(path, format!("cannot read workbook: {}", e)))?;
    load_from_bytes(&bytes, sheets, path)
}

// ============================================================================
// CACHE
// ============================================================================

/// Parses raw workbook bytes into a dataset
pub type ParseFn = fn(&[u8], &SheetNames, &Path) -> Result<Dataset>;

/// Memoizes the dataset per source version.
/// Reads are cheap after the first load; a changed file is reparsed.
pub struct DatasetCache {
    path: PathBuf,
    sheets: SheetNames,
    parse: ParseFn,
    cached: Mutex<Option<(String, Arc<Dataset>)>>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>, sheets: SheetNames) -> Self {
        Self::with_parser(path, sheets, load_from_bytes)
    }

    pub fn with_parser(path: impl Into<PathBuf>, sheets: SheetNames, parse: ParseFn) -> Self {
        DatasetCache {
            path: path.into(),
            sheets,
            parse,
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current dataset, reloading only if the workbook bytes changed.
    /// A failed reload leaves the previous dataset cached but still returns the error.
    pub fn get(&self) -> Result<Arc<Dataset>> {
        let bytes = fs::read(&self.path).map_err(|e| {
            DashboardError::unavailable(&self.path, format!("cannot read workbook: {}", e))
        })?;
        let version = fingerprint(&bytes);

        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some((cached_version, dataset)) = cached.as_ref() {
            if *cached_version == version {
                debug!(fingerprint = %version, "dataset cache hit");
                return Ok(Arc::clone(dataset));
            }
            info!(path = %self.path.display(), "workbook changed, reloading");
        }

        let dataset = Arc::new((self.parse)(&bytes, &self.sheets, &self.path)?);
        *cached = Some((version, Arc::clone(&dataset)));
        Ok(dataset)
    }

    /// Last successfully loaded dataset without touching the file
    pub fn peek(&self) -> Option<Arc<Dataset>> {
        self.cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|(_, dataset)| Arc::clone(dataset))
    }
}

// ============================================================================
// TESTS
// ============================================================================
