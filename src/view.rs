// 👁️ View pipeline - one recomputation pass per selection
// Always resolves stats; then either the map asset (Map) or the table (Table).

use crate::assets::{AssetStatus, AssetTable};
use crate::loader::Dataset;
use crate::model::{DisplayMode, ViewRequest, EMS_REGION_COUNT, STATE_COUNTY_COUNT};
use crate::stats::{stats, Stats};
use crate::table::{project, TableView};
use serde::Serialize;
use std::path::Path;

/// Where the map assets live and how alternatives are listed
#[derive(Debug, Clone, Copy)]
pub struct AssetContext<'a> {
    pub table: &'a AssetTable,
    pub dir: &'a Path,
    pub filter: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewBody {
    Map { asset: AssetStatus },
    Table { table: TableView },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOutput {
    pub request: ViewRequest,
    pub stats: Stats,
    pub ems_regions: usize,
    pub state_counties: usize,
    pub body: ViewBody,
}

impl ViewOutput {
    pub fn table(&self) -> Option<&TableView> {
        match &self.body {
            ViewBody::Table { table } => Some(table),
            ViewBody::Map { .. } => None,
        }
    }

    pub fn asset(&self) -> Option<&AssetStatus> {
        match &self.body {
            ViewBody::Map { asset } => Some(asset),
            ViewBody::Table { .. } => None,
        }
    }
}

pub fn resolve_view(request: &ViewRequest, dataset: &Dataset, assets: AssetContext<'_>) -> ViewOutput {
    let summary = stats(request.category, request.aggregation, dataset);

    let body = match request.display {
        DisplayMode::Map => ViewBody::Map {
            asset: assets
                .table
                .locate(request.category, request.aggregation, assets.dir, assets.filter),
        },
        DisplayMode::Table => ViewBody::Table {
            table: project(request.category, request.aggregation, dataset),
        },
    };

    ViewOutput {
        request: *request,
        stats: summary,
        ems_regions: EMS_REGION_COUNT,
        state_counties: STATE_COUNTY_COUNT,
        body,
    }
}

// ============================================================================
// TESTS
// ============================================================================
