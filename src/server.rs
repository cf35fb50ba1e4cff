// 🌐 HTTP surface for the dashboard
// JSON API over the selector pipeline, CSV downloads, and the map assets as static files.

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::export::{export_filename, to_csv};
use crate::loader::{Dataset, DatasetCache};
use crate::model::{
    AggregationMode, Category, DisplayMode, ViewRequest, EMS_REGION_COUNT, STATE_COUNTY_COUNT,
};
use crate::stats::{stats, Stats};
use crate::table::{project, SortOrder, TableView};
use crate::view::{resolve_view, AssetContext, ViewOutput};
use crate::assets::AssetStatus;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub cache: Arc<DatasetCache>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let cache = DatasetCache::new(&config.workbook, config.sheets.clone());
        AppState {
            config: Arc::new(config),
            cache: Arc::new(cache),
        }
    }

    fn assets(&self) -> AssetContext<'_> {
        AssetContext {
            table: &self.config.maps,
            dir: &self.config.assets_dir,
            filter: &self.config.asset_filter,
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

/// Handler failures mapped onto HTTP status codes
pub struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DashboardError::InvalidSelector { .. } => StatusCode::BAD_REQUEST,
            DashboardError::DataUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::AssetMissing { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        let data = match &self.0 {
            DashboardError::AssetMissing { available, .. } => serde_json::json!({ "available": available }),
            _ => serde_json::Value::Null,
        };
        (status, Json(ApiResponse::err(data, self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Selector query parameters; every field falls back to the dashboard default
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    pub category: Option<String>,
    pub aggregation: Option<String>,
    pub display: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub desc: bool,
    pub search: Option<String>,
}

impl SelectionQuery {
    fn request(&self) -> crate::error::Result<ViewRequest> {
        let defaults = ViewRequest::default();
        let category = match &self.category {
            Some(c) => c.parse::<Category>()?,
            None => defaults.category,
        };
        let aggregation = match &self.aggregation {
            Some(a) => a.parse::<AggregationMode>()?,
            None => defaults.aggregation,
        };
        let display = match &self.display {
            Some(d) => d.parse::<DisplayMode>()?,
            None => defaults.display,
        };
        Ok(ViewRequest::new(category, aggregation, display))
    }

    /// Apply search then sort; an unknown sort column is ignored
    fn shape(&self, table: TableView) -> TableView {
        let table = match &self.search {
            Some(q) => table.filtered(q),
            None => table,
        };
        match self.sort.as_deref().and_then(|c| table.column_index(c)) {
            Some(idx) => {
                let order = if self.desc { SortOrder::Descending } else { SortOrder::Ascending };
                table.sorted_by(idx, order)
            }
            None => table,
        }
    }
}

fn dataset(state: &AppState) -> ApiResult<Arc<Dataset>> {
    Ok(state.cache.get()?)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: Stats,
    ems_regions: usize,
    state_counties: usize,
}

/// GET /api/stats - Quick stats for a selection
async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<ApiResponse<StatsResponse>>> {
    let request = query.request()?;
    let data = dataset(&state)?;
    Ok(Json(ApiResponse::ok(StatsResponse {
        stats: stats(request.category, request.aggregation, &data),
        ems_regions: EMS_REGION_COUNT,
        state_counties: STATE_COUNTY_COUNT,
    })))
}

/// GET /api/table - Projected table, optionally searched and sorted
async fn get_table(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<ApiResponse<TableView>>> {
    let request = query.request()?;
    let data = dataset(&state)?;
    let table = query.shape(project(request.category, request.aggregation, &data));
    Ok(Json(ApiResponse::ok(table)))
}

/// GET /api/view - Stats plus map status or table, depending on display mode
async fn get_view(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<ApiResponse<ViewOutput>>> {
    let request = query.request()?;
    let data = dataset(&state)?;
    Ok(Json(ApiResponse::ok(resolve_view(&request, &data, state.assets()))))
}

#[derive(Serialize)]
struct MapResponse {
    file: String,
    url: String,
}

/// GET /api/map - Resolve the map asset; 404 lists what is available
async fn get_map(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Json<ApiResponse<MapResponse>>> {
    let request = query.request()?;
    let assets = state.assets();
    let status = assets
        .table
        .locate(request.category, request.aggregation, assets.dir, assets.filter);

    match status {
        AssetStatus::Available { file, .. } => {
            let url = format!("/maps/{}", urlencoding::encode(&file));
            Ok(Json(ApiResponse::ok(MapResponse { file, url })))
        }
        AssetStatus::Missing { file, available } => Err(DashboardError::AssetMissing {
            file: file.unwrap_or_else(|| "<unmapped>".to_string()),
            available,
        }
        .into()),
    }
}

/// GET /api/export - Projected table as a CSV download
async fn get_export(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> ApiResult<Response> {
    let request = query.request()?;
    let data = dataset(&state)?;
    let table = project(request.category, request.aggregation, &data);
    let csv = to_csv(&table)?;
    let filename = export_filename(&state.config.export_prefix, request.category, request.aggregation);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}

/// GET / - Serve dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let maps = ServeDir::new(state.config.assets_dir.clone());

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/table", get(get_table))
        .route("/view", get(get_view))
        .route("/map", get(get_map))
        .route("/export", get(get_export))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/maps", maps)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::path::Path;
    use tower::ServiceExt;

    fn state_for(dir: &Path) -> AppState {
        AppState::new(DashboardConfig {
            workbook: dir.join("MIEMSS.xlsx"),
            assets_dir: dir.to_path_buf(),
            ..DashboardConfig::default()
        })
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(router(state_for(dir.path())), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["data"], "OK");
    }

    #[tokio::test]
    async fn test_missing_workbook_is_503() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(router(state_for(dir.path())), "/api/stats?category=pac").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let body = json(&body);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_unknown_selector_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(router(state_for(dir.path())), "/api/table?category=dental").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json(&body)["error"].as_str().unwrap().contains("dental"));
    }

    #[tokio::test]
    async fn test_map_found_and_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("maryland_pac_hospitals_counties.html"), "<h1>PAC</h1>").unwrap();
        let app = router(state_for(dir.path()));

        let (status, body) = call(app.clone(), "/api/map?category=pac&aggregation=county").await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["data"]["url"], "/maps/maryland_pac_hospitals_counties.html");

        let (status, body) = call(app, "/maps/maryland_pac_hospitals_counties.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>PAC</h1>");
    }

    #[tokio::test]
    async fn test_map_missing_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("maryland_pac_hospitals_counties.html"), "").unwrap();

        let (status, body) = call(router(state_for(dir.path())), "/api/map?category=acute&aggregation=region").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body = json(&body);
        assert_eq!(
            body["data"]["available"],
            serde_json::json!(["maryland_pac_hospitals_counties.html"])
        );
    }

    fn loaded_state(dir: &Path) -> AppState {
        std::fs::write(dir.join("MIEMSS.xlsx"), crate::fixtures::sample_workbook()).unwrap();
        state_for(dir)
    }

    #[tokio::test]
    async fn test_stats_with_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(loaded_state(dir.path()));

        let (status, body) = call(app.clone(), "/api/stats?category=acute&aggregation=region").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body)["data"],
            serde_json::json!({
                "facility_count": 3,
                "coverage": "N/A",
                "total_beds": 30,
                "ems_regions": 5,
                "state_counties": 23
            })
        );

        let (_, body) = call(app, "/api/stats?category=pac&aggregation=county").await;
        let body = json(&body);
        assert_eq!(body["data"]["facility_count"], 2);
        assert_eq!(body["data"]["coverage"], 2);
        assert_eq!(body["data"]["total_beds"], 9);
    }

    #[tokio::test]
    async fn test_table_sorted_and_searched() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(loaded_state(dir.path()));

        let (status, body) = call(
            app.clone(),
            "/api/table?category=acute&aggregation=county&sort=beds&desc=true",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        let data = &body["data"];
        assert_eq!(data["shape"], "acute_county_listing");
        assert_eq!(
            data["columns"],
            serde_json::json!(["Hospital Name", "County", "Region", "Beds"])
        );
        assert_eq!(
            data["rows"],
            serde_json::json!([["C", "Z", "3", 20], ["A", "X", "I", 10], ["B", "Y", "II", -1]])
        );

        let (_, body) = call(app, "/api/table?category=acute&aggregation=county&search=y").await;
        assert_eq!(
            json(&body)["data"]["rows"],
            serde_json::json!([["B", "Y", "II", -1]])
        );
    }

    #[tokio::test]
    async fn test_view_table_mode_carries_rollup() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(
            router(loaded_state(dir.path())),
            "/api/view?category=pac&aggregation=region&display=table",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body = json(&body);
        let data = &body["data"];
        assert_eq!(data["ems_regions"], 5);
        assert_eq!(data["state_counties"], 23);
        assert_eq!(data["stats"]["facility_count"], 2);
        assert_eq!(data["body"]["mode"], "table");

        let rows = data["body"]["table"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "V");
        assert_eq!(rows[0][1], 1);
        assert_eq!(rows[0][2].as_f64(), Some(9.0));
        assert_eq!(rows[1][0], "III");
        assert_eq!(rows[1][2].as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn test_export_is_csv_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(loaded_state(dir.path()))
            .oneshot(
                Request::builder()
                    .uri("/api/export?category=pac&aggregation=region")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"maryland_post-acute_care_pac_by_region.csv\""
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            "Region,Number of Facilities,Total Beds\nV,1,9\nIII,1,0\n"
        );
    }

    #[test]
    fn test_selection_query_defaults_and_shape() {
        let query = SelectionQuery::default();
        assert_eq!(query.request().unwrap(), ViewRequest::default());

        let query = SelectionQuery {
            category: Some("pac".to_string()),
            aggregation: Some("county".to_string()),
            display: Some("table".to_string()),
            sort: Some("Beds".to_string()),
            desc: true,
            search: None,
        };
        let request = query.request().unwrap();
        assert_eq!(request.category, Category::PostAcuteCare);
        assert_eq!(request.display, DisplayMode::Table);

        let data = Dataset::from_records(
            Vec::new(),
            vec![
                crate::model::PacFacilityRecord::new("Small", "Kent", Some("IV"), 10.0),
                crate::model::PacFacilityRecord::new("Large", "Howard", Some("III"), 300.0),
            ],
        );
        let table = query.shape(project(request.category, request.aggregation, &data));
        assert_eq!(table.rows[0][0].to_string(), "Large");
    }
}
