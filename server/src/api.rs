use crate::state::SharedState;
use axum::{
    Json, Router,
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use pipeline::{
    Column, Direction, ExportError, ExportFormat, FetchError, JobRecord, JobSource, SearchQuery,
    MAX_MAX_RESULTS, export, import_json, matching, within_dates,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API credentials not configured (set ADZUNA_APP_ID and ADZUNA_API_KEY)")]
    MissingCredentials,

    #[error("a fetch is already in progress")]
    FetchInProgress,

    #[error("failed to fetch jobs: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    BadRequest(String),

    #[error("no job link at index {0}")]
    NoLink(usize),

    #[error("export failed: {0}")]
    Export(#[source] ExportError),

    #[error("import failed: {0}")]
    Import(#[source] ExportError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
            Self::FetchInProgress => StatusCode::CONFLICT,
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoLink(_) => StatusCode::NOT_FOUND,
            Self::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Export(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchRequest {
    pub term: Option<String>,
    pub location: Option<String>,
    pub max_results: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub query: SearchQuery,
    /// Listings the provider returned, before the cap.
    pub fetched: usize,
    pub total: usize,
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub term: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobsParams {
    pub column: Option<String>,
    pub contains: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub total: usize,
    pub shown: usize,
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub column: String,
}

#[derive(Debug, Serialize)]
pub struct SortResponse {
    pub column: String,
    pub direction: Direction,
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub path: String,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub path: String,
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/fetch", post(fetch_handler))
        .route("/count", get(count_handler))
        .route("/jobs", get(jobs_handler).delete(clear_handler))
        .route("/jobs/sort", post(sort_handler))
        .route("/jobs/{index}/link", get(link_handler))
        .route("/stats", get(stats_handler))
        .route("/export", post(export_handler))
        .route("/import", post(import_handler))
        .with_state(state)
}

/// Handler for GET / (root)
async fn root_handler() -> &'static str {
    "🔍 Job Search API\n\nEndpoints:\n  POST   /fetch              - Fetch jobs {term, location, max_results}\n  GET    /count              - Total matches ?term=&location=\n  GET    /jobs               - Current jobs ?column=&contains=&from=&to=\n  POST   /jobs/sort          - Sort by column {column}; repeat to reverse\n  DELETE /jobs               - Clear results\n  GET    /jobs/{index}/link  - Job link for opening\n  GET    /stats              - Totals\n  POST   /export             - Save {path, format: json|csv}\n  POST   /import             - Load {path}\n"
}

/// Handler for POST /fetch. A failed fetch leaves the current jobs untouched.
async fn fetch_handler(
    State(state): State<SharedState>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<FetchResponse>, ApiError> {
    let credentials = state.credentials.clone().ok_or(ApiError::MissingCredentials)?;
    let gate = state
        .fetch_gate
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::FetchInProgress)?;

    let query = SearchQuery::build(
        request.term.as_deref(),
        request.location.as_deref(),
        request.max_results,
    );
    info!(term = query.term(), location = query.location(), "fetch requested");

    let config = state.fetcher.clone();
    let search_query = query.clone();
    let records = tokio::task::spawn_blocking(move || {
        let _in_flight = gate;
        JobSource::new(&config)?.search(&credentials, &search_query)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .inspect_err(|e| warn!(error = %e, "fetch failed; keeping current jobs"))?;

    let fetched = records.len();
    let jobs = state
        .aggregator
        .write()
        .ingest(records, query.max_results())
        .to_vec();

    Ok(Json(FetchResponse {
        query,
        fetched,
        total: jobs.len(),
        jobs,
    }))
}

/// Handler for GET /count?term=&location=
async fn count_handler(
    State(state): State<SharedState>,
    Query(params): Query<CountParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let credentials = state.credentials.clone().ok_or(ApiError::MissingCredentials)?;
    let gate = state
        .fetch_gate
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::FetchInProgress)?;

    let query = SearchQuery::build(params.term.as_deref(), params.location.as_deref(), None);
    let config = state.fetcher.clone();
    let count_query = query.clone();
    let count = tokio::task::spawn_blocking(move || {
        let _in_flight = gate;
        JobSource::new(&config)?.count(&credentials, &count_query)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(json!({
        "term": query.term(),
        "location": query.location(),
        "count": count,
    })))
}

/// Handler for GET /jobs. Filters never change the stored jobs.
async fn jobs_handler(
    State(state): State<SharedState>,
    Query(params): Query<JobsParams>,
) -> Result<Json<JobsResponse>, ApiError> {
    let column = params.column.as_deref().map(parse_column).transpose()?;

    let snapshot = state.aggregator.read().snapshot();
    let mut jobs = within_dates(&snapshot, params.from, params.to);
    if let Some(needle) = params.contains.as_deref() {
        jobs = matching(&jobs, column.unwrap_or(Column::Title), needle);
    }

    Ok(Json(JobsResponse {
        total: snapshot.len(),
        shown: jobs.len(),
        jobs,
    }))
}

/// Handler for POST /jobs/sort
async fn sort_handler(
    State(state): State<SharedState>,
    Json(request): Json<SortRequest>,
) -> Result<Json<SortResponse>, ApiError> {
    let column = parse_column(&request.column)?;

    let mut aggregator = state.aggregator.write();
    let direction = aggregator.sort_by(column);
    let jobs = aggregator.current().to_vec();

    Ok(Json(SortResponse {
        column: column.to_string(),
        direction,
        jobs,
    }))
}

/// Handler for DELETE /jobs
async fn clear_handler(State(state): State<SharedState>) -> StatusCode {
    state.aggregator.write().clear();
    info!("cleared all results");
    StatusCode::NO_CONTENT
}

/// Handler for GET /jobs/{index}/link
async fn link_handler(
    State(state): State<SharedState>,
    UrlPath(index): UrlPath<usize>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let link = state.aggregator.read().link(index).ok_or(ApiError::NoLink(index))?;
    Ok(Json(json!({ "index": index, "url": link.as_str() })))
}

/// Handler for GET /stats
async fn stats_handler(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let aggregator = state.aggregator.read();
    Json(json!({
        "total": aggregator.len(),
        "policy": format!("{:?}", aggregator.policy()),
    }))
}

/// Handler for POST /export
async fn export_handler(
    State(state): State<SharedState>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let format = match request.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>().map_err(ApiError::BadRequest)?,
        None => ExportFormat::Json,
    };
    let path = resolve_data_path(&state.data_dir, &request.path)?;
    let snapshot = state.aggregator.read().snapshot();
    let count = snapshot.len();

    let target = path.clone();
    tokio::task::spawn_blocking(move || {
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir)?;
        }
        export(&snapshot, &target, format)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(ApiError::Export)?;

    Ok(Json(json!({ "path": path.display().to_string(), "count": count })))
}

/// Handler for POST /import. The file replaces the current jobs.
async fn import_handler(
    State(state): State<SharedState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let path = resolve_data_path(&state.data_dir, &request.path)?;
    let records = tokio::task::spawn_blocking(move || import_json(&path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::Import)?;

    let total = state.aggregator.write().replace(records, MAX_MAX_RESULTS).len();
    Ok(Json(json!({ "total": total })))
}

fn parse_column(raw: &str) -> Result<Column, ApiError> {
    raw.parse().map_err(|e: pipeline::UnknownColumn| ApiError::BadRequest(e.to_string()))
}

/// Joins a client-supplied relative path onto the data directory, refusing
/// absolute paths and `..`.
fn resolve_data_path(data_dir: &Path, requested: &str) -> Result<PathBuf, ApiError> {
    let relative = Path::new(requested.trim());
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if requested.trim().is_empty() || !plain {
        return Err(ApiError::BadRequest(format!(
            "path must be relative to the data directory: {requested:?}"
        )));
    }
    Ok(data_dir.join(relative))
}
