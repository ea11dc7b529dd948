use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::dataset::{Dataset, RowObjects, StoredDataset};
use crate::error::ApiError;
use crate::graph::{self, ChartOptions};
use crate::loader;
use crate::saving::{DatasetStore, FileStore};
use crate::summarize::{self, SAMPLE_LIMIT, Summarizer};
use crate::view::{self, AxisSelection, ChartType, ChartView, EmptyReason, PieSlice};

const NO_FILE: &str = "No file uploaded.";
const EMPTY_FILE: &str = "Excel file is empty or could not be parsed.";
const FILE_NOT_FOUND: &str = "File not found.";

/// Shared state handed to every handler
pub struct AppState {
    pub store: Arc<dyn DatasetStore>,
    pub summarizer: Summarizer,
}

impl AppState {
    pub fn new(store: Arc<dyn DatasetStore>, summarizer: Summarizer) -> Self {
        Self { store, summarizer }
    }
}

#[derive(Deserialize)]
struct ViewQuery {
    x: Option<String>,
    y: Option<String>,
    #[serde(rename = "type")]
    chart_type: Option<String>,
}

impl ViewQuery {
    /// Resolve the requested chart against a dataset, defaulting unset axes
    /// the same way a freshly loaded dashboard does
    fn resolve(self, dataset: &Dataset) -> Result<(AxisSelection, ChartType), ApiError> {
        let defaults = AxisSelection::default_for(dataset.headers());
        let axes = AxisSelection {
            x: self.x.unwrap_or(defaults.x),
            y: self.y.unwrap_or(defaults.y),
        };
        let chart_type = match self.chart_type {
            Some(raw) => raw.parse()?,
            None => ChartType::default(),
        };
        Ok((axes, chart_type))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewResponse<'a> {
    chart_type: ChartType,
    x: &'a str,
    y: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<RowObjects<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slices: Option<Vec<PieSlice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<EmptyReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Build the application router
///
/// # Routes
/// * `POST /api/upload` - Parse and persist an uploaded workbook
/// * `POST /api/summarize` - Summarize a row sample with the AI service
/// * `GET /api/files/{id}` - Fetch a persisted record
/// * `GET /api/files/{id}/view` - Derived chart series as JSON
/// * `GET /api/files/{id}/chart` - Chart rendered as a PNG download
/// * `POST /api/files/{id}/summary` - Summarize the first rows of a record
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route(
            "/api/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/summarize", post(summarize_sample))
        .route("/api/files/:id", get(get_file))
        .route("/api/files/:id/view", get(get_view))
        .route("/api/files/:id/chart", get(get_chart))
        .route("/api/files/:id/summary", post(summarize_file))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(&config.data_dir)?;
    log::info!("Storing uploads under {}", config.data_dir.display());

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Summarizer::from_config(&config),
    ));
    let app = router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<StoredDataset>), ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::BadRequest(NO_FILE.to_string()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload.filter(|(_, bytes)| !bytes.is_empty()) else {
        return Err(ApiError::BadRequest(NO_FILE.to_string()));
    };

    let store = Arc::clone(&state.store);
    let record = tokio::task::spawn_blocking(move || -> Result<StoredDataset, ApiError> {
        // Content the reader cannot open counts as an empty upload
        let dataset = loader::parse_workbook(&file_name, &bytes).map_err(|e| {
            log::warn!("Could not parse upload {}: {}", file_name, e);
            ApiError::BadRequest(EMPTY_FILE.to_string())
        })?;
        if dataset.is_empty() {
            return Err(ApiError::BadRequest(EMPTY_FILE.to_string()));
        }
        Ok(store.insert(dataset)?)
    })
    .await??;

    log::info!(
        "Stored {} ({} rows, {} columns) as {}",
        record.dataset.file_name(),
        record.dataset.len(),
        record.dataset.headers().len(),
        record.id
    );

    Ok((StatusCode::CREATED, Json(record)))
}

async fn summarize_sample(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, ApiError> {
    let client = state.summarizer.client()?;
    let sample = summarize::sample_from_body(&body)?;

    let summary = client.summarize(&sample).await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn summarize_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let client = state.summarizer.client()?;
    let record = fetch_record(&state, id).await?;

    let sample = record.dataset.sample_objects(SAMPLE_LIMIT);
    if sample.is_empty() {
        return Err(summarize::SummarizeError::MissingSample.into());
    }

    let summary = client.summarize(&sample).await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredDataset>, ApiError> {
    Ok(Json(fetch_record(&state, id).await?))
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let record = fetch_record(&state, id).await?;
    let dataset = &record.dataset;
    let (axes, chart_type) = query.resolve(dataset)?;

    let mut response = ViewResponse {
        chart_type,
        x: &axes.x,
        y: &axes.y,
        status: "ok",
        rows: None,
        slices: None,
        reason: None,
        message: None,
    };
    match view::derive_view(dataset, &axes, chart_type) {
        ChartView::Rows(rows) => response.rows = Some(dataset.objects(rows)),
        ChartView::Pie(slices) => response.slices = Some(slices),
        ChartView::Empty(reason) => {
            response.status = "empty";
            response.reason = Some(reason);
            response.message = Some(reason.message());
        }
    }

    Ok(Json(response).into_response())
}

async fn get_chart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let record = fetch_record(&state, id).await?;
    let (axes, chart_type) = query.resolve(&record.dataset)?;
    let file_name = graph::export_file_name(record.dataset.file_name(), chart_type);

    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
        let dataset = &record.dataset;
        let options = ChartOptions {
            title: format!("{} by {}", axes.y, axes.x),
            ..ChartOptions::default()
        };
        let view = view::derive_view(dataset, &axes, chart_type);
        graph::render_png(dataset, &axes, chart_type, &view, &options).map_err(|e| e.to_string())
    })
    .await?
    .map_err(ApiError::Internal)?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                graph::content_disposition(&file_name),
            ),
        ],
        png,
    )
        .into_response())
}

/// Load a record off the async runtime, mapping unknown ids to 404
async fn fetch_record(state: &AppState, id: String) -> Result<StoredDataset, ApiError> {
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || store.get(&id))
        .await??
        .ok_or_else(|| ApiError::NotFound(FILE_NOT_FOUND.to_string()))
}
