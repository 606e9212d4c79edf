//! api.rs — Rutas HTTP: /health, /map/view, /map/markers(.csv), /summary(.csv), /kpis y /upload

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header::{CONTENT_DISPOSITION, CONTENT_TYPE}, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir};
use tracing::warn;

use crate::ingest;
use crate::models::types::{DataState, LatLng, MapView, TileLayer};
use crate::summary::FieldSummary;

#[derive(Clone)]
pub struct ApiState {
    pub data: Arc<RwLock<DataState>>,
}

pub fn router(state: ApiState, web_dir: &str, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/map/view", get(get_view))
        .route("/map/markers", get(get_markers_geojson))
        .route("/map/markers.csv", get(get_markers_csv))
        .route("/summary", get(get_summary))
        .route("/summary.csv", get(get_summary_csv))
        .route("/kpis", get(get_kpis))
        .route("/upload", post(upload))
        .fallback_service(ServeDir::new(web_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

/// Errores que llegan al host: multipart roto (400, 413 si excede el límite)
/// o CSV ilegible (422).
#[derive(Debug)]
pub enum ApiError {
    BadUpload(StatusCode, String),
    Unprocessable(anyhow::Error),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadUpload(status, m) => (status, m),
            ApiError::Unprocessable(e) => (StatusCode::UNPROCESSABLE_ENTITY, format!("{e:#}")),
            ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
        };
        warn!("{} {}", status, msg);
        (status, msg).into_response()
    }
}

#[derive(Serialize)]
struct ViewOut {
    center: LatLng,
    zoom: u8,
    tile_layer: TileLayer,
}

async fn get_view(State(state): State<ApiState>) -> Json<ViewOut> {
    let d = state.data.read().await;
    let MapView { center, zoom } = d.map.view();
    Json(ViewOut { center, zoom, tile_layer: d.map.tile_layer().clone() })
}

async fn get_markers_geojson(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let fc = state.data.read().await.map.to_geojson();
    let body = serde_json::to_string(&fc).map_err(|e| ApiError::Internal(e.into()))?;
    Ok(([(CONTENT_TYPE, "application/geo+json; charset=utf-8")], body).into_response())
}

async fn get_markers_csv(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let body = state.data.read().await.map.export_csv().map_err(ApiError::Internal)?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"markers.csv\""),
        ],
        body,
    )
        .into_response())
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadUpload(e.status(), e.body_text())
    }
}

async fn get_summary(State(state): State<ApiState>) -> Json<Option<FieldSummary>> {
    Json(state.data.read().await.summary.clone())
}

async fn get_summary_csv(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let body = match &state.data.read().await.summary {
        Some(s) => s.to_csv().map_err(ApiError::Internal)?,
        None => return Ok(StatusCode::NO_CONTENT.into_response()),
    };
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"combined_data.csv\""),
        ],
        body,
    )
        .into_response())
}

#[derive(Serialize)]
struct Kpis {
    markers: usize,
    uploads: usize,
    snapshot_ts_utc: String,
    centroid: Option<LatLng>,
}

async fn get_kpis(State(state): State<ApiState>) -> Json<Kpis> {
    let d = state.data.read().await;
    Json(Kpis {
        markers: d.map.markers().len(),
        uploads: d.uploads,
        snapshot_ts_utc: d.snapshot_ts_utc.clone(),
        centroid: d.map.markers_centroid(),
    })
}

#[derive(Serialize)]
struct UploadOut {
    placed: usize,
    markers: usize,
}

/// Campo `file`. Un input sin selección llega sin nombre de fichero y vacío.
async fn upload(State(state): State<ApiState>, mut mp: Multipart) -> Result<Response, ApiError> {
    let mut file: Option<Bytes> = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some("file") { continue; }
        let unnamed = field.file_name().map_or(true, str::is_empty);
        let raw = field.bytes().await?;
        if !(unnamed && raw.is_empty()) {
            file = Some(raw);
        }
        break;
    }

    let placed = ingest::on_file_selected(&state.data, file)
        .await
        .map_err(ApiError::Unprocessable)?;
    match placed {
        None => Ok(StatusCode::NO_CONTENT.into_response()),
        Some(placed) => {
            let markers = state.data.read().await.map.markers().len();
            Ok(Json(UploadOut { placed, markers }).into_response())
        }
    }
}
