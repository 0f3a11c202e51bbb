//! Axum REST API handlers

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
    extract::{State, Multipart, DefaultBodyLimit},
    extract::multipart::{MultipartError, MultipartRejection},
    http::{header, HeaderName, StatusCode},
    response::{Html, Json},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::AnalyzeError;
use crate::service::AnalyzeService;

use super::dto::*;
use super::format::build_analyze_response;

/// Name of the multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "file";

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Application state shared across handlers
pub struct AppState {
    pub service: Arc<AnalyzeService>,
    pub view_dir: PathBuf,
}

/// Create the REST API router
pub fn create_rest_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([HeaderName::from_static("x-requested-with"), header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .nest_service("/static", ServeDir::new(&server.static_dir))
        // Middleware
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Landing page
async fn index_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let path = state.view_dir.join("index.html");
    tokio::fs::read_to_string(&path).await.map(Html).map_err(|e| {
        warn!("Index page unavailable at {}: {}", path.display(), e);
        (StatusCode::NOT_FOUND, Json(ErrorResponse::new("index page not found", "NOT_FOUND")))
    })
}

/// Classify an uploaded image with every configured model
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let span = info_span!("analyze", request_id = %Uuid::new_v4());

    async move {
        let start = Instant::now();
        let mut multipart = multipart.map_err(|e| {
            (e.status(), Json(ErrorResponse::new(&e.body_text(), "MULTIPART_ERROR")))
        })?;

        let image_data = read_upload(&mut multipart).await?;
        info!(bytes = image_data.len(), "Analyze request received");

        let result = state.service.analyze(image_data).await.map_err(|e| {
            error!("Analysis failed: {}", e);
            analyze_error_response(&e)
        })?;

        let response = build_analyze_response(&result);
        info!(
            models = result.outcomes.len(),
            failed = result.failed_count(),
            inference_ms = result.inference_time_ms,
            total_ms = start.elapsed().as_millis() as u64,
            "Analyze response sent"
        );
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(span)
    .await
}

/// Read the first `file` field; other fields are ignored
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(multipart_error)?;
            return Ok(bytes.to_vec());
        }
    }

    Err((
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("Missing file field", "MISSING_FILE")),
    ))
}

/// Oversized bodies surface here as 413
fn multipart_error(err: MultipartError) -> ApiError {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "PAYLOAD_TOO_LARGE"
    } else {
        "MULTIPART_ERROR"
    };
    warn!("Rejected upload ({}): {}", status, err);
    (status, Json(ErrorResponse::new(&err.body_text(), code)))
}

fn analyze_error_response(err: &AnalyzeError) -> ApiError {
    let status = match err {
        AnalyzeError::Decode(_) => StatusCode::BAD_REQUEST,
        AnalyzeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&err.to_string(), err.code())))
}

/// Health check
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        healthy: health.healthy,
        version: health.version,
        models: health
            .models
            .into_iter()
            .map(|m| ModelInfoDto {
                id: m.id,
                name: m.name,
                architecture: m.architecture,
                image_size: m.image_size,
                classes: m.classes,
            })
            .collect(),
    })
}
