//! HTTP intake for the download pipeline.
//!
//! Routes:
//! - `POST /api/downloadmp3` — run the pipeline for `{ "resourceUrl": ... }`
//! - `GET  <public prefix>/*` — produced MP3 files
//! - `GET  /health`, `GET /metrics`, `GET /`

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::core::audit::AuditRecord;
use crate::core::error::{AppError, ErrorKind};
use crate::core::metrics;
use crate::download::pipeline::{Pipeline, PipelineRequest, PipelineSuccess};

/// Message returned with every successful conversion
pub const SUCCESS_MESSAGE: &str = "MP3 file created successfully";

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// URL prefix the output directory is served under
    pub public_prefix: String,
}

/// Body of `POST /api/downloadmp3`: `{ "resourceUrl": ... }`, with the
/// older `youtubeUrl` name still accepted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    pub resource_url: Option<String>,
}

impl DownloadRequest {
    const LOCATOR_FIELDS: [&'static str; 2] = ["resourceUrl", "youtubeUrl"];

    /// Reads the locator field from any JSON body. `null` counts as absent.
    /// Other non-string values are kept as their JSON text, which never
    /// validates, so they are rejected as an invalid locator.
    pub fn from_json(body: &Value) -> Self {
        let resource_url = Self::LOCATOR_FIELDS
            .iter()
            .find_map(|name| body.get(name))
            .filter(|value| !value.is_null())
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
        Self { resource_url }
    }
}

/// Successful response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub message: String,
    pub file: String,
    pub audit: AuditRecord,
    pub progress_log: Vec<String>,
}

impl From<PipelineSuccess> for DownloadResponse {
    fn from(success: PipelineSuccess) -> Self {
        let progress_log = success.progress_log();
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            file: success.artifact.public_path,
            audit: success.audit,
            progress_log,
        }
    }
}

/// Error response body. Only caller errors carry a precise message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.public_kind();
        let status = match kind {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error_kind: kind,
            message: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    let files = ServeDir::new(state.pipeline.store().output_dir());
    let router = Router::new()
        .route("/", get(root_handler))
        .route("/api/downloadmp3", post(download_mp3_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let router = if state.public_prefix == "/" {
        router.fallback_service(files)
    } else {
        router.nest_service(&state.public_prefix, files)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Start the web server and serve until the process is stopped.
pub async fn start_web_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let prefix = state.public_prefix.clone();
    let app = create_router(state);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  POST /api/downloadmp3  - Fetch and convert to MP3");
    log::info!("  GET  {}/*            - Produced files", prefix);
    log::info!("  GET  /health           - Health check");
    log::info!("  GET  /metrics          - Prometheus metrics");
    log::info!("  GET  /                 - Usage banner");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// POST /api/downloadmp3
async fn download_mp3_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let client_address = peer.ip().to_string();

    let request = match body {
        Ok(Json(value)) => DownloadRequest::from_json(&value),
        // No JSON content type: nothing was sent we could read the field from
        Err(JsonRejection::MissingJsonContentType(_)) => DownloadRequest::default(),
        Err(rejection) => {
            let audit = AuditRecord::capture(client_address, None);
            let error = AppError::InvalidBody(rejection.body_text());
            log::warn!("Rejected request from {}: {}", audit.client_address, error);
            metrics::record_pipeline_failure(error.kind());
            return error.into_response();
        }
    };

    let result = state
        .pipeline
        .run(PipelineRequest {
            locator: request.resource_url,
            client_address,
        })
        .await;

    match result {
        Ok(success) => (StatusCode::OK, Json(DownloadResponse::from(success))).into_response(),
        Err(failure) => {
            log::warn!("[{}] progress: {}", failure.request_id, failure.progress_summary());
            failure.error.into_response()
        }
    }
}

/// GET / — short usage banner.
async fn root_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        "doramp3: POST /api/downloadmp3 with {\"resourceUrl\": \"<video URL>\"}",
    )
}

/// GET /health — simple health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics — Prometheus text exposition format.
async fn metrics_handler() -> Response {
    match metrics::gather_text() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}
