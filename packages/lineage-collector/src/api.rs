//! HTTP surface of the collector
//!
//! | Method | Path                        | Handler          |
//! |--------|-----------------------------|------------------|
//! | POST   | `/api/v1/lineage`           | `receive_event`  |
//! | GET    | `/api/v1/lineage/:run_id`   | `get_lineage`    |
//! | GET    | `/health`                   | `health`         |

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lineage_graph::{ErrorKind, LineageError, LineageService};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::ServerConfig;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: LineageService,
}

impl AppState {
    pub fn new(service: LineageService) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/lineage", post(receive_event))
        .route("/api/v1/lineage/:run_id", get(get_lineage))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body: `{"error": "...", "code": "..."}`
#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
    code: &'static str,
}

#[derive(Debug)]
pub struct ApiError(LineageError);

impl From<LineageError> for ApiError {
    fn from(err: LineageError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, code) = match err.kind {
            ErrorKind::MalformedEvent => (StatusCode::BAD_REQUEST, "MALFORMED_EVENT"),
            ErrorKind::StoreUnavailable | ErrorKind::Database => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            ErrorKind::Serialization | ErrorKind::MissingNode => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            error!(kind = %err.kind, error = %err, "request failed");
        } else {
            warn!(error = %err, "rejected event");
        }

        (
            status,
            Json(ApiErrorBody {
                error: err.to_string(),
                code,
            }),
        )
            .into_response()
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn receive_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    state.service.ingestion().ingest_json(&body).await?;
    Ok(Json(json!({"message": "Event processed successfully"})))
}

async fn get_lineage(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lineage = match state.service.query().lineage(&run_id).await? {
        Some(graph) => serde_json::to_value(graph).map_err(LineageError::from)?,
        None => json!({}),
    };
    Ok(Json(json!({ "lineage": lineage })))
}
