//! Replay trigger REST API.
//!
//! Endpoints:
//! - `POST /replay`: replay a stream onto a queue
//! - `GET /health`: health check

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::handlers::{ReplayError, ReplayService};

/// Shared state for axum handlers.
type AppState = Arc<ReplayService>;

/// Replay request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRequest {
    /// Name of the stream to replay.
    pub event_type: String,
    /// Queue that receives the replayed events.
    pub target_queue: String,
}

/// Successful replay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResponse {
    pub message: String,
    pub replayed: usize,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Start the REST server.
///
/// When `port` is 0, the OS assigns an ephemeral port. The actual bound
/// port is always logged so it can be discovered.
pub async fn serve(
    service: Arc<ReplayService>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(service);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(port = actual_port, "replay API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(service: Arc<ReplayService>) -> Router {
    Router::new()
        .route("/replay", post(replay))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn replay(
    State(service): State<AppState>,
    Json(request): Json<ReplayRequest>,
) -> Result<Json<ReplayResponse>, ReplayError> {
    let replayed = service
        .replay(&request.event_type, &request.target_queue)
        .await?;

    Ok(Json(ReplayResponse {
        message: format!(
            "Replayed {} events of type '{}' to queue '{}'.",
            replayed, request.event_type, request.target_queue
        ),
        replayed,
    }))
}

impl ReplayError {
    fn status(&self) -> StatusCode {
        match self {
            ReplayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ReplayError::NotFound(_) => StatusCode::NOT_FOUND,
            ReplayError::Read(_) | ReplayError::Decode { .. } | ReplayError::Publish { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ReplayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "replay failed");
        } else {
            warn!(error = %self, "replay rejected");
        }

        (
            status,
            Json(ErrorDetail {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
