//! Replay management web UI.
//!
//! Server-rendered form that forwards replay requests to the replay API.
//! Endpoints:
//! - `GET /`: render the form
//! - `POST /`: submit `event_type` and `target_queue` (form-encoded)

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tera::{Context, Tera};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::ReplayRequest;

// Embed templates at compile time so the binary is self-contained
const TPL_INDEX: &str = include_str!("templates/index.html");

const SUCCESS_MESSAGE: &str = "Replay triggered successfully!";
const FAILURE_MESSAGE: &str = "Failed to trigger replay.";

/// UI configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Replay endpoint of the API.
    pub replay_api_url: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            replay_api_url: "http://localhost:8000/replay".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Replay API unreachable: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Outcome of forwarding a replay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// API answered 200.
    Accepted,
    /// API answered with another status; carries the response body.
    Rejected { status: u16, body: String },
}

/// HTTP client for the replay API.
#[derive(Clone)]
pub struct ReplayClient {
    http: reqwest::Client,
    url: String,
}

impl ReplayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the request as JSON.
    pub async fn trigger(&self, request: &ReplayRequest) -> Result<TriggerOutcome, UiError> {
        let response = self.http.post(&self.url).json(request).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::OK {
            return Ok(TriggerOutcome::Accepted);
        }

        let body = response.text().await?;
        Ok(TriggerOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Shared state for axum handlers.
pub struct UiState {
    templates: Tera,
    client: ReplayClient,
}

impl UiState {
    pub fn new(client: ReplayClient) -> Result<Self, UiError> {
        let mut templates = Tera::default();
        templates.add_raw_template("index.html", TPL_INDEX)?;
        Ok(Self { templates, client })
    }
}

/// Submitted form fields. Either may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct ReplayForm {
    pub event_type: Option<String>,
    pub target_queue: Option<String>,
}

impl ReplayForm {
    /// Both fields, when present and non-blank.
    fn into_request(self) -> Option<ReplayRequest> {
        let event_type = self.event_type.filter(|s| !s.trim().is_empty())?;
        let target_queue = self.target_queue.filter(|s| !s.trim().is_empty())?;
        Some(ReplayRequest {
            event_type,
            target_queue,
        })
    }
}

/// What the page shows above the form.
#[derive(Debug, Default)]
struct Banner<'a> {
    success: bool,
    error: bool,
    message: &'a str,
}

/// Start the UI server.
pub async fn serve(
    state: Arc<UiState>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(port = actual_port, "replay UI listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: Arc<UiState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn index(State(state): State<Arc<UiState>>) -> Response {
    render(&state.templates, &Banner::default(), None)
}

async fn submit(State(state): State<Arc<UiState>>, Form(form): Form<ReplayForm>) -> Response {
    let Some(request) = form.into_request() else {
        return render(&state.templates, &Banner::default(), None);
    };

    match state.client.trigger(&request).await {
        Ok(TriggerOutcome::Accepted) => {
            info!(
                event_type = %request.event_type,
                target_queue = %request.target_queue,
                "Replay triggered"
            );
            let banner = Banner {
                success: true,
                message: SUCCESS_MESSAGE,
                ..Default::default()
            };
            render(&state.templates, &banner, Some(&request))
        }
        Ok(TriggerOutcome::Rejected { status, body }) => {
            warn!(status, body = %body, "Replay API rejected request");
            let message = format!("{}\n{}", FAILURE_MESSAGE, body);
            let banner = Banner {
                error: true,
                message: &message,
                ..Default::default()
            };
            render(&state.templates, &banner, Some(&request))
        }
        Err(e) => {
            error!(error = %e, url = %state.client.url(), "Replay API call failed");
            let message = format!("{}\n{}", FAILURE_MESSAGE, e);
            let banner = Banner {
                error: true,
                message: &message,
                ..Default::default()
            };
            let mut response = render(&state.templates, &banner, Some(&request));
            *response.status_mut() = StatusCode::BAD_GATEWAY;
            response
        }
    }
}

// --- Helper ---

fn render(tera: &Tera, banner: &Banner<'_>, request: Option<&ReplayRequest>) -> Response {
    let mut context = Context::new();
    context.insert("success", &banner.success);
    context.insert("error", &banner.error);
    context.insert("message", banner.message);
    context.insert(
        "event_type",
        request.map(|r| r.event_type.as_str()).unwrap_or(""),
    );
    context.insert(
        "target_queue",
        request.map(|r| r.target_queue.as_str()).unwrap_or(""),
    );

    match tera.render("index.html", &context) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!("Template error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Template error: {}", err),
            )
                .into_response()
        }
    }
}
