//! HTTP surface.
//!
//! `POST /api/question` streams the run's normalized events as
//! newline-delimited JSON and closes after the terminal event. Launch
//! failures are reported as a plain error response before any events.

use std::convert::Infallible;
use std::sync::Arc;

use askrepo_agents::RunHandle;
use askrepo_projects::ProjectError;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/api/question", post(question))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Request body for `/api/question`.
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub project: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ProjectsResponse {
    projects: Vec<String>,
}

/// GET /api/projects
async fn list_projects(State(state): State<Arc<AppState>>) -> Response {
    match state.projects.list().await {
        Ok(projects) => (StatusCode::OK, Json(ProjectsResponse { projects })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list projects");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// POST /api/question
///
/// Streams one JSON event per line (`application/x-ndjson`); the
/// connection closes after the single terminal event.
async fn question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuestionRequest>,
) -> Response {
    if request.prompt.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt must not be empty".to_string());
    }

    let path = match state.projects.ensure_fresh(&request.project).await {
        Ok(path) => path,
        Err(e @ (ProjectError::InvalidName(_) | ProjectError::NotFound(_))) => {
            return error_response(StatusCode::NOT_FOUND, e.to_string());
        }
        Err(e) => {
            warn!(project = %request.project, error = %e, "Failed to prepare project");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let handle = match state.dispatcher.start(&path, &request.prompt) {
        Ok(handle) => handle,
        Err(e) => {
            warn!(project = %request.project, error = %e, "Failed to start run");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    info!(project = %request.project, "Streaming run events");
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(ndjson_stream(handle)),
    )
        .into_response()
}

/// Turn a run handle into a stream of NDJSON-encoded event lines.
///
/// If the client disconnects mid-stream, dropping the handle cancels the
/// run and kills the agent process.
fn ndjson_stream(
    handle: RunHandle,
) -> impl futures_util::Stream<Item = Result<Bytes, Infallible>> {
    futures_util::stream::unfold(handle, |mut handle| async move {
        let event = handle.next_event().await?;
        let mut line = serde_json::to_vec(&event).unwrap_or_else(|_| b"{}".to_vec());
        line.push(b'\n');
        Some((Ok(Bytes::from(line)), handle))
    })
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use askrepo_core::AgentEvent;

    #[test]
    fn test_question_request_deserializes() {
        let request: QuestionRequest =
            serde_json::from_str(r#"{"project":"demo","prompt":"how does auth work?"}"#).unwrap();
        assert_eq!(request.project, "demo");
        assert_eq!(request.prompt, "how does auth work?");
    }

    #[test]
    fn test_event_wire_line() {
        let event = AgentEvent::status("Reading file: lib.rs");
        let line = serde_json::to_string(&event).unwrap();
        assert_eq!(line, r#"{"type":"status","status":"Reading file: lib.rs"}"#);
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_string(&ErrorResponse {
            error: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(body, r#"{"error":"nope"}"#);
    }
}
