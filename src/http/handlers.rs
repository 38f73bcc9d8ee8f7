use super::state::AppState;
use crate::practice::Rejection;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn conflict(rejection: Rejection) -> Response {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: rejection.to_string(),
        }),
    )
        .into_response()
}

/// Current snapshot, or 409 with the rejection
async fn respond(state: &AppState, status: StatusCode, outcome: Result<(), Rejection>) -> Response {
    match outcome {
        Ok(()) => (status, Json(state.controller.snapshot().await)).into_response(),
        Err(rejection) => conflict(rejection),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.snapshot().await)
}

/// POST /session/recording/start
/// Device failures are reported on the recorder status, not as an HTTP error
pub async fn start_recording(State(state): State<AppState>) -> Response {
    info!("Start recording requested");
    let outcome = state.controller.start_recording().await;
    respond(&state, StatusCode::OK, outcome).await
}

/// POST /session/recording/stop
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    info!("Stop recording requested");
    state.controller.stop_recording().await;
    respond(&state, StatusCode::OK, Ok(())).await
}

/// POST /session/recording/clear
pub async fn clear_recording(State(state): State<AppState>) -> Response {
    let outcome = state.controller.clear_recording().await;
    respond(&state, StatusCode::OK, outcome).await
}

/// GET /session/recording/audio
/// The held recording, served with its own MIME type
pub async fn get_recording_audio(State(state): State<AppState>) -> Response {
    match state.controller.recorder().artifact().await {
        Some(artifact) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, artifact.mime_type.clone()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{}\"", artifact.file_name()),
                ),
            ],
            artifact.bytes.to_vec(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No recording is held".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /session/submit
/// Evaluation runs in the background; poll GET /session for the result
pub async fn submit(State(state): State<AppState>) -> Response {
    let outcome = state.controller.submit().await;
    respond(&state, StatusCode::ACCEPTED, outcome).await
}

/// POST /session/next
pub async fn next_scenario(State(state): State<AppState>) -> Response {
    let outcome = state.controller.next().await;
    respond(&state, StatusCode::ACCEPTED, outcome).await
}

/// POST /session/switch
pub async fn switch_scenario(State(state): State<AppState>) -> Response {
    let outcome = state.controller.switch_scenario().await;
    respond(&state, StatusCode::ACCEPTED, outcome).await
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
