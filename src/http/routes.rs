use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session state
        .route("/session", get(handlers::get_session))
        // Recording control
        .route(
            "/session/recording/start",
            post(handlers::start_recording),
        )
        .route("/session/recording/stop", post(handlers::stop_recording))
        .route("/session/recording/clear", post(handlers::clear_recording))
        .route("/session/recording/audio", get(handlers::get_recording_audio))
        // Session flow
        .route("/session/submit", post(handlers::submit))
        .route("/session/next", post(handlers::next_scenario))
        .route("/session/switch", post(handlers::switch_scenario))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
