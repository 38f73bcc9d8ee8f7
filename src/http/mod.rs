//! HTTP API for driving the practice session from a local front end
//!
//! - GET /health - Health check
//! - GET /session - Practice phase, scenario, evaluation and recorder status
//! - POST /session/recording/{start,stop,clear} - Recorder controls
//! - GET /session/recording/audio - The held recording
//! - POST /session/submit - Submit the recording for evaluation
//! - POST /session/next - Advance to the next scenario
//! - POST /session/switch - Replace the current scenario

mod handlers;
mod routes;
mod state;

pub use handlers::ErrorResponse;
pub use routes::create_router;
pub use state::AppState;
