pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod practice;
pub mod recording;

pub use api::{EvaluationResult, EvaluationService, HttpPracticeApi, Scenario, ScenarioProvider};
pub use audio::{
    AudioChunk, AudioFile, AudioFormat, CaptureConfig, CaptureDevice, FileCapture,
    PlaybackHandle, RecordingArtifact,
};
pub use config::Config;
pub use error::{PracticeError, RecordingError, ServiceError};
pub use http::{create_router, AppState};
pub use practice::{
    decide_next_scenario, NextScenario, PracticeSessionController, PracticeState, Rejection,
    SessionPhase, SessionSnapshot,
};
pub use recording::{RecorderConfig, RecordingSession, RecordingState, RecordingStatus};
