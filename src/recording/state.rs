use serde::Serialize;
use std::path::PathBuf;
use tokio::time::Instant;

use crate::audio::RecordingArtifact;

/// Lifecycle of a single capture cycle
#[derive(Debug, Clone)]
pub enum RecordingState {
    /// No recording held, ready to start
    Idle,
    /// Waiting for the device (and possibly the user) to grant access
    Requesting,
    /// Capturing audio
    Recording { started_at: Instant },
    /// Capture finished; the artifact is held until cleared
    Stopped(RecordingArtifact),
    /// Capture could not start or finish
    Failed(String),
}

impl RecordingState {
    pub fn label(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Requesting => "requesting",
            RecordingState::Recording { .. } => "recording",
            RecordingState::Stopped(_) => "stopped",
            RecordingState::Failed(_) => "failed",
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording { .. })
    }

    /// A start is outstanding or running
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            RecordingState::Requesting | RecordingState::Recording { .. }
        )
    }

    pub fn artifact(&self) -> Option<&RecordingArtifact> {
        match self {
            RecordingState::Stopped(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RecordingState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    Ceiling,
}

/// Serializable view of a recording session
#[derive(Debug, Clone, Serialize)]
pub struct RecordingStatus {
    pub state: &'static str,
    pub elapsed_secs: u64,
    pub max_duration_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub mime_type: String,
    pub duration_seconds: f64,
    pub size_bytes: usize,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_path: Option<PathBuf>,
}

/// Render elapsed seconds as `m:ss`
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
