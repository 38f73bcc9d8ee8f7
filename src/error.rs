//! Error taxonomy shared by the recorder, the remote API client and the
//! practice controller.
//!
//! Every variant renders as a single human-readable sentence; that text is what
//! ends up on session state and in front of the user.

use thiserror::Error;

/// Failures while acquiring or driving the capture device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    /// The user (or the OS) refused access to the microphone.
    #[error("Microphone access was denied: {0}")]
    Permission(String),

    /// No usable device, enumeration failed, or no encoder format is available.
    #[error("Audio device unavailable: {0}")]
    Device(String),
}

/// Failures talking to the scenario provider or the evaluation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request could not complete (connect, timeout, bad status, bad body).
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service answered with a structured failure.
    #[error("{0}")]
    Service(String),
}

/// The full four-way taxonomy surfaced by a practice session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PracticeError {
    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Remote(#[from] ServiceError),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Network(format!("request timed out: {err}"))
        } else if err.is_decode() {
            ServiceError::Network(format!("unreadable response: {err}"))
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}
