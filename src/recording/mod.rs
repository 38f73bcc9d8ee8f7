//! Bounded voice capture
//!
//! `RecordingSession` owns the capture device for the length of one recording:
//! - Device acquisition and release
//! - Chunk accumulation and encoding into a `RecordingArtifact`
//! - Elapsed counter and the 40 second ceiling timer
//! - Playback copies of the finished recording

mod session;
mod state;

pub use session::{ceiling_notice, RecorderConfig, RecordingSession, MAX_RECORDING_DURATION};
pub use state::{format_elapsed, ArtifactInfo, RecordingState, RecordingStatus, StopReason};
