pub mod artifact;
pub mod backend;
pub mod convert;
pub mod encoder;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use artifact::{PlaybackHandle, RecordingArtifact};
pub use backend::{AudioChunk, AudioFormat, CaptureConfig, CaptureDevice};
pub use encoder::StreamSpec;
pub use file::{AudioFile, FileCapture};

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneCapture;
