use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::backend::AudioFormat;

/// A finished recording, ready for upload
///
/// Cloning is cheap; the encoded bytes are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    /// Encoded audio in `format`
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
    pub duration_seconds: f64,
    pub format: AudioFormat,
    pub recorded_at: DateTime<Utc>,
}

impl RecordingArtifact {
    pub fn new(
        bytes: Vec<u8>,
        format: AudioFormat,
        mime_type: String,
        duration_seconds: f64,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type,
            duration_seconds,
            format,
            recorded_at: Utc::now(),
        }
    }

    /// Name the upload is sent under
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.format.file_extension())
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Load a WAV file recorded elsewhere
    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self> {
        super::file::AudioFile::open(path)?.into_artifact()
    }
}

/// A file on disk a local player can open while the recording is held
///
/// The file is removed when the handle is revoked or dropped.
#[derive(Debug)]
pub struct PlaybackHandle {
    path: Option<PathBuf>,
}

impl PlaybackHandle {
    pub fn create(dir: &Path, artifact: &RecordingArtifact) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create playback directory: {:?}", dir))?;

        let path = dir.join(format!(
            "recording-{}.{}",
            uuid::Uuid::new_v4(),
            artifact.format.file_extension()
        ));

        fs::write(&path, &artifact.bytes)
            .with_context(|| format!("Failed to write playback file: {:?}", path))?;

        debug!("Playback file created: {}", path.display());

        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_revoked(&self) -> bool {
        self.path.is_none()
    }

    pub fn revoke(&mut self) {
        if let Some(path) = self.path.take() {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Playback file revoked: {}", path.display()),
                Err(e) => warn!("Failed to remove playback file {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}
