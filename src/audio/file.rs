use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::artifact::RecordingArtifact;
use super::backend::{AudioChunk, AudioFormat, CaptureConfig, CaptureDevice};
use super::convert;
use super::encoder::{self, StreamSpec};
use crate::error::RecordingError;

/// A decoded WAV file
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Package the whole file as an uploadable recording
    pub fn into_artifact(self) -> Result<RecordingArtifact> {
        let spec = StreamSpec {
            sample_rate: self.sample_rate,
            channels: self.channels,
        };
        let duration_seconds = self.duration_seconds;
        let chunk = AudioChunk {
            samples: self.samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            timestamp_ms: 0,
        };

        let bytes = encoder::encode(AudioFormat::Wav, &[chunk], spec)?;

        Ok(RecordingArtifact::new(
            bytes,
            AudioFormat::Wav,
            AudioFormat::Wav.mime_type(spec.sample_rate, spec.channels),
            duration_seconds,
        ))
    }

    /// Split into fixed-duration chunks, conformed to `config`
    pub fn chunks(&self, config: &CaptureConfig) -> Vec<AudioChunk> {
        let channels = usize::from(self.channels.max(1));
        let frames_per_chunk =
            (self.sample_rate as u64 * config.chunk_duration_ms / 1000).max(1) as usize;

        self.samples
            .chunks(frames_per_chunk * channels)
            .enumerate()
            .map(|(index, samples)| {
                let chunk = AudioChunk {
                    samples: samples.to_vec(),
                    sample_rate: self.sample_rate,
                    channels: self.channels,
                    timestamp_ms: index as u64 * config.chunk_duration_ms,
                };
                convert::conform(chunk, config.sample_rate, config.channels)
            })
            .collect()
    }
}

/// Capture device that plays a WAV file back as if it were a microphone
///
/// Chunks are released in real time; once the file is exhausted the stream
/// ends and the recorder keeps waiting for a stop.
pub struct FileCapture {
    name: String,
    chunks: Arc<Vec<AudioChunk>>,
    chunk_interval: Duration,
    feeder: Mutex<Option<JoinHandle<()>>>,
}

impl FileCapture {
    pub fn open(path: impl AsRef<Path>, config: &CaptureConfig) -> Result<Self> {
        let file = AudioFile::open(path)?;
        let chunks = file.chunks(config);

        info!(
            "File capture ready: {} ({} chunks of {}ms)",
            file.path,
            chunks.len(),
            config.chunk_duration_ms
        );

        Ok(Self {
            name: format!("file:{}", file.path),
            chunks: Arc::new(chunks),
            chunk_interval: Duration::from_millis(config.chunk_duration_ms.max(1)),
            feeder: Mutex::new(None),
        })
    }

    fn feeder(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.feeder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileCapture {
    async fn open_stream(&self) -> Result<mpsc::Receiver<AudioChunk>, RecordingError> {
        let mut feeder = self.feeder();
        if feeder.is_some() {
            return Err(RecordingError::Device(format!("{} is already streaming", self.name)));
        }

        let (tx, rx) = mpsc::channel(100);
        let chunks = Arc::clone(&self.chunks);
        let interval = self.chunk_interval;

        *feeder = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for chunk in chunks.iter() {
                ticker.tick().await;
                if tx.send(chunk.clone()).await.is_err() {
                    break;
                }
            }
        }));

        info!("Streaming from {}", self.name);

        Ok(rx)
    }

    async fn close_stream(&self) -> Result<(), RecordingError> {
        if let Some(handle) = self.feeder().take() {
            handle.abort();
            info!("Stopped streaming from {}", self.name);
        }
        Ok(())
    }

    fn is_format_supported(&self, _format: AudioFormat) -> bool {
        true
    }

    fn is_streaming(&self) -> bool {
        self.feeder().is_some()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
