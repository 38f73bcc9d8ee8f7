use tokio::sync::mpsc;

use crate::error::RecordingError;

/// A block of captured audio (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the stream was opened
    pub timestamp_ms: u64,
}

impl AudioChunk {
    pub fn duration_ms(&self) -> u64 {
        let frames = self.samples.len() as u64 / u64::from(self.channels.max(1));
        frames * 1000 / u64::from(self.sample_rate.max(1))
    }
}

/// Configuration shared by capture devices
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will decimate if the source is an integer multiple)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Chunk size in milliseconds
    pub chunk_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,     // 16kHz is what the transcription service expects
            channels: 1,            // Mono
            chunk_duration_ms: 100, // 100ms chunks
        }
    }
}

/// Container the finished recording is encoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// RIFF/WAVE, 16-bit integer PCM
    Wav,
    /// Headerless little-endian 16-bit PCM
    Pcm16,
}

impl AudioFormat {
    /// Formats in order of preference
    pub const PREFERENCE: [AudioFormat; 2] = [AudioFormat::Wav, AudioFormat::Pcm16];

    pub fn mime_type(&self, sample_rate: u32, channels: u16) -> String {
        match self {
            AudioFormat::Wav => "audio/wav".to_string(),
            AudioFormat::Pcm16 => format!("audio/L16;rate={sample_rate};channels={channels}"),
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm16 => "pcm",
        }
    }

    /// Pick the first preferred format the device can deliver
    pub fn select(device: &dyn CaptureDevice) -> Result<AudioFormat, RecordingError> {
        Self::PREFERENCE
            .into_iter()
            .find(|format| device.is_format_supported(*format))
            .ok_or_else(|| {
                RecordingError::Device(format!(
                    "{} supports none of the available encoder formats",
                    device.name()
                ))
            })
    }
}

/// Audio capture device
///
/// Implementations:
/// - `FileCapture`: replays a WAV file in real time (testing, headless runs)
/// - `MicrophoneCapture`: default input device via cpal (`microphone` feature)
///
/// A device hands out at most one stream at a time. The stream ends when the
/// sender side is dropped, which every implementation does in `close_stream`.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the device and start streaming
    ///
    /// May suspend for as long as the platform waits on user consent.
    async fn open_stream(&self) -> Result<mpsc::Receiver<AudioChunk>, RecordingError>;

    /// Release the device. Closing a device that is not streaming is a no-op.
    async fn close_stream(&self) -> Result<(), RecordingError>;

    /// Whether recordings from this device can be encoded as `format`
    fn is_format_supported(&self, format: AudioFormat) -> bool;

    /// Check if the device currently holds an open stream
    fn is_streaming(&self) -> bool;

    /// Device name for logging
    fn name(&self) -> &str;
}
