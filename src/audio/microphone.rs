//! Default input device capture via cpal
//!
//! cpal streams are not Send, so each open stream lives on its own thread
//! and is dropped there when the stop signal arrives.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioChunk, AudioFormat, CaptureConfig, CaptureDevice};
use super::convert;
use crate::error::RecordingError;

struct ActiveStream {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Microphone capture from the host's default input device
pub struct MicrophoneCapture {
    config: CaptureConfig,
    active: Mutex<Option<ActiveStream>>,
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> std::sync::MutexGuard<'_, Option<ActiveStream>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneCapture {
    async fn open_stream(&self) -> Result<mpsc::Receiver<AudioChunk>, RecordingError> {
        if self.is_streaming() {
            return Err(RecordingError::Device("microphone is already streaming".to_string()));
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(256);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("microphone-capture".to_string())
            .spawn(move || run_capture(config, chunk_tx, ready_tx, stop_rx))
            .map_err(|e| RecordingError::Device(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                *self.active() = Some(ActiveStream { stop_tx, thread });
                info!("Microphone stream opened");
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(RecordingError::Device("capture thread exited before the stream started".to_string()))
            }
        }
    }

    async fn close_stream(&self) -> Result<(), RecordingError> {
        let Some(active) = self.active().take() else {
            return Ok(());
        };

        let _ = active.stop_tx.send(());
        tokio::task::spawn_blocking(move || active.thread.join())
            .await
            .map_err(|e| RecordingError::Device(format!("capture thread join failed: {e}")))?
            .map_err(|_| RecordingError::Device("capture thread panicked".to_string()))?;

        info!("Microphone stream closed");
        Ok(())
    }

    fn is_format_supported(&self, _format: AudioFormat) -> bool {
        // Samples are converted to i16 before encoding, so both containers work
        true
    }

    fn is_streaming(&self) -> bool {
        self.active().is_some()
    }

    fn name(&self) -> &str {
        "default microphone"
    }
}

fn run_capture(
    config: CaptureConfig,
    chunk_tx: mpsc::Sender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<(), RecordingError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match build_stream(&config, chunk_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(classify(e.to_string())));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        return;
    }

    // Blocks until close_stream signals or the device is dropped
    let _ = stop_rx.recv();
    drop(stream);
}

fn build_stream(
    config: &CaptureConfig,
    chunk_tx: mpsc::Sender<AudioChunk>,
) -> Result<cpal::Stream, RecordingError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| RecordingError::Device("no input device found".to_string()))?;

    let supported = device
        .default_input_config()
        .map_err(|e| classify(format!("failed to query input config: {e}")))?;

    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let source_rate = stream_config.sample_rate.0;
    let source_channels = usize::from(stream_config.channels.max(1));

    info!(
        "Opening input device {} ({}Hz, {} channels, {:?})",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        source_rate,
        source_channels,
        sample_format
    );

    let emitter = ChunkEmitter::new(chunk_tx, source_rate, config.clone());
    let error_callback = |e: cpal::StreamError| error!("Input stream error: {}", e);

    let stream = match sample_format {
        SampleFormat::F32 => {
            let emitter = emitter.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    emitter.emit(convert::downmix_f32(data, source_channels));
                },
                error_callback,
                None,
            )
        }
        SampleFormat::I16 => {
            let emitter = emitter.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    emitter.emit(convert::downmix_i16(data, source_channels));
                },
                error_callback,
                None,
            )
        }
        SampleFormat::U16 => {
            let emitter = emitter.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    emitter.emit(convert::downmix_u16(data, source_channels));
                },
                error_callback,
                None,
            )
        }
        other => {
            return Err(RecordingError::Device(format!(
                "unsupported input sample format: {other:?}"
            )));
        }
    };

    stream.map_err(|e| classify(format!("failed to build input stream: {e}")))
}

/// Platforms report a refused consent prompt as a backend error
fn classify(message: String) -> RecordingError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not allowed") {
        RecordingError::Permission(message)
    } else {
        RecordingError::Device(message)
    }
}

#[derive(Clone)]
struct ChunkEmitter {
    tx: mpsc::Sender<AudioChunk>,
    source_rate: u32,
    config: CaptureConfig,
    frames_sent: Arc<AtomicU64>,
}

impl ChunkEmitter {
    fn new(tx: mpsc::Sender<AudioChunk>, source_rate: u32, config: CaptureConfig) -> Self {
        Self {
            tx,
            source_rate,
            config,
            frames_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    fn emit(&self, mono: Vec<i16>) {
        if mono.is_empty() {
            return;
        }

        let frames = mono.len() as u64;
        let offset = self.frames_sent.fetch_add(frames, Ordering::Relaxed);
        let chunk = AudioChunk {
            samples: mono,
            sample_rate: self.source_rate,
            channels: 1,
            timestamp_ms: offset * 1000 / u64::from(self.source_rate.max(1)),
        };

        let chunk = convert::conform(chunk, self.config.sample_rate, 1);
        if self.tx.try_send(chunk).is_err() {
            warn!("Dropping microphone chunk: recorder is not keeping up");
        }
    }
}
