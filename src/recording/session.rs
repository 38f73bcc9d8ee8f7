use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::state::{ArtifactInfo, RecordingState, RecordingStatus, StopReason};
use crate::audio::encoder::{self, StreamSpec};
use crate::audio::{AudioChunk, AudioFormat, CaptureDevice, PlaybackHandle, RecordingArtifact};

/// Hard ceiling on a single recording
pub const MAX_RECORDING_DURATION: Duration = Duration::from_secs(40);

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Recording is stopped automatically after this long
    pub max_duration: Duration,

    /// Stream parameters used when a recording captured no audio at all
    pub fallback_spec: StreamSpec,

    /// Where playback copies of stopped recordings are written (none if unset)
    pub playback_dir: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration: MAX_RECORDING_DURATION,
            fallback_spec: StreamSpec {
                sample_rate: 16000,
                channels: 1,
            },
            playback_dir: None,
        }
    }
}

pub fn ceiling_notice(max_duration: Duration) -> String {
    format!(
        "Maximum recording duration of {} seconds reached",
        max_duration.as_secs()
    )
}

/// One capture device, one recording at a time, bounded by a ceiling timer
///
/// Cloning yields another handle onto the same session.
#[derive(Clone)]
pub struct RecordingSession {
    inner: Arc<Inner>,
}

struct Inner {
    device: Arc<dyn CaptureDevice>,
    config: RecorderConfig,
    shared: Mutex<Shared>,
}

struct Shared {
    state: RecordingState,
    elapsed_secs: u64,
    notice: Option<String>,
    /// Bumped on every start so timers from an earlier recording stay inert
    generation: u64,
    capture: Option<ActiveCapture>,
    playback: Option<PlaybackHandle>,
}

/// Resources that only exist while recording
struct ActiveCapture {
    format: AudioFormat,
    collector: JoinHandle<Vec<AudioChunk>>,
    collector_stop: oneshot::Sender<()>,
    timers_stop: oneshot::Sender<()>,
}

impl RecordingSession {
    pub fn new(device: Arc<dyn CaptureDevice>, config: RecorderConfig) -> Self {
        info!(
            "Recording session created: {} (max {}s)",
            device.name(),
            config.max_duration.as_secs()
        );

        Self {
            inner: Arc::new(Inner {
                device,
                config,
                shared: Mutex::new(Shared {
                    state: RecordingState::Idle,
                    elapsed_secs: 0,
                    notice: None,
                    generation: 0,
                    capture: None,
                    playback: None,
                }),
            }),
        }
    }

    /// Start recording
    ///
    /// Only valid from `Idle`; anything else is ignored. Failures are stored
    /// on the session as `Failed` rather than returned.
    pub async fn start(&self) {
        let (generation, format) = {
            let mut shared = self.inner.shared.lock().await;

            match &shared.state {
                RecordingState::Idle => {}
                state if state.is_busy() => {
                    warn!("Recording already started");
                    return;
                }
                state => {
                    warn!("Recording is {}; clear it before starting again", state.label());
                    return;
                }
            }

            let format = match AudioFormat::select(self.inner.device.as_ref()) {
                Ok(format) => format,
                Err(e) => {
                    error!("No encoder format available: {}", e);
                    shared.state = RecordingState::Failed(e.to_string());
                    return;
                }
            };

            shared.generation += 1;
            shared.state = RecordingState::Requesting;
            shared.elapsed_secs = 0;
            shared.notice = None;
            (shared.generation, format)
        };

        info!("Requesting capture device: {}", self.inner.device.name());

        // Requesting blocks every other transition, so the lock can be released
        // while the device waits on consent
        let opened = self.inner.device.open_stream().await;

        let mut shared = self.inner.shared.lock().await;
        match opened {
            Ok(audio_rx) => {
                let started_at = Instant::now();
                let (collector_stop, collector_stop_rx) = oneshot::channel();
                let (timers_stop, timers_stop_rx) = oneshot::channel();

                let collector = tokio::spawn(collect_chunks(audio_rx, collector_stop_rx));
                tokio::spawn(run_timers(
                    Arc::clone(&self.inner),
                    generation,
                    started_at,
                    timers_stop_rx,
                ));

                shared.capture = Some(ActiveCapture {
                    format,
                    collector,
                    collector_stop,
                    timers_stop,
                });
                shared.state = RecordingState::Recording { started_at };

                info!("Recording started ({:?})", format);
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                if self.inner.device.is_streaming() {
                    if let Err(close_err) = self.inner.device.close_stream().await {
                        warn!("Failed to release device after error: {}", close_err);
                    }
                }
                shared.state = RecordingState::Failed(e.to_string());
            }
        }
    }

    /// Stop recording; a no-op unless currently recording
    pub async fn stop(&self) {
        self.inner.finish(None, StopReason::Manual).await;
    }

    /// Discard a stopped or failed recording and return to `Idle`
    pub async fn clear(&self) {
        let mut shared = self.inner.shared.lock().await;

        match shared.state {
            RecordingState::Stopped(_) | RecordingState::Failed(_) => {}
            ref state => {
                debug!("Nothing to clear while {}", state.label());
                return;
            }
        }

        self.inner.reset_locked(&mut shared).await;
        info!("Recording cleared");
    }

    /// Stop if recording, then clear whatever is held
    pub async fn discard(&self) {
        self.inner.finish(None, StopReason::Manual).await;

        let mut shared = self.inner.shared.lock().await;
        if matches!(
            shared.state,
            RecordingState::Stopped(_) | RecordingState::Failed(_)
        ) {
            self.inner.reset_locked(&mut shared).await;
            info!("Recording discarded");
        }
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.shared.lock().await.state.clone()
    }

    pub async fn artifact(&self) -> Option<RecordingArtifact> {
        self.inner.shared.lock().await.state.artifact().cloned()
    }

    pub async fn is_recording(&self) -> bool {
        self.inner.shared.lock().await.state.is_recording()
    }

    pub async fn elapsed_secs(&self) -> u64 {
        self.inner.shared.lock().await.elapsed_secs
    }

    pub async fn notice(&self) -> Option<String> {
        self.inner.shared.lock().await.notice.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.shared.lock().await.state.error().map(str::to_string)
    }

    pub async fn playback_path(&self) -> Option<PathBuf> {
        let shared = self.inner.shared.lock().await;
        shared
            .playback
            .as_ref()
            .and_then(|handle| handle.path().map(|p| p.to_path_buf()))
    }

    pub fn max_duration(&self) -> Duration {
        self.inner.config.max_duration
    }

    pub fn device_name(&self) -> &str {
        self.inner.device.name()
    }

    pub async fn status(&self) -> RecordingStatus {
        let shared = self.inner.shared.lock().await;
        let playback_path = shared
            .playback
            .as_ref()
            .and_then(|handle| handle.path().map(|p| p.to_path_buf()));

        RecordingStatus {
            state: shared.state.label(),
            elapsed_secs: shared.elapsed_secs,
            max_duration_secs: self.inner.config.max_duration.as_secs(),
            notice: shared.notice.clone(),
            error: shared.state.error().map(str::to_string),
            artifact: shared.state.artifact().map(|artifact| ArtifactInfo {
                mime_type: artifact.mime_type.clone(),
                duration_seconds: artifact.duration_seconds,
                size_bytes: artifact.size_bytes(),
                recorded_at: artifact.recorded_at,
                playback_path,
            }),
        }
    }
}

impl Inner {
    /// The single stop sequence shared by manual stop and the ceiling timer
    ///
    /// Whoever takes the lock first while the state is `Recording` performs the
    /// whole sequence; later callers find the state changed and return false.
    async fn finish(&self, generation: Option<u64>, reason: StopReason) -> bool {
        let mut shared = self.shared.lock().await;

        let started_at = match shared.state {
            RecordingState::Recording { started_at } => started_at,
            ref state => {
                debug!("Stop ignored: recording is {}", state.label());
                return false;
            }
        };

        if generation.is_some_and(|g| g != shared.generation) {
            debug!("Stop ignored: timer belongs to an earlier recording");
            return false;
        }

        let Some(capture) = shared.capture.take() else {
            error!("Recording state without an active capture");
            shared.state = RecordingState::Failed("Recording was interrupted".to_string());
            return false;
        };

        let duration = started_at.elapsed();

        // Timers first so no tick lands after cleanup
        let _ = capture.timers_stop.send(());

        if let Err(e) = self.device.close_stream().await {
            warn!("Failed to close capture stream cleanly: {}", e);
        }

        let _ = capture.collector_stop.send(());
        let chunks = match capture.collector.await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!("Chunk collector task failed: {}", e);
                Vec::new()
            }
        };

        let spec = StreamSpec::of(&chunks, self.config.fallback_spec);
        shared.elapsed_secs = duration.as_secs();

        match encoder::encode(capture.format, &chunks, spec) {
            Ok(bytes) => {
                let artifact = RecordingArtifact::new(
                    bytes,
                    capture.format,
                    capture.format.mime_type(spec.sample_rate, spec.channels),
                    duration.as_secs_f64(),
                );

                if let Some(dir) = &self.config.playback_dir {
                    match PlaybackHandle::create(dir, &artifact) {
                        Ok(handle) => shared.playback = Some(handle),
                        Err(e) => warn!("Playback copy unavailable: {:#}", e),
                    }
                }

                info!(
                    "Recording stopped ({:?}): {:.1}s, {} chunks, {} bytes",
                    reason,
                    artifact.duration_seconds,
                    chunks.len(),
                    artifact.size_bytes()
                );

                shared.state = RecordingState::Stopped(artifact);
            }
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                shared.state = RecordingState::Failed(e.to_string());
            }
        }

        if reason == StopReason::Ceiling {
            let notice = ceiling_notice(self.config.max_duration);
            info!("{}", notice);
            shared.notice = Some(notice);
        }

        true
    }

    async fn tick(&self, generation: u64) {
        let mut shared = self.shared.lock().await;
        if shared.generation == generation && shared.state.is_recording() {
            shared.elapsed_secs += 1;
            debug!("Recording: {}s", shared.elapsed_secs);
        }
    }

    async fn reset_locked(&self, shared: &mut Shared) {
        if let Some(mut handle) = shared.playback.take() {
            handle.revoke();
        }

        if self.device.is_streaming() {
            warn!("Device still streaming on reset; closing it");
            if let Err(e) = self.device.close_stream().await {
                error!("Failed to close capture stream: {}", e);
            }
        }

        shared.state = RecordingState::Idle;
        shared.elapsed_secs = 0;
        shared.notice = None;
    }
}

/// Elapsed counter and ceiling timer, armed and disarmed together
async fn run_timers(
    inner: Arc<Inner>,
    generation: u64,
    started_at: Instant,
    mut stop: oneshot::Receiver<()>,
) {
    let one_second = Duration::from_secs(1);
    let ceiling = tokio::time::sleep_until(started_at + inner.config.max_duration);
    tokio::pin!(ceiling);
    let mut ticker = tokio::time::interval_at(started_at + one_second, one_second);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => return,
            _ = &mut ceiling => {
                inner.finish(Some(generation), StopReason::Ceiling).await;
                return;
            }
            _ = ticker.tick() => inner.tick(generation).await,
        }
    }
}

/// Accumulate chunks until the stream ends or a stop is requested
async fn collect_chunks(
    mut audio_rx: mpsc::Receiver<AudioChunk>,
    mut stop: oneshot::Receiver<()>,
) -> Vec<AudioChunk> {
    let mut chunks = Vec::new();

    loop {
        tokio::select! {
            chunk = audio_rx.recv() => match chunk {
                Some(chunk) if !chunk.samples.is_empty() => chunks.push(chunk),
                Some(_) => {}
                None => break,
            },
            _ = &mut stop => {
                // Keep what the device already delivered
                audio_rx.close();
                while let Some(chunk) = audio_rx.recv().await {
                    if !chunk.samples.is_empty() {
                        chunks.push(chunk);
                    }
                }
                break;
            }
        }
    }

    chunks
}
