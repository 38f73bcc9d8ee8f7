// Shared test doubles for recorder and controller tests
#![allow(dead_code)]

use lets_talk::api::{
    Category, Difficulty, EvaluationResult, EvaluationService, Feedback, FluencyNote,
    RelevanceNote, Scenario, ScenarioProvider, Scores,
};
use lets_talk::audio::{AudioChunk, AudioFormat, CaptureDevice, RecordingArtifact};
use lets_talk::error::{RecordingError, ServiceError};
use lets_talk::practice::{PracticeSessionController, PracticeState, SessionPhase};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Capture device
// ============================================================================

/// Capture device whose behaviour each test scripts up front
pub struct ScriptedDevice {
    open_error: Mutex<Option<RecordingError>>,
    supported: Vec<AudioFormat>,
    open_delay: Option<Duration>,
    close_delay: Option<Duration>,
    initial_chunks: Vec<AudioChunk>,
    sender: Mutex<Option<mpsc::Sender<AudioChunk>>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedDevice {
    /// Supports every format and delivers one second of audio on open
    pub fn new() -> Self {
        Self {
            open_error: Mutex::new(None),
            supported: AudioFormat::PREFERENCE.to_vec(),
            open_delay: None,
            close_delay: None,
            initial_chunks: (0..10).map(|i| chunk(i * 100)).collect(),
            sender: Mutex::new(None),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: RecordingError) -> Self {
        let device = Self::new();
        device.set_open_error(Some(error));
        device
    }

    pub fn supporting(formats: &[AudioFormat]) -> Self {
        Self {
            supported: formats.to_vec(),
            ..Self::new()
        }
    }

    pub fn with_open_delay(delay: Duration) -> Self {
        Self {
            open_delay: Some(delay),
            ..Self::new()
        }
    }

    /// Releasing the stream takes `delay`, like a device that is slow to stop
    pub fn with_close_delay(delay: Duration) -> Self {
        Self {
            close_delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn set_open_error(&self, error: Option<RecordingError>) {
        *self.open_error.lock().unwrap() = error;
    }

    /// Number of streams handed out
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn is_streaming_now(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    /// Number of times an open stream was released
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// 100 ms of 16 kHz mono audio
pub fn chunk(timestamp_ms: u64) -> AudioChunk {
    AudioChunk {
        samples: vec![1000; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn open_stream(&self) -> Result<mpsc::Receiver<AudioChunk>, RecordingError> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.open_error.lock().unwrap().clone() {
            return Err(error);
        }

        let (tx, rx) = mpsc::channel(64);
        for chunk in &self.initial_chunks {
            tx.try_send(chunk.clone()).unwrap();
        }

        *self.sender.lock().unwrap() = Some(tx);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn close_stream(&self) -> Result<(), RecordingError> {
        if let Some(delay) = self.close_delay {
            if self.is_streaming_now() {
                tokio::time::sleep(delay).await;
            }
        }

        if self.sender.lock().unwrap().take().is_some() {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_format_supported(&self, format: AudioFormat) -> bool {
        self.supported.contains(&format)
    }

    fn is_streaming(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Remote collaborators
// ============================================================================

pub fn scenario(prompt: &str) -> Scenario {
    Scenario {
        prompt: prompt.to_string(),
        context: "You are at a cafe counter.".to_string(),
        prompt_translation: None,
        context_translation: None,
        category: Category::Dining,
        difficulty: Difficulty::Beginner,
    }
}

pub fn evaluation(next: Option<Scenario>) -> EvaluationResult {
    EvaluationResult {
        transcription: "I would like a latte please".to_string(),
        scores: Scores {
            pronunciation: 80,
            grammar: 90,
            relevance: 85,
            fluency: 75,
            overall: 82,
        },
        feedback: Feedback {
            grammar: Vec::new(),
            pronunciation: Vec::new(),
            relevance: RelevanceNote {
                is_relevant: true,
                analysis: "On topic".to_string(),
                missing_points: Vec::new(),
            },
            fluency: FluencyNote::default(),
        },
        suggested_response: "Could I get a latte, please?".to_string(),
        suggested_response_translation: String::new(),
        summary: "Good job".to_string(),
        next_scenario: next,
    }
}

/// Scenario provider replaying queued replies, then numbered scenarios
#[derive(Default)]
pub struct StubScenarios {
    replies: Mutex<VecDeque<Result<Scenario, ServiceError>>>,
    delays: Mutex<VecDeque<Duration>>,
    calls: AtomicUsize,
}

impl StubScenarios {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Result<Scenario, ServiceError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Hold the next unanswered call back by `delay`
    pub fn push_delay(&self, delay: Duration) {
        self.delays.lock().unwrap().push_back(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ScenarioProvider for StubScenarios {
    async fn fetch_random_scenario(&self) -> Result<Scenario, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.replies.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(scenario(&format!("Scenario {}", call))))
    }
}

/// Evaluation service replaying queued replies after an optional delay
#[derive(Default)]
pub struct StubEvaluator {
    replies: Mutex<VecDeque<Result<EvaluationResult, ServiceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    submitted: Mutex<Vec<(String, String)>>,
}

impl StubEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, reply: Result<EvaluationResult, ServiceError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (mime type, scenario prompt) of every submission
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EvaluationService for StubEvaluator {
    async fn evaluate(
        &self,
        audio: &RecordingArtifact,
        scenario: &Scenario,
    ) -> Result<EvaluationResult, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push((audio.mime_type.clone(), scenario.prompt.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.replies.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(evaluation(None)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Wait until the controller reaches `phase`
pub async fn wait_for_phase(
    controller: &PracticeSessionController,
    phase: SessionPhase,
) -> PracticeState {
    let mut updates = controller.subscribe();
    let state = tokio::time::timeout(
        Duration::from_secs(300),
        updates.wait_for(|state| state.phase == phase),
    )
    .await
    .expect("timed out waiting for phase")
    .expect("controller dropped");
    state.clone()
}

/// Let spawned work run to completion
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
