use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::machine::{transition, Command, PracticeEvent, PracticeState, Rejection, SessionPhase};
use crate::api::{EvaluationService, Scenario, ScenarioProvider};
use crate::audio::RecordingArtifact;
use crate::recording::{RecordingSession, RecordingStatus};

/// Everything a client needs to render the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub practice: PracticeState,
    pub recording: RecordingStatus,
}

/// Drives one practice session: scenario, recording, evaluation, next
///
/// State changes go through `machine::transition`; this type only runs the
/// commands it returns. Cloning yields another handle onto the same session.
#[derive(Clone)]
pub struct PracticeSessionController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<PracticeState>,
    updates: watch::Sender<PracticeState>,
    recorder: RecordingSession,
    scenarios: Arc<dyn ScenarioProvider>,
    evaluator: Arc<dyn EvaluationService>,
}

impl PracticeSessionController {
    pub fn new(
        recorder: RecordingSession,
        scenarios: Arc<dyn ScenarioProvider>,
        evaluator: Arc<dyn EvaluationService>,
    ) -> Self {
        let initial = PracticeState::initial();
        let (updates, _) = watch::channel(initial.clone());

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(initial),
                updates,
                recorder,
                scenarios,
                evaluator,
            }),
        }
    }

    /// Load the first scenario
    pub async fn begin(&self) -> Result<(), Rejection> {
        info!("Starting practice session");
        self.dispatch(PracticeEvent::RequestFreshScenario, None).await
    }

    /// Drop the current scenario and whatever was recorded for it
    pub async fn switch_scenario(&self) -> Result<(), Rejection> {
        info!("Switching scenario");
        self.dispatch(PracticeEvent::RequestFreshScenario, None).await
    }

    /// Move on, preferring the follow-up scenario suggested by the evaluation
    pub async fn next(&self) -> Result<(), Rejection> {
        self.dispatch(PracticeEvent::Next, None).await
    }

    /// Submit the held recording for evaluation
    ///
    /// The recording is read under the session lock so a concurrent clear
    /// cannot discard it between the check and the upload.
    pub async fn submit(&self) -> Result<(), Rejection> {
        let mut state = self.inner.state.lock().await;
        let artifact = self.inner.recorder.artifact().await;
        let event = PracticeEvent::Submit {
            artifact_present: artifact.is_some(),
        };
        self.apply(&mut state, event, artifact).await
    }

    pub async fn start_recording(&self) -> Result<(), Rejection> {
        let ticket = {
            let state = self.inner.state.lock().await;
            ensure_recording_allowed(&state, "record")?;
            state.ticket
        };

        self.inner.recorder.start().await;

        // The scenario may have been switched while the device was opening
        let superseded = {
            let state = self.inner.state.lock().await;
            state.ticket != ticket || !state.accepts_recording()
        };
        if superseded {
            info!("Scenario changed while the recorder was starting; discarding");
            self.inner.recorder.discard().await;
        }

        Ok(())
    }

    /// Stopping is always allowed; it is a no-op unless recording
    pub async fn stop_recording(&self) {
        self.inner.recorder.stop().await;
    }

    pub async fn clear_recording(&self) -> Result<(), Rejection> {
        // Held across the clear so no submission can start in between
        let state = self.inner.state.lock().await;
        if state.phase == SessionPhase::Evaluating {
            return Err(Rejection::WrongPhase {
                action: "clear the recording",
                phase: state.phase,
            });
        }

        self.inner.recorder.clear().await;
        Ok(())
    }

    pub async fn state(&self) -> PracticeState {
        self.inner.state.lock().await.clone()
    }

    /// Receive every state change as it is committed
    pub fn subscribe(&self) -> watch::Receiver<PracticeState> {
        self.inner.updates.subscribe()
    }

    pub fn recorder(&self) -> &RecordingSession {
        &self.inner.recorder
    }

    /// Session and recorder state read together
    ///
    /// Artifact releases run under the session lock, so a snapshot never shows
    /// results next to a recording that is about to be dropped.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock().await;
        let recording = self.inner.recorder.status().await;
        let practice = state.clone();
        SessionSnapshot {
            practice,
            recording,
        }
    }

    /// Release the capture device and any held recording
    pub async fn shutdown(&self) {
        info!("Shutting down practice session");
        self.inner.recorder.discard().await;
    }

    async fn dispatch(
        &self,
        event: PracticeEvent,
        artifact: Option<RecordingArtifact>,
    ) -> Result<(), Rejection> {
        let mut state = self.inner.state.lock().await;
        self.apply(&mut state, event, artifact).await
    }

    /// Run one transition with the session lock held
    ///
    /// Lock order is session state, then recorder. Commands run before the
    /// new state is published.
    async fn apply(
        &self,
        state: &mut PracticeState,
        event: PracticeEvent,
        artifact: Option<RecordingArtifact>,
    ) -> Result<(), Rejection> {
        let next = match transition(state, event) {
            Ok(next) => next,
            Err(rejection @ Rejection::Stale { .. }) => {
                debug!("Discarding reply: {}", rejection);
                return Err(rejection);
            }
            Err(rejection) => {
                warn!("Rejected: {}", rejection);
                return Err(rejection);
            }
        };

        if next.state.phase != state.phase {
            info!("Practice phase: {} -> {}", state.phase, next.state.phase);
        }

        *state = next.state;
        self.execute(next.commands, artifact).await;
        self.inner.updates.send_replace(state.clone());
        Ok(())
    }

    async fn execute(&self, commands: Vec<Command>, mut artifact: Option<RecordingArtifact>) {
        for command in commands {
            match command {
                Command::ReleaseArtifact => self.inner.recorder.discard().await,
                Command::FetchScenario { ticket } => spawn_fetch(self.clone(), ticket),
                Command::Evaluate { ticket, scenario } => match artifact.take() {
                    Some(audio) => spawn_evaluation(self.clone(), ticket, audio, scenario),
                    None => warn!("Evaluation requested without a recording"),
                },
            }
        }
    }

    async fn fetch_scenario(self, ticket: u64) {
        debug!("Fetching scenario (request {})", ticket);
        let outcome = self.inner.scenarios.fetch_random_scenario().await;
        let _ = self
            .dispatch(PracticeEvent::ScenarioFetched { ticket, outcome }, None)
            .await;
    }

    async fn evaluate(self, ticket: u64, audio: RecordingArtifact, scenario: Scenario) {
        debug!("Evaluating recording (request {})", ticket);
        let outcome = self.inner.evaluator.evaluate(&audio, &scenario).await;
        let _ = self
            .dispatch(PracticeEvent::EvaluationFinished { ticket, outcome }, None)
            .await;
    }
}

fn spawn_fetch(controller: PracticeSessionController, ticket: u64) {
    tokio::spawn(controller.fetch_scenario(ticket));
}

fn spawn_evaluation(
    controller: PracticeSessionController,
    ticket: u64,
    audio: RecordingArtifact,
    scenario: Scenario,
) {
    tokio::spawn(controller.evaluate(ticket, audio, scenario));
}

fn ensure_recording_allowed(state: &PracticeState, action: &'static str) -> Result<(), Rejection> {
    if state.phase != SessionPhase::Ready {
        return Err(Rejection::WrongPhase {
            action,
            phase: state.phase,
        });
    }
    if state.scenario.is_none() {
        return Err(Rejection::NoScenario);
    }
    Ok(())
}
