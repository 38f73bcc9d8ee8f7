//! Pure state machine for a practice session.
//!
//! `transition` never performs I/O; it returns the next state together with the
//! side effects the controller has to carry out.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::api::{EvaluationResult, Scenario};
use crate::error::{PracticeError, ServiceError};

pub const SCENARIO_UNAVAILABLE: &str =
    "Could not load a practice scenario. Check your network connection and try again.";

pub const EVALUATION_UNAVAILABLE: &str = "Evaluation failed, please try again later.";

/// Coarse session state shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Loading,
    Ready,
    Evaluating,
    Results,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Loading => "loading",
            SessionPhase::Ready => "ready",
            SessionPhase::Evaluating => "evaluating",
            SessionPhase::Results => "results",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeState {
    pub phase: SessionPhase,
    pub scenario: Option<Scenario>,
    pub evaluation: Option<EvaluationResult>,
    pub error: Option<String>,
    /// Id of the newest outstanding request; older replies are stale
    #[serde(skip)]
    pub ticket: u64,
}

impl PracticeState {
    pub fn initial() -> Self {
        Self {
            phase: SessionPhase::Loading,
            scenario: None,
            evaluation: None,
            error: None,
            ticket: 0,
        }
    }

    /// Recording controls are only live with a scenario on screen
    pub fn accepts_recording(&self) -> bool {
        self.phase == SessionPhase::Ready && self.scenario.is_some()
    }
}

impl Default for PracticeState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone)]
pub enum PracticeEvent {
    /// Initial load or an explicit "switch scenario"
    RequestFreshScenario,
    /// Advance past the current scenario
    Next,
    Submit {
        artifact_present: bool,
    },
    ScenarioFetched {
        ticket: u64,
        outcome: Result<Scenario, ServiceError>,
    },
    EvaluationFinished {
        ticket: u64,
        outcome: Result<EvaluationResult, ServiceError>,
    },
}

/// Side effects requested by a transition, run in order
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Stop and discard whatever the recorder holds
    ReleaseArtifact,
    FetchScenario { ticket: u64 },
    Evaluate { ticket: u64, scenario: Scenario },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: PracticeState,
    pub commands: Vec<Command>,
}

/// An event that the current state does not accept
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("there is no recording to submit")]
    NoArtifact,

    #[error("no scenario is loaded")]
    NoScenario,

    #[error("cannot {action} while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error("reply to request {ticket} arrived after request {current} was issued")]
    Stale { ticket: u64, current: u64 },
}

/// Where the next scenario comes from
#[derive(Debug, Clone, PartialEq)]
pub enum NextScenario {
    FetchFresh,
    UseSuggested(Scenario),
}

/// Prefer the follow-up the evaluation suggested; otherwise fetch
pub fn decide_next_scenario(result: Option<&EvaluationResult>) -> NextScenario {
    match result.and_then(|r| r.next_scenario.clone()) {
        Some(scenario) => NextScenario::UseSuggested(scenario),
        None => NextScenario::FetchFresh,
    }
}

pub fn transition(state: &PracticeState, event: PracticeEvent) -> Result<Transition, Rejection> {
    match event {
        PracticeEvent::RequestFreshScenario => Ok(fetch_fresh(state)),

        PracticeEvent::Next => match state.phase {
            SessionPhase::Results | SessionPhase::Ready => {
                match decide_next_scenario(state.evaluation.as_ref()) {
                    NextScenario::UseSuggested(scenario) => Ok(Transition {
                        state: PracticeState {
                            phase: SessionPhase::Ready,
                            scenario: Some(scenario),
                            evaluation: None,
                            error: None,
                            ticket: state.ticket + 1,
                        },
                        commands: vec![Command::ReleaseArtifact],
                    }),
                    NextScenario::FetchFresh => Ok(fetch_fresh(state)),
                }
            }
            phase => Err(Rejection::WrongPhase {
                action: "advance to the next scenario",
                phase,
            }),
        },

        PracticeEvent::Submit { artifact_present } => {
            if state.phase != SessionPhase::Ready {
                return Err(Rejection::WrongPhase {
                    action: "submit",
                    phase: state.phase,
                });
            }
            let Some(scenario) = state.scenario.clone() else {
                return Err(Rejection::NoScenario);
            };
            if !artifact_present {
                return Err(Rejection::NoArtifact);
            }

            let ticket = state.ticket + 1;
            Ok(Transition {
                state: PracticeState {
                    phase: SessionPhase::Evaluating,
                    error: None,
                    ticket,
                    ..state.clone()
                },
                commands: vec![Command::Evaluate { ticket, scenario }],
            })
        }

        PracticeEvent::ScenarioFetched { ticket, outcome } => {
            ensure_current(state, ticket, SessionPhase::Loading)?;

            let (scenario, error) = match outcome {
                Ok(scenario) => (Some(scenario), None),
                Err(e) => {
                    tracing::warn!("Scenario fetch failed: {}", e);
                    (None, Some(SCENARIO_UNAVAILABLE.to_string()))
                }
            };

            Ok(Transition {
                state: PracticeState {
                    phase: SessionPhase::Ready,
                    scenario,
                    evaluation: None,
                    error,
                    ticket: state.ticket,
                },
                commands: Vec::new(),
            })
        }

        PracticeEvent::EvaluationFinished { ticket, outcome } => {
            ensure_current(state, ticket, SessionPhase::Evaluating)?;

            match outcome {
                Ok(result) => Ok(Transition {
                    state: PracticeState {
                        phase: SessionPhase::Results,
                        evaluation: Some(result),
                        error: None,
                        ..state.clone()
                    },
                    commands: vec![Command::ReleaseArtifact],
                }),
                // The recording stays so the user can resubmit it
                Err(e) => Ok(Transition {
                    state: PracticeState {
                        phase: SessionPhase::Ready,
                        error: Some(evaluation_message(&e)),
                        ..state.clone()
                    },
                    commands: Vec::new(),
                }),
            }
        }
    }
}

fn fetch_fresh(state: &PracticeState) -> Transition {
    let ticket = state.ticket + 1;
    Transition {
        state: PracticeState {
            phase: SessionPhase::Loading,
            scenario: None,
            evaluation: None,
            error: None,
            ticket,
        },
        commands: vec![Command::ReleaseArtifact, Command::FetchScenario { ticket }],
    }
}

fn ensure_current(state: &PracticeState, ticket: u64, phase: SessionPhase) -> Result<(), Rejection> {
    if ticket != state.ticket || state.phase != phase {
        return Err(Rejection::Stale {
            ticket,
            current: state.ticket,
        });
    }
    Ok(())
}

fn evaluation_message(err: &ServiceError) -> String {
    let message = PracticeError::from(err.clone()).to_string();
    if message.trim().is_empty() {
        EVALUATION_UNAVAILABLE.to_string()
    } else {
        message
    }
}
