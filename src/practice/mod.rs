//! Practice session orchestration
//!
//! A session cycles through loading → ready → evaluating → results and back.
//! `machine` holds the pure transition rules; `controller` owns the recorder
//! and the remote collaborators and runs the side effects each transition asks
//! for. Replies to superseded requests are recognised by their ticket and
//! dropped.

mod controller;
mod machine;

pub use controller::{PracticeSessionController, SessionSnapshot};
pub use machine::{
    decide_next_scenario, transition, Command, NextScenario, PracticeEvent, PracticeState,
    Rejection, SessionPhase, Transition, EVALUATION_UNAVAILABLE, SCENARIO_UNAVAILABLE,
};
