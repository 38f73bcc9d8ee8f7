//! Remote practice service: scenario provider and answer evaluation
//!
//! The controller only sees the two traits below; `HttpPracticeApi` is the
//! implementation that talks to the hosted service.

pub mod client;
pub mod messages;

pub use client::HttpPracticeApi;
pub use messages::{
    Category, Difficulty, EvaluationResult, Feedback, FluencyNote, GrammarNote,
    PronunciationNote, RelevanceNote, Scenario, ScoreBand, Scores, Severity,
};

use crate::audio::RecordingArtifact;
use crate::error::ServiceError;

/// Source of practice scenarios
#[async_trait::async_trait]
pub trait ScenarioProvider: Send + Sync {
    async fn fetch_random_scenario(&self) -> Result<Scenario, ServiceError>;
}

/// Scores a recorded answer against the scenario it responds to
#[async_trait::async_trait]
pub trait EvaluationService: Send + Sync {
    async fn evaluate(
        &self,
        audio: &RecordingArtifact,
        scenario: &Scenario,
    ) -> Result<EvaluationResult, ServiceError>;
}
