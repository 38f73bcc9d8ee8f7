use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{info, warn};

use super::messages::{EvaluationResult, RemoteErrorBody, Scenario, TranscriptionReply};
use super::{EvaluationService, ScenarioProvider};
use crate::audio::RecordingArtifact;
use crate::error::ServiceError;

/// HTTP client for the hosted practice service
pub struct HttpPracticeApi {
    client: Client,
    base_url: String,
}

impl HttpPracticeApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!("Practice API at {}", base_url);

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Transcribe a recording without scoring it
    pub async fn transcribe(&self, audio: &RecordingArtifact) -> Result<String, ServiceError> {
        let form = Form::new().part("audio", audio_part(audio)?);

        let response = self
            .client
            .post(self.url("/api/transcribe"))
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let reply: TranscriptionReply = response.json().await?;
        Ok(reply.text)
    }
}

#[async_trait::async_trait]
impl ScenarioProvider for HttpPracticeApi {
    async fn fetch_random_scenario(&self) -> Result<Scenario, ServiceError> {
        let response = self.client.get(self.url("/api/scenario")).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Scenario request failed with {}", status);
            return Err(ServiceError::Network(format!(
                "failed to fetch scenario: {}",
                status
            )));
        }

        let scenario: Scenario = response.json().await?;
        info!(
            "Fetched scenario: {} ({}, {})",
            scenario.prompt, scenario.category, scenario.difficulty
        );
        Ok(scenario)
    }
}

#[async_trait::async_trait]
impl EvaluationService for HttpPracticeApi {
    async fn evaluate(
        &self,
        audio: &RecordingArtifact,
        scenario: &Scenario,
    ) -> Result<EvaluationResult, ServiceError> {
        let scenario_json = serde_json::to_string(scenario)
            .map_err(|e| ServiceError::Network(format!("could not encode scenario: {e}")))?;

        let form = Form::new()
            .part("audio", audio_part(audio)?)
            .text("scenario", scenario_json);

        info!(
            "Submitting {:.1}s recording ({} bytes, {}) for evaluation",
            audio.duration_seconds,
            audio.size_bytes(),
            audio.mime_type
        );

        let response = self
            .client
            .post(self.url("/api/evaluate"))
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let result: EvaluationResult = response.json().await?;

        info!(
            "Evaluation received: overall {} (follow-up scenario: {})",
            result.scores.overall,
            result.next_scenario.is_some()
        );

        Ok(result)
    }
}

fn audio_part(audio: &RecordingArtifact) -> Result<Part, ServiceError> {
    Part::bytes(audio.bytes.to_vec())
        .file_name(audio.file_name())
        .mime_str(&audio.mime_type)
        .map_err(|e| ServiceError::Network(format!("invalid audio MIME type: {e}")))
}

/// Turn a non-2xx reply into the service's own error message
async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let fallback = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();

    let message = match response.json::<RemoteErrorBody>().await {
        Ok(RemoteErrorBody { error: Some(error) }) if !error.is_empty() => error,
        _ => fallback,
    };

    warn!("Practice API returned {}: {}", status, message);
    Err(ServiceError::Service(message))
}
