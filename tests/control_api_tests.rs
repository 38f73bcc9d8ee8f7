// Integration tests for the local control API

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{wait_for_phase, ScriptedDevice, StubEvaluator, StubScenarios};
use lets_talk::practice::{PracticeSessionController, SessionPhase};
use lets_talk::recording::{RecorderConfig, RecordingSession};
use lets_talk::{create_router, AppState};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn ready_app() -> (Router, PracticeSessionController) {
    let device = Arc::new(ScriptedDevice::new());
    let recorder = RecordingSession::new(device, RecorderConfig::default());
    let controller = PracticeSessionController::new(
        recorder,
        Arc::new(StubScenarios::new()),
        Arc::new(StubEvaluator::new()),
    );

    controller.begin().await.unwrap();
    wait_for_phase(&controller, SessionPhase::Ready).await;

    (create_router(AppState::new(controller.clone())), controller)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test(start_paused = true)]
async fn health_check_responds() {
    let (app, _) = ready_app().await;

    let (status, body) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test(start_paused = true)]
async fn session_reports_loaded_scenario() {
    let (app, _) = ready_app().await;

    let (status, json) = send_json(&app, "GET", "/session").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["phase"], "ready");
    assert_eq!(json["scenario"]["prompt"], "Scenario 1");
    assert_eq!(json["recording"]["state"], "idle");
}

#[tokio::test(start_paused = true)]
async fn submit_without_recording_conflicts() {
    let (app, _) = ready_app().await;

    let (status, json) = send_json(&app, "POST", "/session/submit").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "there is no recording to submit");
}

#[tokio::test(start_paused = true)]
async fn audio_is_not_found_before_recording() {
    let (app, _) = ready_app().await;

    let (status, _) = send(&app, "GET", "/session/recording/audio").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn record_submit_and_advance() {
    let (app, controller) = ready_app().await;

    let (status, json) = send_json(&app, "POST", "/session/recording/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recording"]["state"], "recording");

    tokio::time::sleep(Duration::from_secs(3)).await;

    let (status, json) = send_json(&app, "POST", "/session/recording/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recording"]["state"], "stopped");
    assert_eq!(json["recording"]["artifact"]["mime_type"], "audio/wav");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/session/recording/audio")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");

    let (status, json) = send_json(&app, "POST", "/session/submit").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["phase"], "evaluating");

    wait_for_phase(&controller, SessionPhase::Results).await;
    let (_, json) = send_json(&app, "GET", "/session").await;
    assert_eq!(json["phase"], "results");
    assert_eq!(json["evaluation"]["scores"]["overall"], 82);

    let (status, _) = send_json(&app, "POST", "/session/next").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let state = wait_for_phase(&controller, SessionPhase::Ready).await;
    assert_eq!(state.scenario.unwrap().prompt, "Scenario 2");
}

#[tokio::test(start_paused = true)]
async fn clear_discards_stopped_recording() {
    let (app, _) = ready_app().await;

    send(&app, "POST", "/session/recording/start").await;
    send(&app, "POST", "/session/recording/stop").await;

    let (status, json) = send_json(&app, "POST", "/session/recording/clear").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recording"]["state"], "idle");
}

#[tokio::test(start_paused = true)]
async fn switch_replaces_scenario() {
    let (app, controller) = ready_app().await;

    let (status, json) = send_json(&app, "POST", "/session/switch").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["phase"], "loading");

    let state = wait_for_phase(&controller, SessionPhase::Ready).await;
    assert_eq!(state.scenario.unwrap().prompt, "Scenario 2");
}
