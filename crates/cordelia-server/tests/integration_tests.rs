//! Integration tests for the gate HTTP service

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use async_trait::async_trait;
use cordelia_gatekeeper::{AdmissibilityGate, AuthGate, GateConfig, RateLimiter, ScoringMode};
use cordelia_llm::{Generator, Lifecycle, LlmError, MockProvider, Proposal, StubNavigator};
use cordelia_server::handlers::{
    create_router, AppState, ErrorResponse, HealthCheckResponse, PulseResponse, SentinelResponse,
    VERSION,
};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

const KEY: &str = "test-sovereign-key";

/// Generator that crashes mid-proposal
struct PanickingGenerator;

#[async_trait]
impl Lifecycle for PanickingGenerator {
    fn identity(&self) -> &str {
        "PANICKING"
    }

    async fn initialize(&self) -> Result<(), LlmError> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn shutdown(&self) {}
}

#[async_trait]
impl Generator for PanickingGenerator {
    async fn propose(&self, _prompt: &str) -> Result<Proposal, LlmError> {
        panic!("backend invariant broken: secret detail");
    }
}

/// Helper to create an app around the stub navigator in score mode
async fn create_test_app(config: GateConfig, auth: AuthGate) -> Router {
    let limiter = Arc::new(RateLimiter::from_config(&config));
    let navigator = Arc::new(StubNavigator::new());
    navigator.initialize().await.unwrap();

    let gate = AdmissibilityGate::new(config, auth, limiter, navigator, None).unwrap();
    create_router(AppState::new(Arc::new(gate)))
}

async fn default_app() -> Router {
    create_test_app(GateConfig::default(), AuthGate::new(KEY)).await
}

fn review_app(validator_reply: &str) -> Router {
    let config = GateConfig {
        scoring_mode: ScoringMode::Review,
        ..GateConfig::default()
    };
    let limiter = Arc::new(RateLimiter::from_config(&config));
    let gate = AdmissibilityGate::new(
        config,
        AuthGate::new(KEY),
        limiter,
        Arc::new(MockProvider::new("candidate text")),
        Some(Arc::new(MockProvider::new(validator_reply))),
    )
    .unwrap();
    create_router(AppState::new(Arc::new(gate)))
}

fn sentinel(key: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/sentinel")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-Sovereign-Key", key);
    }
    builder.body(body.into()).unwrap()
}

fn prompt(text: &str) -> String {
    serde_json::json!({ "prompt": text }).to_string()
}

async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = default_app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthCheckResponse = json(response).await;
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_pulse_endpoint() {
    let request = Request::builder()
        .uri("/pulse")
        .body(Body::empty())
        .unwrap();

    let response = default_app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let pulse: PulseResponse = json(response).await;
    assert_eq!(pulse.status, "operational");
    assert_eq!(pulse.version, VERSION);
    assert_eq!(pulse.braid_status, "phase-locked");
    assert_eq!(pulse.substrate, "Lagrangian");
    assert_eq!(pulse.rate_limit.count, 10);
    assert_eq!(pulse.rate_limit.period_seconds, 60);
    assert_eq!(pulse.rate_limit.scope, "process-local");
    assert_eq!(pulse.max_prompt_length, 2048);
    assert_eq!(pulse.scoring.mode, "score");
    assert!(pulse.capabilities.generator.ready);
    assert!(pulse.capabilities.validator.is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(&pulse.timestamp).is_ok());
}

#[tokio::test]
async fn test_root_and_not_found() {
    let app = default_app().await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let root: serde_json::Value = json(response).await;
    assert_eq!(root["version"], VERSION);
    assert_eq!(root["navigator"], "NAVIGATOR_LAG_v1");

    let request = Request::builder()
        .uri("/nonexistent")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let missing: serde_json::Value = json(response).await;
    assert_eq!(missing["status"], "error");
    assert!(missing["available_endpoints"].is_array());
}

#[tokio::test]
async fn test_sentinel_compliant() {
    let response = default_app()
        .await
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: SentinelResponse = json(response).await;
    assert_eq!(result.status, "compliant");
    assert_eq!(result.trajectory_status, "TRAJECTORY_ADMISSIBLE");
    assert!(result.action >= 0.0);
    assert!(result.output.unwrap().starts_with("VISION_OUTPUT: Hello"));
    assert_eq!(result.arbiter, "CORDELIA_ARBITER_LAG_v1");
    assert_eq!(result.navigator, "NAVIGATOR_LAG_v1");
    assert_eq!(result.version, VERSION);
    assert!(!result.request_id.is_empty());
}

#[tokio::test]
async fn test_sentinel_email_intercepted() {
    let response = default_app()
        .await
        .oneshot(sentinel(Some(KEY), prompt("contact me at user@domain.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = json(response).await;
    assert_eq!(body["status"], "intercepted");
    assert_eq!(body["trajectory_status"], "TRAJECTORY_BLOCKED");
    assert_eq!(body["reason"], "action_threshold_violation");
    assert!(body["action"].as_f64().unwrap() < 0.0);
    assert!(body.get("output").is_none());
}

#[tokio::test]
async fn test_sentinel_unauthorized() {
    let app = default_app().await;

    for key in [None, Some("wrong-key")] {
        let response = app
            .clone()
            .oneshot(sentinel(key, prompt("Hello")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let error: ErrorResponse = json(response).await;
        assert_eq!(error.status, "unauthorized");
        assert_eq!(error.message, "Invalid or missing X-Sovereign-Key header");
    }
}

#[tokio::test]
async fn test_sentinel_without_configured_key() {
    let app = create_test_app(GateConfig::default(), AuthGate::unconfigured()).await;
    let response = app
        .oneshot(sentinel(Some("anything"), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error: ErrorResponse = json(response).await;
    assert_eq!(error.status, "error");
    assert_eq!(
        error.message,
        "Server configuration error: ARCHITECT_KEY not set"
    );
}

#[tokio::test]
async fn test_sentinel_bad_payloads() {
    let app = default_app().await;

    let cases = [
        ("not json".to_string(), "invalid_payload"),
        ("{}".to_string(), "empty_prompt"),
        (prompt(""), "empty_prompt"),
        (r#"{"prompt": 7}"#.to_string(), "invalid_payload"),
    ];
    for (body, reason) in cases {
        let response = app.clone().oneshot(sentinel(Some(KEY), body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = json(response).await;
        assert_eq!(error.status, "intercepted");
        assert_eq!(error.reason.as_deref(), Some(reason));
    }
}

#[tokio::test]
async fn test_sentinel_prompt_length_boundary() {
    let app = default_app().await;

    let response = app
        .clone()
        .oneshot(sentinel(Some(KEY), prompt(&"a".repeat(2048))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(sentinel(Some(KEY), prompt(&"a".repeat(2049))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = json(response).await;
    assert_eq!(error.reason.as_deref(), Some("prompt_too_long"));
    assert_eq!(error.prompt_length, Some(2049));
    assert_eq!(error.max_length, Some(2048));
}

#[tokio::test]
async fn test_sentinel_rate_limit() {
    let app = default_app().await;

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(sentinel(Some(KEY), prompt("Hello")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let error: ErrorResponse = json(response).await;
    assert_eq!(error.status, "intercepted");
    assert_eq!(error.reason.as_deref(), Some("rate_limit_exceeded"));
    assert_eq!(error.message, "Maximum 10 requests per 60 seconds exceeded");
}

#[tokio::test]
async fn test_sentinel_generator_offline() {
    let config = GateConfig::default();
    let limiter = Arc::new(RateLimiter::from_config(&config));
    // Never initialized
    let navigator = Arc::new(StubNavigator::new());
    let gate = AdmissibilityGate::new(config, AuthGate::new(KEY), limiter, navigator, None).unwrap();
    let app = create_router(AppState::new(Arc::new(gate)));

    let response = app
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let error: ErrorResponse = json(response).await;
    assert_eq!(error.reason.as_deref(), Some("generator_unavailable"));
}

#[tokio::test]
async fn test_sentinel_review_admits() {
    let reply = r#"{"admissible": true, "status": "TRAJECTORY_ADMISSIBLE", "action_loss": 0.00231, "violation": null}"#;
    let response = review_app(reply)
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: SentinelResponse = json(response).await;
    assert_eq!(result.status, "compliant");
    assert_eq!(result.total_loss, 0.0023);
    assert_eq!(result.output.as_deref(), Some("candidate text"));
    assert_eq!(result.arbiter, "MOCK_PROVIDER");
}

#[tokio::test]
async fn test_sentinel_review_malformed_reply_is_intercepted() {
    let response = review_app("Sure, that looks admissible to me.")
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: SentinelResponse = json(response).await;
    assert_eq!(result.status, "intercepted");
    assert_eq!(result.reason.as_deref(), Some("validation_inconclusive"));
    assert_eq!(result.total_loss, 1.0);
    assert!(result.output.is_none());
}

#[tokio::test]
async fn test_sentinel_review_blocks() {
    let reply = r#"{"admissible": false, "status": "TRAJECTORY_BLOCKED", "action_loss": 4.7831, "violation": "PII exposure"}"#;
    let response = review_app(reply)
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();

    let result: SentinelResponse = json(response).await;
    assert_eq!(result.status, "intercepted");
    assert_eq!(result.reason.as_deref(), Some("axiom_violation"));
    assert_eq!(result.message.as_deref(), Some("Axiom violation detected: PII exposure"));
}

#[tokio::test]
async fn test_sentinel_generator_panic_is_internal_error() {
    let config = GateConfig::default();
    let limiter = Arc::new(RateLimiter::from_config(&config));
    let gate = AdmissibilityGate::new(
        config,
        AuthGate::new(KEY),
        limiter,
        Arc::new(PanickingGenerator),
        None,
    )
    .unwrap();
    let app = create_router(AppState::new(Arc::new(gate)));

    let response = app
        .oneshot(sentinel(Some(KEY), prompt("Hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = json(response).await;
    assert_eq!(
        body,
        serde_json::json!({"status": "error", "message": "Internal processing error"})
    );
}
