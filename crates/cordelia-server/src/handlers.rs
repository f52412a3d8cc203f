//! HTTP request handlers for the gate.
//!
//! Maps the gatekeeper's outcomes and errors onto status codes and JSON
//! bodies. The pipeline itself lives in `cordelia_gatekeeper`.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use cordelia_domain::Verdict;
use cordelia_gatekeeper::{AdmissibilityGate, GateError, GateOutcome, GateRequest};
use cordelia_llm::Lifecycle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Service version reported in every response
pub const VERSION: &str = "1.0.10-Lagrangian";

/// Header carrying the shared secret
pub const SOVEREIGN_KEY_HEADER: &str = "x-sovereign-key";

const SYSTEM_NAME: &str = "Cordelia Admissibility Gate";

const AVAILABLE_ENDPOINTS: [&str; 4] = ["/", "/pulse", "/sentinel (POST)", "/health"];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The admissibility gate
    pub gate: Arc<AdmissibilityGate>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Wrap a gate, starting the uptime clock now
    pub fn new(gate: Arc<AdmissibilityGate>) -> Self {
        Self {
            gate,
            started_at: Instant::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
}

/// Rate-limit settings in `/pulse`
#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Requests allowed per window
    pub count: usize,
    /// Window width in seconds
    pub period_seconds: u64,
    /// Always "process-local"
    pub scope: String,
}

/// Scoring settings in `/pulse`
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoringInfo {
    /// "score" or "review"
    pub mode: String,
    /// Kinetic weight
    pub kinetic_weight: f64,
    /// Potential weight
    pub potential_weight: f64,
}

/// Identity and readiness of one capability
#[derive(Debug, Serialize, Deserialize)]
pub struct CapabilityStatus {
    /// Reported identity
    pub identity: String,
    /// Whether it currently accepts calls
    pub ready: bool,
}

/// Capability readiness in `/pulse`
#[derive(Debug, Serialize, Deserialize)]
pub struct CapabilityInfo {
    /// The generator
    pub generator: CapabilityStatus,
    /// The validator, when one is configured
    pub validator: Option<CapabilityStatus>,
}

/// Pulse (status) response
#[derive(Debug, Serialize, Deserialize)]
pub struct PulseResponse {
    /// "operational", or "degraded" while the generator is not ready
    pub status: String,
    /// Service version
    pub version: String,
    /// Whole seconds since startup
    pub uptime_seconds: u64,
    /// Fixed label
    pub braid_status: String,
    /// Fixed label
    pub substrate: String,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    /// Rate-limit settings
    pub rate_limit: RateLimitInfo,
    /// Maximum prompt length in characters
    pub max_prompt_length: usize,
    /// Scoring settings
    pub scoring: ScoringInfo,
    /// Capability readiness
    pub capabilities: CapabilityInfo,
}

/// Decided `/sentinel` response (compliant or intercepted)
#[derive(Debug, Serialize, Deserialize)]
pub struct SentinelResponse {
    /// "compliant" or "intercepted"
    pub status: String,
    /// `TRAJECTORY_ADMISSIBLE` or `TRAJECTORY_BLOCKED`
    pub trajectory_status: String,
    /// Reason code when intercepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable detail when intercepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// `T - V`, 4 decimals
    pub action: f64,
    /// Reported loss, 4 decimals
    pub total_loss: f64,
    /// `T`, 4 decimals
    pub kinetic: f64,
    /// Pipeline wall time
    pub latency_ms: u64,
    /// Released output; only present when compliant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Identity of the deciding component
    pub arbiter: String,
    /// Identity of the generator
    pub navigator: String,
    /// Service version
    pub version: String,
    /// Request correlation id
    pub request_id: String,
}

/// Error response for requests that never reached a verdict
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// "unauthorized", "intercepted" or "error"
    pub status: String,
    /// Reason code, for intercepted requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Error message
    pub message: String,
    /// Observed prompt length, for `prompt_too_long`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_length: Option<usize>,
    /// Configured maximum, for `prompt_too_long`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Application error type
#[derive(Debug)]
pub struct AppError(pub GateError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, label) = match &err {
            GateError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            GateError::ServerMisconfigured | GateError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "error")
            }
            GateError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "intercepted"),
            GateError::InvalidPayload(_)
            | GateError::EmptyPrompt
            | GateError::PromptTooLong { .. } => (StatusCode::BAD_REQUEST, "intercepted"),
            GateError::GeneratorUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "intercepted"),
            GateError::ValidationInconclusive(_) => (StatusCode::OK, "intercepted"),
        };

        let reason = match &err {
            GateError::Unauthorized | GateError::ServerMisconfigured | GateError::Internal(_) => None,
            other => Some(other.reason_code().to_string()),
        };

        // Internal detail stays in the logs
        let message = match &err {
            GateError::Internal(_) => "Internal processing error".to_string(),
            other => other.to_string(),
        };

        let (prompt_length, max_length) = match &err {
            GateError::PromptTooLong { length, max } => (Some(*length), Some(*max)),
            _ => (None, None),
        };

        let body = Json(ErrorResponse {
            status: label.to_string(),
            reason,
            message,
            prompt_length,
            max_length,
        });
        (status, body).into_response()
    }
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        AppError(e)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

impl From<GateOutcome> for SentinelResponse {
    fn from(outcome: GateOutcome) -> Self {
        let GateOutcome {
            request_id,
            verdict,
            latency_ms,
            navigator,
            arbiter,
        } = outcome;

        let score = *verdict.score();
        let (reason, message, output) = match &verdict {
            Verdict::Compliant { output, .. } => (None, None, Some(output.clone())),
            Verdict::Intercepted { reason, .. } => {
                (Some(reason.code().to_string()), Some(reason.detail()), None)
            }
        };

        SentinelResponse {
            status: verdict.status().to_string(),
            trajectory_status: verdict.trajectory_status().as_str().to_string(),
            reason,
            message,
            action: round4(score.action),
            total_loss: round4(verdict.total_loss()),
            kinetic: round4(score.kinetic),
            latency_ms,
            output,
            arbiter,
            navigator,
            version: VERSION.to_string(),
            request_id: request_id.to_string(),
        }
    }
}

/// GET / - System information
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let gate = &state.gate;
    Json(json!({
        "system": SYSTEM_NAME,
        "version": VERSION,
        "status": "operational",
        "scoring_mode": gate.config().scoring_mode.as_str(),
        "navigator": gate.generator().identity(),
        "arbiter": gate.arbiter_identity(),
        "endpoints": {
            "/health": "Liveness check",
            "/pulse": "Status, limits and capability readiness",
            "/sentinel": "POST - Admissibility gate"
        }
    }))
}

/// GET /health - Liveness check
async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
    })
}

/// GET /pulse - Status, configured limits and capability readiness
async fn pulse(State(state): State<AppState>) -> Json<PulseResponse> {
    let gate = &state.gate;
    let config = gate.config();
    let limiter = gate.rate_limiter();

    let generator = CapabilityStatus {
        identity: gate.generator().identity().to_string(),
        ready: gate.generator().is_ready(),
    };
    let validator = gate.validator().map(|v| CapabilityStatus {
        identity: v.identity().to_string(),
        ready: v.is_ready(),
    });

    let status = if generator.ready { "operational" } else { "degraded" };

    Json(PulseResponse {
        status: status.to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        braid_status: "phase-locked".to_string(),
        substrate: "Lagrangian".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        rate_limit: RateLimitInfo {
            count: limiter.limit(),
            period_seconds: limiter.window().as_secs(),
            scope: "process-local".to_string(),
        },
        max_prompt_length: config.max_prompt_length,
        scoring: ScoringInfo {
            mode: config.scoring_mode.as_str().to_string(),
            kinetic_weight: config.kinetic_weight,
            potential_weight: config.potential_weight,
        },
        capabilities: CapabilityInfo {
            generator,
            validator,
        },
    })
}

/// POST /sentinel - Run a prompt through the gate
///
/// The pipeline runs in its own task so a panic inside a capability
/// surfaces as a 500 instead of tearing down the connection.
async fn sentinel(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SentinelResponse>, AppError> {
    let credential = headers
        .get(SOVEREIGN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let gate = Arc::clone(&state.gate);
    let joined = tokio::spawn(async move {
        gate.evaluate(GateRequest {
            credential: credential.as_deref(),
            body: &body,
        })
        .await
    })
    .await;

    let outcome = match joined {
        Ok(result) => result?,
        Err(e) => {
            error!(error = %e, "Gate pipeline task failed");
            return Err(AppError(GateError::Internal(e.to_string())));
        }
    };

    Ok(Json(SentinelResponse::from(outcome)))
}

/// Fallback - JSON 404
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": "Endpoint not found",
            "available_endpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/pulse", get(pulse))
        .route("/sentinel", post(sentinel))
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cordelia_domain::{InterceptReason, ScoreComponents};
    use cordelia_gatekeeper::{AuthGate, GateConfig, RateLimiter};
    use cordelia_llm::StubNavigator;
    use tower::ServiceExt; // for oneshot
    use uuid::Uuid;

    async fn create_test_state() -> AppState {
        let config = GateConfig::default();
        let limiter = Arc::new(RateLimiter::from_config(&config));
        let navigator = Arc::new(StubNavigator::new());
        navigator.initialize().await.unwrap();
        let gate =
            AdmissibilityGate::new(config, AuthGate::new("test-key"), limiter, navigator, None)
                .unwrap();
        AppState::new(Arc::new(gate))
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(1.234_567), 1.2346);
        assert_eq!(round4(-0.000_04), -0.0);
        assert_eq!(round4(2.0), 2.0);
    }

    #[test]
    fn test_intercepted_response_omits_output() {
        let outcome = GateOutcome {
            request_id: Uuid::nil(),
            verdict: Verdict::Intercepted {
                score: ScoreComponents::zero(),
                total_loss: 1.0,
                reason: InterceptReason::ValidationInconclusive("late".to_string()),
            },
            latency_ms: 3,
            navigator: "N".to_string(),
            arbiter: "A".to_string(),
        };

        let response = SentinelResponse::from(outcome);
        assert_eq!(response.status, "intercepted");
        assert_eq!(response.trajectory_status, "TRAJECTORY_BLOCKED");
        assert_eq!(response.reason.as_deref(), Some("validation_inconclusive"));
        assert!(response.output.is_none());

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("output").is_none());
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(create_test_state().await);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = AppError(GateError::Internal("secret detail".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.status, "error");
        assert_eq!(error.message, "Internal processing error");
    }

    #[tokio::test]
    async fn test_sentinel_compliant() {
        let app = create_router(create_test_state().await);

        let request = Request::builder()
            .method("POST")
            .uri("/sentinel")
            .header("content-type", "application/json")
            .header("X-Sovereign-Key", "test-key")
            .body(Body::from(r#"{"prompt": "Hello"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
