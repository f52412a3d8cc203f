//! Cordelia Server
//!
//! HTTP front end for the admissibility gate. Builds the gate from
//! [`ServerConfig`], brings its capabilities up, serves the axum router and
//! shuts the capabilities down again on Ctrl+C.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, GeneratorBackend, ServerConfig, ValidatorBackend};
use cordelia_gatekeeper::{AdmissibilityGate, AuthGate, GatekeeperError, RateLimiter};
use cordelia_llm::{Generator, Lifecycle, OllamaProvider, OllamaRole, StubNavigator, Validator};
use handlers::{create_router, AppState, VERSION};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Gate assembly error
    #[error("Gate error: {0}")]
    Gate(#[from] GatekeeperError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Assemble the gate and its capabilities from configuration
///
/// Capabilities are created but not initialized.
pub fn build_gate(config: &ServerConfig) -> Result<AdmissibilityGate, ServerError> {
    config.validate()?;

    let backends = &config.backends;
    let generator: Arc<dyn Generator> = match backends.generator {
        GeneratorBackend::Stub => Arc::new(StubNavigator::new()),
        GeneratorBackend::Ollama => Arc::new(OllamaProvider::new(
            backends.ollama_endpoint.as_str(),
            backends.navigator_model.as_str(),
            OllamaRole::Navigator,
        )),
    };

    let validator: Option<Arc<dyn Validator>> = match backends.validator {
        ValidatorBackend::None => None,
        ValidatorBackend::Ollama => Some(Arc::new(OllamaProvider::new(
            backends.ollama_endpoint.as_str(),
            backends.arbiter_model.as_str(),
            OllamaRole::Arbiter,
        ))),
    };

    let auth = match &config.architect_key {
        Some(key) => AuthGate::new(key.as_str()),
        None => AuthGate::unconfigured(),
    };

    let limiter = Arc::new(RateLimiter::from_config(&config.gate));

    Ok(AdmissibilityGate::new(
        config.gate.clone(),
        auth,
        limiter,
        generator,
        validator,
    )?)
}

/// Start the gate HTTP server
///
/// Initializes tracing, builds the gate, initializes its capabilities and
/// serves until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    init_tracing();

    info!("Starting Cordelia admissibility gate v{}", VERSION);
    info!("Bind address: {}", config.bind_addr());
    info!(
        "Rate limit: {} requests per {} seconds (process-local, not shared across processes)",
        config.gate.rate_limit_count, config.gate.rate_limit_period_secs
    );
    info!("Max prompt length: {} characters", config.gate.max_prompt_length);
    info!("Scoring mode: {}", config.gate.scoring_mode.as_str());

    if !config.has_architect_key() {
        warn!("ARCHITECT_KEY is not set; every /sentinel request will fail with 500");
    }

    let gate = Arc::new(build_gate(&config)?);

    // A capability that fails to come up leaves the gate failing closed
    if let Err(e) = gate.initialize().await {
        warn!("Capability initialization failed: {}", e);
    }
    info!("Navigator: {}", gate.generator().identity());
    info!("Arbiter: {}", gate.arbiter_identity());

    let app = create_router(AppState::new(Arc::clone(&gate)));

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Gate listening on {}", config.bind_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()));

    gate.shutdown().await;
    info!("Capabilities shut down");

    served
}

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Already installed when embedded in a process that set its own
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping gate"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
