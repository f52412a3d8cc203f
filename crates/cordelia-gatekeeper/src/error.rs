//! Gatekeeper error types

use thiserror::Error;

/// Why a request ended without a decided verdict
///
/// Each variant maps to a stable reason code. Input and rate-limit errors
/// are returned immediately and never retried; capability failures fail
/// closed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    /// Presented credential missing or wrong
    #[error("Invalid or missing X-Sovereign-Key header")]
    Unauthorized,

    /// No shared secret configured server-side
    #[error("Server configuration error: ARCHITECT_KEY not set")]
    ServerMisconfigured,

    /// Sliding window full for this identity
    #[error("Maximum {limit} requests per {window_secs} seconds exceeded")]
    RateLimited {
        /// Requests allowed per window
        limit: usize,
        /// Window width in seconds
        window_secs: u64,
    },

    /// Body is not a JSON object with a string `prompt`
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Prompt missing or empty
    #[error("Prompt is required")]
    EmptyPrompt,

    /// Prompt longer than the configured maximum
    #[error("Prompt exceeds maximum length of {max} characters")]
    PromptTooLong {
        /// Observed length in characters
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// Generator failed, timed out, was offline, or returned nothing
    #[error("Generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// Validator reply missing, late, or malformed
    #[error("Validation inconclusive: {0}")]
    ValidationInconclusive(String),

    /// Unexpected failure inside the pipeline
    #[error("Internal processing error: {0}")]
    Internal(String),
}

impl GateError {
    /// Machine-readable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            GateError::Unauthorized => "unauthorized",
            GateError::ServerMisconfigured => "server_misconfigured",
            GateError::RateLimited { .. } => "rate_limit_exceeded",
            GateError::InvalidPayload(_) => "invalid_payload",
            GateError::EmptyPrompt => "empty_prompt",
            GateError::PromptTooLong { .. } => "prompt_too_long",
            GateError::GeneratorUnavailable(_) => "generator_unavailable",
            GateError::ValidationInconclusive(_) => "validation_inconclusive",
            GateError::Internal(_) => "internal_error",
        }
    }
}

/// Errors raised while assembling the gatekeeper
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
