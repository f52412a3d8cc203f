//! Ollama Provider Implementation
//!
//! Runs either gate role against a local Ollama API:
//!
//! - [`OllamaRole::Navigator`] proposes candidates (implements [`Generator`])
//! - [`OllamaRole::Arbiter`] reviews summaries (implements [`Validator`]),
//!   with Ollama's JSON mode switched on so the reply is a bare object
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Readiness probe against `/api/tags` on `initialize`
//!
//! # Examples
//!
//! ```no_run
//! use cordelia_llm::{OllamaProvider, OllamaRole};
//!
//! let navigator = OllamaProvider::new("http://localhost:11434", "llama3", OllamaRole::Navigator);
//! let arbiter = OllamaProvider::default_endpoint("llama3", OllamaRole::Arbiter);
//! ```

use crate::traits::{Generator, Lifecycle, Proposal, Validator};
use crate::LlmError;
use async_trait::async_trait;
use cordelia_domain::{CognitiveState, Trajectory};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for a single HTTP request (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const NAVIGATOR_INSTRUCTION: &str = "You are the Navigator of a propose/validate gate. \
Generate the natural answer to the user's request. A separate Arbiter validates \
your output; do not self-censor.";

const ARBITER_INSTRUCTION: &str = "You are the Arbiter of a propose/validate gate. \
You never see the candidate output, only a summary of it. Check the summary against \
the EQUALITY, INTEGRITY and NON_INTERFERENCE axioms and for PII exposure risk. \
Respond ONLY with a JSON object of exactly this shape: \
{\"admissible\": true or false, \"status\": \"TRAJECTORY_ADMISSIBLE\" or \"TRAJECTORY_BLOCKED\", \
\"action_loss\": <number>, \"violation\": null or \"<reason>\"}. Be strict.";

/// Which side of the gate a provider plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OllamaRole {
    /// Proposes candidate outputs
    Navigator,
    /// Reviews candidate summaries
    Arbiter,
}

impl OllamaRole {
    /// Identity reported in responses and logs
    pub fn identity(&self) -> &'static str {
        match self {
            OllamaRole::Navigator => "NAVIGATOR_OLLAMA_v1",
            OllamaRole::Arbiter => "CORDELIA_ARBITER_OLLAMA_v1",
        }
    }

    fn system_instruction(&self) -> &'static str {
        match self {
            OllamaRole::Navigator => NAVIGATOR_INSTRUCTION,
            OllamaRole::Arbiter => ARBITER_INSTRUCTION,
        }
    }
}

/// Ollama API provider
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    role: OllamaRole,
    client: reqwest::Client,
    max_retries: u32,
    ready: AtomicBool,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3", "mistral")
    /// - `role`: navigator or arbiter
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, role: OllamaRole) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                // Calls are still bounded by the gate's own timeouts
                warn!(
                    role = role.identity(),
                    error = %e,
                    "Failed to build Ollama HTTP client, using defaults without request timeout"
                );
                reqwest::Client::new()
            });

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            role,
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            ready: AtomicBool::new(false),
        }
    }

    /// Create a provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>, role: OllamaRole) -> Self {
        Self::new(DEFAULT_ENDPOINT, model, role)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Generate text using the Ollama API
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running
    /// - Model is not available
    /// - Network communication fails after all retries
    /// - Response format is invalid
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            system: self.role.system_instruction(),
            stream: false,
            format: match self.role {
                OllamaRole::Arbiter => Some("json"),
                OllamaRole::Navigator => None,
            },
        };

        // Retry logic with exponential backoff
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&request_body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<OllamaGenerateResponse>()
                            .await
                            .map(|r| r.response)
                            .map_err(|e| {
                                LlmError::InvalidResponse(format!(
                                    "Failed to parse response: {}",
                                    e
                                ))
                            });
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                debug!(
                    role = self.role.identity(),
                    attempt = attempts,
                    "Retrying Ollama request in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }

    fn ensure_ready(&self) -> Result<(), LlmError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(LlmError::NotReady(self.role.identity().to_string()))
        }
    }
}

#[async_trait]
impl Lifecycle for OllamaProvider {
    fn identity(&self) -> &str {
        self.role.identity()
    }

    async fn initialize(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Readiness probe failed: {}", e)))?;

        if !response.status().is_success() {
            warn!(
                role = self.role.identity(),
                status = %response.status(),
                "Ollama readiness probe rejected"
            );
            return Err(LlmError::Communication(format!(
                "Readiness probe returned HTTP {}",
                response.status()
            )));
        }

        self.ready.store(true, Ordering::SeqCst);
        info!(
            role = self.role.identity(),
            model = %self.model,
            "Instance ready"
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Generator for OllamaProvider {
    async fn propose(&self, prompt: &str) -> Result<Proposal, LlmError> {
        self.ensure_ready()?;
        let output = self.generate(prompt).await?;

        // The generated text itself is the final state, so it gets scored too
        let trajectory = Trajectory::new(vec![
            CognitiveState::new(format!("{}_initial", prompt)),
            CognitiveState::new(format!("{}_processing", prompt)),
            CognitiveState::new(output.clone()),
        ]);

        Ok(Proposal { trajectory, output })
    }
}

#[async_trait]
impl Validator for OllamaProvider {
    async fn review(&self, summary: &str) -> Result<String, LlmError> {
        self.ensure_ready()?;
        self.generate(summary).await
    }
}
