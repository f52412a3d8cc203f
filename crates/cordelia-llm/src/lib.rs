//! Cordelia Capability Layer
//!
//! Pluggable generator and validator backends behind the [`Generator`],
//! [`Validator`] and [`Lifecycle`] traits.
//!
//! # Providers
//!
//! - `StubNavigator`: deterministic in-process generator (default)
//! - `MockProvider`: scripted generator/validator for tests
//! - `OllamaProvider`: local Ollama API integration, as navigator or arbiter
//!
//! # Examples
//!
//! ```
//! use cordelia_llm::{Lifecycle, MockProvider, Validator};
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new(r#"{"admissible":true,"status":"TRAJECTORY_ADMISSIBLE","action_loss":0.0,"violation":null}"#);
//! let reply = provider.review("summary").await.unwrap();
//! assert!(reply.contains("admissible"));
//! # });
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod stub;
pub mod traits;

use async_trait::async_trait;
use cordelia_domain::Trajectory;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use ollama::{OllamaProvider, OllamaRole};
pub use stub::StubNavigator;
pub use traits::{Generator, Lifecycle, Proposal, Validator};

/// Errors that can occur during capability calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the backend
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Capability used before `initialize` succeeded, or after `shutdown`
    #[error("Capability not ready: {0}")]
    NotReady(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

const MOCK_ERROR: &str = "ERROR";

/// Scripted provider for deterministic testing
///
/// Acts as both generator and validator. Responses are looked up by the
/// exact prompt (or summary) and fall back to a default. Clones share
/// their call counter and script.
///
/// # Examples
///
/// ```
/// use cordelia_llm::{Generator, Lifecycle, MockProvider};
///
/// # tokio_test::block_on(async {
/// let mut provider = MockProvider::new("default output");
/// provider.add_response("hello", "world");
///
/// let proposal = provider.propose("hello").await.unwrap();
/// assert_eq!(proposal.output, "world");
/// assert_eq!(proposal.trajectory.len(), 3);
/// assert_eq!(provider.call_count(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    call_count: Arc<Mutex<usize>>,
    trajectory: Option<Trajectory>,
    delay: Option<Duration>,
    ready: Arc<AtomicBool>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all inputs
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(0)),
            trajectory: None,
            delay: None,
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Add a specific response for a given input
    pub fn add_response(&mut self, input: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(input.into(), response.into());
    }

    /// Configure to return an error for a specific input
    pub fn add_error(&mut self, input: impl Into<String>) {
        lock(&self.responses).insert(input.into(), MOCK_ERROR.to_string());
    }

    /// Return this trajectory from every `propose` instead of deriving one
    pub fn with_trajectory(mut self, trajectory: Trajectory) -> Self {
        self.trajectory = Some(trajectory);
        self
    }

    /// Sleep before answering (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Start in the not-ready state
    pub fn offline(self) -> Self {
        self.ready.store(false, Ordering::SeqCst);
        self
    }

    /// Get the number of times `propose` or `review` was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }

    async fn respond(&self, input: &str) -> Result<String, LlmError> {
        *lock(&self.call_count) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = lock(&self.responses).get(input).cloned();
        match scripted {
            Some(response) if response == MOCK_ERROR => {
                Err(LlmError::Other("Mock error".to_string()))
            }
            Some(response) => Ok(response),
            None => Ok(self.default_response.clone()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Lifecycle for MockProvider {
    fn identity(&self) -> &str {
        "MOCK_PROVIDER"
    }

    async fn initialize(&self) -> Result<(), LlmError> {
        self.ready.store(true, Ordering::SeqCst);
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
impl Generator for MockProvider {
    async fn propose(&self, prompt: &str) -> Result<Proposal, LlmError> {
        let output = self.respond(prompt).await?;
        let trajectory = self
            .trajectory
            .clone()
            .unwrap_or_else(|| Trajectory::from_prompt(prompt));

        Ok(Proposal { trajectory, output })
    }
}

#[async_trait]
impl Validator for MockProvider {
    async fn review(&self, summary: &str) -> Result<String, LlmError> {
        self.respond(summary).await
    }
}
