//! In-process navigator
//!
//! Needs no backend: it derives the standard three-stage trajectory from
//! the prompt and a short vision line as output. This is the default
//! generator and what the score-only pipeline runs against.

use crate::traits::{Generator, Lifecycle, Proposal};
use crate::LlmError;
use async_trait::async_trait;
use cordelia_domain::Trajectory;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identity reported for the stub navigator
pub const STUB_NAVIGATOR_ID: &str = "NAVIGATOR_LAG_v1";

/// Characters of the prompt echoed in the vision line
const VISION_EXCERPT_CHARS: usize = 50;

/// Deterministic, backend-free generator
#[derive(Debug, Default)]
pub struct StubNavigator {
    ready: AtomicBool,
}

impl StubNavigator {
    /// Create a navigator; call [`Lifecycle::initialize`] before use
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Lifecycle for StubNavigator {
    fn identity(&self) -> &str {
        STUB_NAVIGATOR_ID
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
impl Generator for StubNavigator {
    async fn propose(&self, prompt: &str) -> Result<Proposal, LlmError> {
        if !self.is_ready() {
            return Err(LlmError::NotReady(STUB_NAVIGATOR_ID.to_string()));
        }

        let trajectory = Trajectory::from_prompt(prompt);
        let excerpt: String = prompt.chars().take(VISION_EXCERPT_CHARS).collect();
        let output = format!(
            "VISION_OUTPUT: {}... -> [{} states]",
            excerpt,
            trajectory.len()
        );

        Ok(Proposal { trajectory, output })
    }
}
