//! Capability interfaces consumed by the admissibility gate
//!
//! The gate never talks to a concrete backend: it holds `Arc<dyn Generator>`
//! and `Arc<dyn Validator>` handed to it at construction time. Both share
//! the [`Lifecycle`] contract so the server can bring them up and down
//! explicitly instead of on first use.

use crate::LlmError;
use async_trait::async_trait;
use cordelia_domain::Trajectory;

/// A candidate produced by a [`Generator`]
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// The states the prompt passed through
    pub trajectory: Trajectory,
    /// The candidate output text
    pub output: String,
}

impl Proposal {
    /// True when there is nothing to score or release
    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty() || self.output.trim().is_empty()
    }
}

/// Explicit lifecycle for an external capability
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Stable identity reported in responses and logs
    fn identity(&self) -> &str;

    /// Bring the capability up (probe the backend, warm connections)
    async fn initialize(&self) -> Result<(), LlmError>;

    /// Whether the capability can currently serve calls
    fn is_ready(&self) -> bool;

    /// Release resources; afterwards `is_ready` returns false
    async fn shutdown(&self);
}

/// Proposes a candidate trajectory and output from a prompt
#[async_trait]
pub trait Generator: Lifecycle {
    /// Propose a candidate for `prompt`
    async fn propose(&self, prompt: &str) -> Result<Proposal, LlmError>;
}

/// Independently reviews a redacted summary of a candidate
///
/// Returns the raw reply; the gatekeeper owns parsing so that every
/// backend is held to the same strict schema.
#[async_trait]
pub trait Validator: Lifecycle {
    /// Review `summary` and return the backend's verbatim reply
    async fn review(&self, summary: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_proposal() {
        let proposal = Proposal {
            trajectory: Trajectory::empty(),
            output: "text".to_string(),
        };
        assert!(proposal.is_empty());

        let proposal = Proposal {
            trajectory: Trajectory::from_prompt("x"),
            output: "   ".to_string(),
        };
        assert!(proposal.is_empty());

        let proposal = Proposal {
            trajectory: Trajectory::from_prompt("x"),
            output: "text".to_string(),
        };
        assert!(!proposal.is_empty());
    }
}
