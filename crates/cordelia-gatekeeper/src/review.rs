//! Independent review: the summary sent out and the verdict parsed back
//!
//! The validator only ever sees a summary (an intent excerpt plus numbers
//! about the candidate), never the candidate output itself. Its reply must
//! be a bare JSON object of a fixed shape; anything else is a typed error
//! that the gate turns into a blocked request.

use cordelia_domain::{ScoreComponents, TrajectoryStatus};
use cordelia_llm::Proposal;
use serde::Deserialize;
use thiserror::Error;

/// Characters of the prompt included in the summary
pub const INTENT_EXCERPT_CHARS: usize = 200;

/// Why a validator reply was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReviewError {
    /// Not a JSON object of the expected shape
    #[error("Malformed validator reply: {0}")]
    Malformed(String),

    /// Well-formed but self-contradictory or out of range
    #[error("Inconsistent validator reply: {0}")]
    Inconsistent(String),
}

/// Structured verdict returned by the validator
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewVerdict {
    /// Whether the candidate may be released
    pub admissible: bool,
    /// `TRAJECTORY_ADMISSIBLE` or `TRAJECTORY_BLOCKED`
    pub status: String,
    /// Non-negative loss reported by the validator
    pub action_loss: f64,
    /// Violation description when blocked
    #[serde(default)]
    pub violation: Option<String>,
}

/// Parse a validator reply strictly
///
/// No fence stripping or substring extraction: the reply (after trimming
/// whitespace) must itself be the JSON object.
pub fn parse_review(reply: &str) -> Result<ReviewVerdict, ReviewError> {
    let verdict: ReviewVerdict = serde_json::from_str(reply.trim())
        .map_err(|e| ReviewError::Malformed(e.to_string()))?;

    let expected = if verdict.admissible {
        TrajectoryStatus::Admissible
    } else {
        TrajectoryStatus::Blocked
    };
    if verdict.status != expected.as_str() {
        return Err(ReviewError::Inconsistent(format!(
            "admissible={} but status={}",
            verdict.admissible, verdict.status
        )));
    }

    if !verdict.action_loss.is_finite() || verdict.action_loss < 0.0 {
        return Err(ReviewError::Inconsistent(format!(
            "action_loss {} is not a non-negative number",
            verdict.action_loss
        )));
    }

    Ok(verdict)
}

/// Redacted summary of a candidate for the validator
pub fn build_summary(prompt: &str, proposal: &Proposal, score: &ScoreComponents) -> String {
    let excerpt: String = prompt.chars().take(INTENT_EXCERPT_CHARS).collect();

    format!(
        "Evaluate this proposed output for axiomatic compliance:\n\n\
         USER_INTENT: {}...\n\
         OUTPUT_LENGTH: {} chars\n\
         STATE_COUNT: {}\n\
         SUSPECT_STATES: {}\n\
         KINETIC: {:.4}\n\
         POTENTIAL: {:.4}\n\n\
         Check for:\n\
         1. PII exposure risk\n\
         2. Harmful content patterns\n\
         3. Integrity violations\n\
         4. Constraint breaches\n\n\
         Respond with JSON only.",
        excerpt,
        proposal.output.chars().count(),
        proposal.trajectory.len(),
        score.suspect_states,
        score.kinetic,
        score.potential,
    )
}
