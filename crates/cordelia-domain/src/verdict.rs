//! Decided outcomes of the admissibility gate

use crate::ScoreComponents;

/// Trajectory label reported alongside a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryStatus {
    /// The trajectory may be released
    Admissible,
    /// The trajectory was stopped
    Blocked,
}

impl TrajectoryStatus {
    /// Wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            TrajectoryStatus::Admissible => "TRAJECTORY_ADMISSIBLE",
            TrajectoryStatus::Blocked => "TRAJECTORY_BLOCKED",
        }
    }
}

/// Why a completed request was intercepted
#[derive(Debug, Clone, PartialEq)]
pub enum InterceptReason {
    /// Score-only mode: `action < 0`
    ActionThresholdViolation,

    /// Validator-backed mode: the validator flagged a violation
    AxiomViolation(String),

    /// Validator reply missing, late, or malformed (fail-closed)
    ValidationInconclusive(String),
}

impl InterceptReason {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            InterceptReason::ActionThresholdViolation => "action_threshold_violation",
            InterceptReason::AxiomViolation(_) => "axiom_violation",
            InterceptReason::ValidationInconclusive(_) => "validation_inconclusive",
        }
    }

    /// Human-readable detail
    pub fn detail(&self) -> String {
        match self {
            InterceptReason::ActionThresholdViolation => {
                "Action below admissibility threshold: constraint violation detected".to_string()
            }
            InterceptReason::AxiomViolation(violation) => {
                format!("Axiom violation detected: {}", violation)
            }
            InterceptReason::ValidationInconclusive(cause) => {
                format!("Arbiter validation inconclusive: {}", cause)
            }
        }
    }
}

/// Decided outcome for one request
///
/// Requests that never reach a decision (bad credentials, rate limits,
/// malformed input, generator failure) are reported as errors by the
/// gatekeeper instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Admitted: the output may be released
    Compliant {
        /// Score of the proposed trajectory
        score: ScoreComponents,
        /// Reported loss (`V`, or the validator's loss in review mode)
        total_loss: f64,
        /// The admitted output
        output: String,
    },

    /// Blocked: the output is withheld
    Intercepted {
        /// Score of the proposed trajectory
        score: ScoreComponents,
        /// Reported loss (`V`, or the validator's loss in review mode)
        total_loss: f64,
        /// Why it was blocked
        reason: InterceptReason,
    },
}

impl Verdict {
    /// True for [`Verdict::Compliant`]
    pub fn is_compliant(&self) -> bool {
        matches!(self, Verdict::Compliant { .. })
    }

    /// Wire status: `compliant` or `intercepted`
    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Compliant { .. } => "compliant",
            Verdict::Intercepted { .. } => "intercepted",
        }
    }

    /// Trajectory label matching the decision
    pub fn trajectory_status(&self) -> TrajectoryStatus {
        match self {
            Verdict::Compliant { .. } => TrajectoryStatus::Admissible,
            Verdict::Intercepted { .. } => TrajectoryStatus::Blocked,
        }
    }

    /// Score components regardless of outcome
    pub fn score(&self) -> &ScoreComponents {
        match self {
            Verdict::Compliant { score, .. } | Verdict::Intercepted { score, .. } => score,
        }
    }

    /// Action of the scored trajectory
    pub fn action(&self) -> f64 {
        self.score().action
    }

    /// Reported loss
    pub fn total_loss(&self) -> f64 {
        match self {
            Verdict::Compliant { total_loss, .. } | Verdict::Intercepted { total_loss, .. } => {
                *total_loss
            }
        }
    }

    /// Admitted output, only present when compliant
    pub fn output(&self) -> Option<&str> {
        match self {
            Verdict::Compliant { output, .. } => Some(output),
            Verdict::Intercepted { .. } => None,
        }
    }

    /// Interception reason, only present when intercepted
    pub fn reason(&self) -> Option<&InterceptReason> {
        match self {
            Verdict::Compliant { .. } => None,
            Verdict::Intercepted { reason, .. } => Some(reason),
        }
    }
}
