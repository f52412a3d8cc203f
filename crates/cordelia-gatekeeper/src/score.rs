//! Deterministic admissibility scoring
//!
//! `action = T - V` where
//!
//! - `T = kinetic_weight * sum(velocities)`
//! - `V = potential_weight * sum(state penalties) + drift + convergence`
//!
//! `drift` is the fraction of suspect states and `convergence` the standard
//! deviation of the velocities capped at 1. Both grow with the number and
//! severity of violations and stay in [0, 1].

use crate::GateConfig;
use cordelia_domain::{CognitiveState, PenaltyBreakdown, ScoreComponents, Trajectory};
use regex::Regex;
use std::sync::LazyLock;

/// Identity of the in-process arbiter that applies the score threshold
pub const SCORE_ARBITER_ID: &str = "CORDELIA_ARBITER_LAG_v1";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern compiles")
});

/// Computes [`ScoreComponents`] for a trajectory
///
/// Pure: no clocks, no randomness, no shared state.
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    kinetic_weight: f64,
    potential_weight: f64,
    email_penalty: f64,
    phone_penalty: f64,
    length_penalty: f64,
    max_state_length: usize,
    digit_repeat_limit: usize,
}

impl ScoreEngine {
    /// Build an engine from the gate configuration
    pub fn new(config: &GateConfig) -> Self {
        Self {
            kinetic_weight: config.kinetic_weight,
            potential_weight: config.potential_weight,
            email_penalty: config.email_penalty,
            phone_penalty: config.phone_penalty,
            length_penalty: config.length_penalty,
            max_state_length: config.max_state_length,
            digit_repeat_limit: config.digit_repeat_limit,
        }
    }

    /// Score a trajectory
    pub fn compute(&self, trajectory: &Trajectory) -> ScoreComponents {
        if trajectory.is_empty() {
            return ScoreComponents::zero();
        }

        let kinetic = self.kinetic_weight * trajectory.velocities().iter().sum::<f64>();

        let mut raw_penalty = 0.0;
        let mut suspect_states = 0;
        for state in trajectory.states() {
            let penalty = self.state_penalty(state);
            if penalty > 0.0 {
                suspect_states += 1;
            }
            raw_penalty += penalty;
        }

        let penalties = PenaltyBreakdown {
            constraints: self.potential_weight * raw_penalty,
            drift: suspect_states as f64 / trajectory.len() as f64,
            convergence: convergence(trajectory.velocities()),
        };

        ScoreComponents::new(kinetic, penalties, suspect_states)
    }

    /// Sum of constraint penalties triggered by one state
    pub fn state_penalty(&self, state: &CognitiveState) -> f64 {
        let text = state.representation();
        let mut penalty = 0.0;

        if EMAIL_PATTERN.is_match(text) {
            penalty += self.email_penalty;
        }

        if self.has_repeated_digit(text) {
            penalty += self.phone_penalty;
        }

        if state.char_len() > self.max_state_length {
            penalty += self.length_penalty;
        }

        penalty
    }

    /// Any single digit occurring more than `digit_repeat_limit` times
    fn has_repeated_digit(&self, text: &str) -> bool {
        let mut counts = [0usize; 10];
        for c in text.chars() {
            if let Some(d) = c.to_digit(10) {
                counts[d as usize] += 1;
            }
        }
        counts.iter().any(|&n| n > self.digit_repeat_limit)
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

/// Standard deviation of the velocities, capped at 1
fn convergence(velocities: &[f64]) -> f64 {
    // Equal velocities are exactly zero spread; the mean may not be exact
    if velocities.windows(2).all(|w| w[0] == w[1]) {
        return 0.0;
    }
    let n = velocities.len() as f64;
    let mean = velocities.iter().sum::<f64>() / n;
    let variance = velocities.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt().min(1.0)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn compute_is_deterministic(prompt in ".{0,300}") {
            let engine = ScoreEngine::default();
            let trajectory = Trajectory::from_prompt(&prompt);
            let a = engine.compute(&trajectory);
            let b = engine.compute(&trajectory.clone());
            prop_assert_eq!(a.kinetic.to_bits(), b.kinetic.to_bits());
            prop_assert_eq!(a.potential.to_bits(), b.potential.to_bits());
            prop_assert_eq!(a.action.to_bits(), b.action.to_bits());
        }

        #[test]
        fn terms_are_non_negative_and_bounded(prompt in ".{0,600}") {
            let score = ScoreEngine::default().compute(&Trajectory::from_prompt(&prompt));
            prop_assert!(score.kinetic >= 0.0);
            prop_assert!(score.potential >= 0.0);
            prop_assert!((0.0..=1.0).contains(&score.penalties.drift));
            prop_assert!((0.0..=1.0).contains(&score.penalties.convergence));
            prop_assert!(score.is_finite());
        }

        #[test]
        fn embedded_email_is_never_admissible(
            local in "[a-z]{1,12}",
            domain in "[a-z]{1,12}",
            prefix in "[A-Za-z ]{0,40}",
        ) {
            let prompt = format!("{}{}@{}.com", prefix, local, domain);
            let score = ScoreEngine::default().compute(&Trajectory::from_prompt(&prompt));
            prop_assert!(score.action < 0.0);
        }
    }
}
