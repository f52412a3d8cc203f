//! Gatekeeper configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which signal decides admissibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Admit iff `action >= 0`
    #[default]
    Score,
    /// Admit iff the independent validator says `admissible: true`
    Review,
}

impl ScoringMode {
    /// Configuration label
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Score => "score",
            ScoringMode::Review => "review",
        }
    }

    /// Parse a mode label (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "score" => Some(ScoringMode::Score),
            "review" => Some(ScoringMode::Review),
            _ => None,
        }
    }
}

/// Configuration for the admissibility gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Maximum prompt length in characters
    pub max_prompt_length: usize,

    /// Requests allowed per identity per window
    pub rate_limit_count: usize,

    /// Sliding window width in seconds
    pub rate_limit_period_secs: u64,

    /// Decision signal
    pub scoring_mode: ScoringMode,

    /// Multiplier on the summed velocities (`T`)
    pub kinetic_weight: f64,

    /// Multiplier on the summed per-state penalties
    pub potential_weight: f64,

    /// Penalty for an email-like substring in a state
    pub email_penalty: f64,

    /// Penalty for a digit repeated more than `digit_repeat_limit` times
    pub phone_penalty: f64,

    /// Penalty for a state longer than `max_state_length`
    pub length_penalty: f64,

    /// Longest state (characters) that is not penalized
    pub max_state_length: usize,

    /// Occurrences of one digit tolerated before the phone penalty applies
    pub digit_repeat_limit: usize,

    /// Upper bound on a generator call (milliseconds)
    pub generator_timeout_ms: u64,

    /// Upper bound on a validator call (milliseconds)
    pub validator_timeout_ms: u64,

    /// Loss reported when validation is inconclusive
    pub inconclusive_loss: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_prompt_length: 2048,
            rate_limit_count: 10,
            rate_limit_period_secs: 60,
            scoring_mode: ScoringMode::Score,
            kinetic_weight: 1.0,
            potential_weight: 1.0,
            email_penalty: 2.0,
            phone_penalty: 1.5,
            length_penalty: 1.0,
            max_state_length: 500,
            digit_repeat_limit: 3,
            generator_timeout_ms: 30_000,
            validator_timeout_ms: 30_000,
            inconclusive_loss: 1.0,
        }
    }
}

impl GateConfig {
    /// Strict preset: fewer requests, shorter prompts, heavier penalties
    pub fn strict() -> Self {
        Self {
            max_prompt_length: 1024,
            rate_limit_count: 5,
            potential_weight: 1.5,
            generator_timeout_ms: 10_000,
            validator_timeout_ms: 10_000,
            ..Self::default()
        }
    }

    /// Permissive preset: generous limits for local development
    pub fn permissive() -> Self {
        Self {
            max_prompt_length: 8192,
            rate_limit_count: 100,
            potential_weight: 0.5,
            ..Self::default()
        }
    }

    /// Sliding window as a Duration
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_period_secs)
    }

    /// Generator timeout as a Duration
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_millis(self.generator_timeout_ms)
    }

    /// Validator timeout as a Duration
    pub fn validator_timeout(&self) -> Duration {
        Duration::from_millis(self.validator_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_prompt_length == 0 {
            return Err("max_prompt_length must be greater than 0".to_string());
        }
        if self.rate_limit_count == 0 {
            return Err("rate_limit_count must be greater than 0".to_string());
        }
        if self.rate_limit_period_secs == 0 {
            return Err("rate_limit_period_secs must be greater than 0".to_string());
        }
        if self.generator_timeout_ms == 0 || self.validator_timeout_ms == 0 {
            return Err("timeouts must be greater than 0".to_string());
        }

        let weights = [
            ("kinetic_weight", self.kinetic_weight),
            ("potential_weight", self.potential_weight),
            ("email_penalty", self.email_penalty),
            ("phone_penalty", self.phone_penalty),
            ("length_penalty", self.length_penalty),
            ("inconclusive_loss", self.inconclusive_loss),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a finite non-negative number", name));
            }
        }

        Ok(())
    }
}
