//! Sliding-window rate limiting per caller identity
//!
//! Process-local only: each server process keeps its own windows, so N
//! processes behind a balancer admit up to N times the configured cap.
//! There is no cross-process coordination.

use crate::GateConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window counter keyed by caller identity
///
/// Invariant: after a successful check, an identity's window holds at most
/// `limit` timestamps, all younger than `window`.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Allow `limit` requests per `window` per identity
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Build from the gate configuration
    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.rate_limit_count, config.rate_limit_window())
    }

    /// Requests allowed per window
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Window width
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `identity` now; false if the window is full
    pub fn check(&self, identity: &str) -> bool {
        self.check_at(identity, Instant::now())
    }

    /// Record a request for `identity` at `now`; false if the window is full
    ///
    /// Entries at least `window` old are pruned first. A rejected request
    /// is not recorded.
    pub fn check_at(&self, identity: &str, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let timestamps = windows.entry(identity.to_string()).or_default();

        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.limit {
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Requests currently counted against `identity`
    pub fn in_window(&self, identity: &str) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(identity)
            .map_or(0, VecDeque::len)
    }

    /// Number of identities with a window
    pub fn tracked_identities(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Forget every window
    pub fn reset(&self) {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
