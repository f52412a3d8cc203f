//! Shared-secret authentication

use std::fmt;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

/// Result of checking a presented credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credential matches the configured secret
    Authorized,
    /// Credential missing or different
    Unauthorized,
    /// No secret configured; nobody can be authorized
    MisconfiguredServer,
}

/// Verifies the `X-Sovereign-Key` credential against one shared secret
#[derive(Clone)]
pub struct AuthGate {
    secret: Option<String>,
}

impl AuthGate {
    /// Create a gate for `secret`; an empty secret counts as unconfigured
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            secret: (!secret.is_empty()).then_some(secret),
        }
    }

    /// A gate with no secret (every check reports misconfiguration)
    pub fn unconfigured() -> Self {
        Self { secret: None }
    }

    /// Whether a secret is configured
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check a presented credential
    ///
    /// Success is silent; failures are logged without the key itself.
    pub fn check(&self, presented: Option<&str>) -> AuthOutcome {
        let Some(secret) = self.secret.as_deref() else {
            error!("ARCHITECT_KEY not configured in environment");
            return AuthOutcome::MisconfiguredServer;
        };

        let presented = presented.unwrap_or("");
        if constant_time_eq(presented.as_bytes(), secret.as_bytes()) {
            AuthOutcome::Authorized
        } else {
            warn!(
                presented = %redact(presented),
                "Authentication failed: invalid X-Sovereign-Key header"
            );
            AuthOutcome::Unauthorized
        }
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Byte comparison without early exit on the first mismatch
///
/// Only the length difference is observable.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).unwrap_u8() == 1
}

/// Log-safe stand-in for a credential
pub fn redact(key: &str) -> String {
    if key.is_empty() {
        "<missing>".to_string()
    } else {
        format!("<redacted:{} chars>", key.chars().count())
    }
}
