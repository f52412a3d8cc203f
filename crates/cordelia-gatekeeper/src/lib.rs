//! Cordelia Gatekeeper
//!
//! The admissibility gate that sits between a caller and a generative
//! capability. Every request passes through, in order:
//!
//! - Shared-secret authentication (constant-time comparison)
//! - Per-identity sliding-window rate limiting
//! - Payload and prompt-length validation
//! - Proposal by the injected generator
//! - Deterministic action scoring (`action = T - V`)
//! - The admit/block decision, by score or by independent review
//!
//! Anything that goes wrong after input validation fails closed.
//!
//! # Examples
//!
//! ```
//! use cordelia_gatekeeper::{AdmissibilityGate, AuthGate, GateConfig, GateRequest, RateLimiter};
//! use cordelia_llm::{Lifecycle, StubNavigator};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let config = GateConfig::default();
//! let limiter = Arc::new(RateLimiter::from_config(&config));
//! let navigator = Arc::new(StubNavigator::new());
//! navigator.initialize().await.unwrap();
//!
//! let gate = AdmissibilityGate::new(config, AuthGate::new("secret"), limiter, navigator, None)
//!     .unwrap();
//! let outcome = gate
//!     .evaluate(GateRequest { credential: Some("secret"), body: br#"{"prompt": "Hello"}"# })
//!     .await
//!     .unwrap();
//! assert!(outcome.verdict.is_compliant());
//! # });
//! ```

#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod gate;
mod input;
mod rate_limit;
mod review;
mod score;

pub use auth::{redact, AuthGate, AuthOutcome};
pub use config::{GateConfig, ScoringMode};
pub use error::{GateError, GatekeeperError};
pub use gate::{AdmissibilityGate, GateOutcome, GateRequest, Stage};
pub use input::{parse_payload, InputValidator};
pub use rate_limit::RateLimiter;
pub use review::{build_summary, parse_review, ReviewError, ReviewVerdict, INTENT_EXCERPT_CHARS};
pub use score::{ScoreEngine, SCORE_ARBITER_ID};
