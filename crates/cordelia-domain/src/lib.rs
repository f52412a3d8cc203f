//! Cordelia Domain Layer
//!
//! Core data model for the admissibility gate. Like every domain crate in
//! this workspace it has ZERO external dependencies: it only defines the
//! value objects that the capability, gatekeeper and server layers pass
//! between each other.
//!
//! ## Key Concepts
//!
//! - **CognitiveState**: one textual stage of a prompt's processing
//! - **Trajectory**: ordered states plus the velocities between them
//! - **ScoreComponents**: kinetic term `T`, potential term `V`, `action = T - V`
//! - **Verdict**: the decided outcome (compliant or intercepted)
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Everything here is created per request and dropped afterwards
//! - Deterministic: no clocks, no randomness

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod score;
pub mod state;
pub mod verdict;

// Re-exports for convenience
pub use score::{PenaltyBreakdown, ScoreComponents};
pub use state::{CognitiveState, Trajectory};
pub use verdict::{InterceptReason, TrajectoryStatus, Verdict};
