//! The admissibility gate: one pipeline run per request
//!
//! ```text
//! Received -> Authenticated -> RateChecked -> InputValidated
//!          -> Proposed -> Scored -> Decided
//! ```
//!
//! Cheap checks run first and short-circuit, so a request that cannot pass
//! never reaches the generator or validator. The admit/block rule is applied
//! only once the full score (and, in review mode, the validator's verdict)
//! is available.

use crate::auth::{redact, AuthGate, AuthOutcome};
use crate::review::{build_summary, parse_review};
use crate::score::{ScoreEngine, SCORE_ARBITER_ID};
use crate::{GateConfig, GateError, GatekeeperError, InputValidator, RateLimiter, ScoringMode};
use cordelia_domain::{InterceptReason, ScoreComponents, Verdict};
use cordelia_llm::{Generator, Lifecycle, LlmError, Proposal, Validator};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Violation text used when the validator blocks without naming one
const UNSPECIFIED_VIOLATION: &str = "Potential energy spike detected";

/// Pipeline stage, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Request arrived
    Received,
    /// Credential verified
    Authenticated,
    /// Rate-limit charge recorded
    RateChecked,
    /// Payload parsed and bounded
    InputValidated,
    /// Generator produced a candidate
    Proposed,
    /// Score (and review) computed
    Scored,
    /// Verdict reached
    Decided,
}

impl Stage {
    /// Stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Authenticated => "authenticated",
            Stage::RateChecked => "rate_checked",
            Stage::InputValidated => "input_validated",
            Stage::Proposed => "proposed",
            Stage::Scored => "scored",
            Stage::Decided => "decided",
        }
    }
}

/// One inbound request, as seen by the gate
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    /// Presented `X-Sovereign-Key`, if any
    pub credential: Option<&'a str>,
    /// Raw request body
    pub body: &'a [u8],
}

/// A decided request
#[derive(Debug, Clone)]
pub struct GateOutcome {
    /// Correlates log lines for this request
    pub request_id: Uuid,
    /// The decision
    pub verdict: Verdict,
    /// Wall time spent in the pipeline
    pub latency_ms: u64,
    /// Identity of the generator that proposed the candidate
    pub navigator: String,
    /// Identity of whatever applied the admissibility rule
    pub arbiter: String,
}

/// Orchestrates auth, rate limiting, input checks, proposal, scoring and
/// the final decision
pub struct AdmissibilityGate {
    config: GateConfig,
    auth: AuthGate,
    limiter: Arc<RateLimiter>,
    input: InputValidator,
    engine: ScoreEngine,
    generator: Arc<dyn Generator>,
    validator: Option<Arc<dyn Validator>>,
}

impl AdmissibilityGate {
    /// Assemble a gate from its injected collaborators
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, or if review mode is
    /// configured without a validator.
    pub fn new(
        config: GateConfig,
        auth: AuthGate,
        limiter: Arc<RateLimiter>,
        generator: Arc<dyn Generator>,
        validator: Option<Arc<dyn Validator>>,
    ) -> Result<Self, GatekeeperError> {
        config.validate().map_err(GatekeeperError::Config)?;

        if config.scoring_mode == ScoringMode::Review && validator.is_none() {
            return Err(GatekeeperError::Config(
                "review scoring mode requires a validator".to_string(),
            ));
        }

        Ok(Self {
            input: InputValidator::new(config.max_prompt_length),
            engine: ScoreEngine::new(&config),
            config,
            auth,
            limiter,
            generator,
            validator,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The shared rate limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The injected generator
    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    /// The injected validator, if any
    pub fn validator(&self) -> Option<&Arc<dyn Validator>> {
        self.validator.as_ref()
    }

    /// Whether a shared secret is configured
    pub fn auth_configured(&self) -> bool {
        self.auth.is_configured()
    }

    /// Identity of the component applying the admissibility rule
    pub fn arbiter_identity(&self) -> String {
        match (self.config.scoring_mode, &self.validator) {
            (ScoringMode::Review, Some(validator)) => validator.identity().to_string(),
            _ => SCORE_ARBITER_ID.to_string(),
        }
    }

    /// Bring up the generator and validator
    ///
    /// Each capability is initialized even if the other fails. The first
    /// error is returned but leaves the gate usable: requests fail closed
    /// while a capability is not ready.
    pub async fn initialize(&self) -> Result<(), LlmError> {
        let generator = self.generator.initialize().await;
        if let Err(e) = &generator {
            error!(
                capability = self.generator.identity(),
                error = %e,
                "Generator initialization failed"
            );
        }

        let validator = match &self.validator {
            Some(validator) => {
                let result = validator.initialize().await;
                if let Err(e) = &result {
                    error!(
                        capability = validator.identity(),
                        error = %e,
                        "Validator initialization failed"
                    );
                }
                result
            }
            None => Ok(()),
        };

        generator.and(validator)
    }

    /// Shut down the generator and validator
    pub async fn shutdown(&self) {
        self.generator.shutdown().await;
        if let Some(validator) = &self.validator {
            validator.shutdown().await;
        }
    }

    /// Run the full pipeline for one request
    pub async fn evaluate(&self, request: GateRequest<'_>) -> Result<GateOutcome, GateError> {
        let started = Instant::now();
        let request_id = Uuid::now_v7();
        trace_stage(request_id, Stage::Received);

        // Authenticate
        let identity = match self.auth.check(request.credential) {
            AuthOutcome::Authorized => request.credential.unwrap_or_default(),
            AuthOutcome::Unauthorized => return Err(GateError::Unauthorized),
            AuthOutcome::MisconfiguredServer => return Err(GateError::ServerMisconfigured),
        };
        trace_stage(request_id, Stage::Authenticated);

        // Rate limit
        if !self.limiter.check(identity) {
            warn!(
                request_id = %request_id,
                key = %redact(identity),
                "Rate limit exceeded"
            );
            return Err(GateError::RateLimited {
                limit: self.limiter.limit(),
                window_secs: self.limiter.window().as_secs(),
            });
        }
        trace_stage(request_id, Stage::RateChecked);

        // Bounds-check input
        let prompt = self.input.validate(request.body)?;
        trace_stage(request_id, Stage::InputValidated);

        // Propose
        let proposal = self.propose(request_id, &prompt).await?;
        trace_stage(request_id, Stage::Proposed);

        // Score
        let score = self.engine.compute(&proposal.trajectory);
        if !score.is_finite() {
            error!(
                request_id = %request_id,
                kinetic = score.kinetic,
                potential = score.potential,
                "Non-finite score"
            );
            return Err(GateError::Internal("non-finite score".to_string()));
        }
        info!(
            request_id = %request_id,
            constraints = score.penalties.constraints,
            drift = score.penalties.drift,
            convergence = score.penalties.convergence,
            suspect_states = score.suspect_states,
            "Score components"
        );
        trace_stage(request_id, Stage::Scored);

        // Decide
        let verdict = match self.config.scoring_mode {
            ScoringMode::Score => decide_by_score(score, proposal.output),
            ScoringMode::Review => self.decide_by_review(request_id, &prompt, proposal, score).await,
        };
        trace_stage(request_id, Stage::Decided);

        info!(
            request_id = %request_id,
            kinetic = verdict.score().kinetic,
            potential = verdict.score().potential,
            action = verdict.action(),
            total_loss = verdict.total_loss(),
            decision = verdict.status(),
            mode = self.config.scoring_mode.as_str(),
            "Trajectory decided"
        );

        Ok(GateOutcome {
            request_id,
            verdict,
            latency_ms: started.elapsed().as_millis() as u64,
            navigator: self.generator.identity().to_string(),
            arbiter: self.arbiter_identity(),
        })
    }

    async fn propose(&self, request_id: Uuid, prompt: &str) -> Result<Proposal, GateError> {
        if !self.generator.is_ready() {
            warn!(request_id = %request_id, "Generator not ready");
            return Err(GateError::GeneratorUnavailable(format!(
                "{} is not ready",
                self.generator.identity()
            )));
        }

        let proposal = tokio::time::timeout(
            self.config.generator_timeout(),
            self.generator.propose(prompt),
        )
        .await
        .map_err(|_| {
            warn!(request_id = %request_id, "Generator timed out");
            GateError::GeneratorUnavailable("generator timed out".to_string())
        })?
        .map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Generator failed");
            GateError::GeneratorUnavailable(e.to_string())
        })?;

        if proposal.is_empty() {
            warn!(request_id = %request_id, "Generator returned an empty proposal");
            return Err(GateError::GeneratorUnavailable(
                "generator returned an empty proposal".to_string(),
            ));
        }

        Ok(proposal)
    }

    async fn decide_by_review(
        &self,
        request_id: Uuid,
        prompt: &str,
        proposal: Proposal,
        score: ScoreComponents,
    ) -> Verdict {
        match self.review(request_id, prompt, &proposal, &score).await {
            Ok(review) if review.admissible => Verdict::Compliant {
                score,
                total_loss: review.action_loss,
                output: proposal.output,
            },
            Ok(review) => Verdict::Intercepted {
                score,
                total_loss: review.action_loss,
                reason: InterceptReason::AxiomViolation(
                    review
                        .violation
                        .unwrap_or_else(|| UNSPECIFIED_VIOLATION.to_string()),
                ),
            },
            Err(GateError::ValidationInconclusive(cause)) => Verdict::Intercepted {
                score,
                total_loss: self.config.inconclusive_loss,
                reason: InterceptReason::ValidationInconclusive(cause),
            },
            Err(other) => Verdict::Intercepted {
                score,
                total_loss: self.config.inconclusive_loss,
                reason: InterceptReason::ValidationInconclusive(other.to_string()),
            },
        }
    }

    async fn review(
        &self,
        request_id: Uuid,
        prompt: &str,
        proposal: &Proposal,
        score: &ScoreComponents,
    ) -> Result<crate::ReviewVerdict, GateError> {
        let validator = self
            .validator
            .as_ref()
            .ok_or_else(|| GateError::ValidationInconclusive("no validator".to_string()))?;

        if !validator.is_ready() {
            warn!(request_id = %request_id, "Validator not ready");
            return Err(GateError::ValidationInconclusive(format!(
                "{} is not ready",
                validator.identity()
            )));
        }

        let summary = build_summary(prompt, proposal, score);
        let reply = tokio::time::timeout(self.config.validator_timeout(), validator.review(&summary))
            .await
            .map_err(|_| GateError::ValidationInconclusive("validator timed out".to_string()))?
            .map_err(|e| GateError::ValidationInconclusive(e.to_string()))?;

        parse_review(&reply).map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Failed to parse validator reply");
            GateError::ValidationInconclusive(e.to_string())
        })
    }
}

fn decide_by_score(score: ScoreComponents, output: String) -> Verdict {
    let total_loss = score.potential;
    if score.is_admissible() {
        Verdict::Compliant {
            score,
            total_loss,
            output,
        }
    } else {
        Verdict::Intercepted {
            score,
            total_loss,
            reason: InterceptReason::ActionThresholdViolation,
        }
    }
}

fn trace_stage(request_id: Uuid, stage: Stage) {
    debug!(request_id = %request_id, stage = stage.as_str(), "Pipeline stage");
}
