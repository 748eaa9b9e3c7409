//! The advice engine: primary model first, rules as the safety net.

use crate::advice::executor::{AdviceExecutor, ExecError};
use crate::advice::{parse, prompt, rules};
use crate::config::AdviceConfig;
use crate::pipeline::types::{AdviceSource, CoachingAdvice, Turn};
use crate::session::Mode;
use std::sync::Arc;

/// Why a primary model attempt did not produce advice for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryFailure {
    Timeout,
    Crashed,
    Unparseable,
}

impl std::fmt::Display for PrimaryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Crashed => write!(f, "crashed"),
            Self::Unparseable => write!(f, "produced unparseable output"),
        }
    }
}

/// Advice for one turn, plus whether the primary model failed producing it.
pub struct AdviceOutcome {
    pub advice: CoachingAdvice,
    pub failure: Option<PrimaryFailure>,
}

/// Produces advice for each turn.
///
/// The engine itself holds no session state; the caller passes the current
/// mode in and records the outcome's success or failure against the
/// session breaker.
pub struct AdviceEngine {
    executor: Option<Arc<dyn AdviceExecutor>>,
    config: AdviceConfig,
}

impl AdviceEngine {
    pub fn new(executor: Option<Arc<dyn AdviceExecutor>>, config: AdviceConfig) -> Self {
        Self { executor, config }
    }

    /// How many preceding turns to include as prompt context.
    pub fn context_turns(&self) -> usize {
        self.config.context_turns
    }

    /// Consecutive failures that open the session breaker.
    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    /// Advise on a turn. Always returns advice; the primary model is only
    /// attempted while the breaker is closed and an executor is wired in.
    pub fn advise(&self, mode: Mode, context: &[Turn], turn: &Turn) -> AdviceOutcome {
        let Some(executor) = &self.executor else {
            return self.fallback(turn, None);
        };
        if mode == Mode::FallbackActive {
            return self.fallback(turn, None);
        }
        match self.primary(executor.as_ref(), context, turn) {
            Ok(advice) => AdviceOutcome {
                advice,
                failure: None,
            },
            Err(failure) => self.fallback(turn, Some(failure)),
        }
    }

    fn primary(
        &self,
        executor: &dyn AdviceExecutor,
        context: &[Turn],
        turn: &Turn,
    ) -> Result<CoachingAdvice, PrimaryFailure> {
        let raw = self.run(executor, &prompt::build_prompt(context, turn))?;
        if let Some(payload) = parse::parse_advice(&raw) {
            return Ok(Self::from_payload(turn.id, payload));
        }
        // One retry with a stricter prompt before giving up on this turn.
        let raw = self.run(executor, &prompt::strict_retry_prompt(context, turn))?;
        match parse::parse_advice(&raw) {
            Some(payload) => Ok(Self::from_payload(turn.id, payload)),
            None => Err(PrimaryFailure::Unparseable),
        }
    }

    fn run(&self, executor: &dyn AdviceExecutor, prompt: &str) -> Result<String, PrimaryFailure> {
        executor
            .execute(prompt, self.config.max_tokens, self.config.model_timeout())
            .map_err(|e| match e {
                ExecError::Timeout(_) => PrimaryFailure::Timeout,
                ExecError::Crashed(_) | ExecError::Unavailable(_) => PrimaryFailure::Crashed,
            })
    }

    fn from_payload(turn_id: u64, payload: parse::AdvicePayload) -> CoachingAdvice {
        CoachingAdvice {
            turn_id,
            priority: payload.priority,
            category: payload.category,
            insight: payload.insight,
            action: payload.action,
            source: AdviceSource::PrimaryModel,
        }
    }

    fn fallback(&self, turn: &Turn, failure: Option<PrimaryFailure>) -> AdviceOutcome {
        AdviceOutcome {
            advice: rules::advise(turn.id, &turn.text),
            failure,
        }
    }
}
