//! Coaching advice generation.
//!
//! Two paths produce advice: the primary language model, executed in
//! isolation with a hard deadline, and a rule-based classifier that can
//! never fail. A one-directional breaker switches the session to the rule
//! path after repeated primary failures.

pub mod engine;
pub mod executor;
pub mod parse;
pub mod prompt;
pub mod rules;

pub use engine::{AdviceEngine, AdviceOutcome, PrimaryFailure};
pub use executor::{AdviceExecutor, ExecError, ProcessExecutor, ThreadExecutor};
