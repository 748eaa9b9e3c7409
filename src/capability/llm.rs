//! Language-model capability boundary.
//!
//! `generate` is only ever invoked from inside an isolated execution unit
//! (`advice::executor`), never directly from a pipeline worker.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model generation failed: {0}")]
    Failed(String),
}

/// Trait for the external language model.
pub trait LanguageModel: Send + Sync {
    /// Generate raw text for a prompt, bounded by a token budget.
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ModelError>;
}

enum MockBehavior {
    Respond(Vec<String>),
    Fail(String),
    Panic,
    Hang,
    Delay(Duration, String),
}

/// Mock language model for testing the primary advice path.
///
/// Counts calls so tests can verify the circuit breaker stops attempting
/// the primary path.
pub struct MockLanguageModel {
    behavior: MockBehavior,
    next: Mutex<usize>,
    calls: AtomicU32,
}

impl MockLanguageModel {
    /// Always return the same response.
    pub fn responding(response: &str) -> Self {
        Self::with_responses(&[response])
    }

    /// Rotate through responses, one per call.
    pub fn with_responses(responses: &[&str]) -> Self {
        Self {
            behavior: MockBehavior::Respond(responses.iter().map(|s| s.to_string()).collect()),
            next: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Always fail with an error.
    pub fn failing(message: &str) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.to_string()),
            next: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Panic on every call, simulating a crash in inference.
    pub fn crashing() -> Self {
        Self {
            behavior: MockBehavior::Panic,
            next: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Never return, simulating a hung inference process.
    pub fn hanging() -> Self {
        Self {
            behavior: MockBehavior::Hang,
            next: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Respond after a fixed delay.
    pub fn slow(delay: Duration, response: &str) -> Self {
        Self {
            behavior: MockBehavior::Delay(delay, response.to_string()),
            next: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for MockLanguageModel {
    fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Respond(responses) => {
                let mut next = self
                    .next
                    .lock()
                    .map_err(|_| ModelError::Failed("mock model poisoned".to_string()))?;
                let response = responses[*next % responses.len()].clone();
                *next += 1;
                Ok(response)
            }
            MockBehavior::Fail(message) => Err(ModelError::Failed(message.clone())),
            MockBehavior::Panic => panic!("mock model crash"),
            MockBehavior::Hang => loop {
                std::thread::park();
            },
            MockBehavior::Delay(delay, response) => {
                std::thread::sleep(*delay);
                Ok(response.clone())
            }
        }
    }
}
