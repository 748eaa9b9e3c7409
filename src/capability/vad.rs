//! Voice-activity scoring capability boundary.
//!
//! The primary detector is an external model. The activity gate must not
//! depend on it succeeding; the energy fallback lives in `audio::gate`.

use crate::pipeline::types::AudioChunk;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("voice activity model unavailable")]
    ModelUnavailable,

    #[error("voice activity scoring failed: {0}")]
    Failed(String),
}

/// Trait for the primary voice-activity detector.
pub trait VoiceScorer: Send + Sync {
    /// Returns a speech confidence in [0, 1] for the chunk.
    fn score(&self, chunk: &AudioChunk) -> Result<f32, ScorerError>;
}

/// Mock scorer for testing.
pub struct MockScorer {
    score: f32,
    unavailable: bool,
    calls: AtomicU32,
}

impl MockScorer {
    /// Create a mock that returns a fixed confidence.
    pub fn new(score: f32) -> Self {
        Self {
            score,
            unavailable: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Configure the mock to fail with `ModelUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            score: 0.0,
            unavailable: true,
            calls: AtomicU32::new(0),
        }
    }

    /// Number of times `score` was called.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VoiceScorer for MockScorer {
    fn score(&self, _chunk: &AudioChunk) -> Result<f32, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            Err(ScorerError::ModelUnavailable)
        } else {
            Ok(self.score)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn chunk() -> AudioChunk {
        AudioChunk::new(vec![1000i16; 160], 16000, Instant::now())
    }

    #[test]
    fn test_mock_scorer_returns_score() {
        let scorer = MockScorer::new(0.9);
        assert_eq!(scorer.score(&chunk()).unwrap(), 0.9);
        assert_eq!(scorer.call_count(), 1);
    }

    #[test]
    fn test_mock_scorer_unavailable() {
        let scorer = MockScorer::unavailable();
        assert!(matches!(
            scorer.score(&chunk()),
            Err(ScorerError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_scorer_trait_is_object_safe() {
        let scorer: Box<dyn VoiceScorer> = Box::new(MockScorer::new(0.5));
        assert_eq!(scorer.score(&chunk()).unwrap(), 0.5);
    }
}
