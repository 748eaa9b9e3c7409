//! Speech-recognition capability boundary.

use crate::pipeline::types::SpeechSegment;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Result of recognizing one speech segment.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub confidence: f32,
    pub language: String,
}

#[derive(Error, Debug)]
pub enum RecognizerError {
    /// The recognizer judged the segment to contain no speech.
    ///
    /// Expected and frequent for borderline segments; callers drop the
    /// segment silently rather than treating this as a failure.
    #[error("no speech detected")]
    NoSpeechDetected,

    #[error("recognition failed: {0}")]
    Failed(String),
}

/// Trait for the external speech recognizer.
pub trait Recognizer: Send + Sync {
    fn transcribe(&self, segment: &SpeechSegment) -> Result<Transcript, RecognizerError>;
}

/// Mock recognizer for testing.
///
/// Returns canned responses in rotation, or a configured error.
pub struct MockRecognizer {
    responses: Mutex<Vec<String>>,
    next: AtomicU32,
    confidence: f32,
    language: String,
    no_speech: bool,
    calls: AtomicU32,
}

impl MockRecognizer {
    pub fn new(response: &str) -> Self {
        Self {
            responses: Mutex::new(vec![response.to_string()]),
            next: AtomicU32::new(0),
            confidence: 0.9,
            language: "en".to_string(),
            no_speech: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Rotate through several responses, one per segment.
    pub fn with_responses(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            next: AtomicU32::new(0),
            confidence: 0.9,
            language: "en".to_string(),
            no_speech: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Configure the mock to report `NoSpeechDetected` for every segment.
    pub fn with_no_speech(mut self) -> Self {
        self.no_speech = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Recognizer for MockRecognizer {
    fn transcribe(&self, _segment: &SpeechSegment) -> Result<Transcript, RecognizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.no_speech {
            return Err(RecognizerError::NoSpeechDetected);
        }
        let responses = self.responses.lock().map_err(|_| {
            RecognizerError::Failed("mock recognizer poisoned".to_string())
        })?;
        let index = self.next.fetch_add(1, Ordering::SeqCst) as usize % responses.len();
        Ok(Transcript {
            text: responses[index].clone(),
            confidence: self.confidence,
            language: self.language.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::DetectionSource;
    use std::time::Instant;

    fn segment() -> SpeechSegment {
        let now = Instant::now();
        SpeechSegment {
            samples: vec![1000i16; 16000],
            sample_rate: 16000,
            started_at: now,
            ended_at: now,
            vad_confidence: 0.8,
            source: DetectionSource::Primary,
        }
    }

    #[test]
    fn test_mock_recognizer_returns_response() {
        let recognizer = MockRecognizer::new("hello world").with_confidence(0.75);
        let transcript = recognizer.transcribe(&segment()).unwrap();
        assert_eq!(transcript.text, "hello world");
        assert_eq!(transcript.confidence, 0.75);
        assert_eq!(transcript.language, "en");
        assert_eq!(recognizer.call_count(), 1);
    }

    #[test]
    fn test_mock_recognizer_rotates_responses() {
        let recognizer = MockRecognizer::with_responses(&["first", "second"]);
        assert_eq!(recognizer.transcribe(&segment()).unwrap().text, "first");
        assert_eq!(recognizer.transcribe(&segment()).unwrap().text, "second");
        assert_eq!(recognizer.transcribe(&segment()).unwrap().text, "first");
    }

    #[test]
    fn test_mock_recognizer_no_speech() {
        let recognizer = MockRecognizer::new("ignored").with_no_speech();
        assert!(matches!(
            recognizer.transcribe(&segment()),
            Err(RecognizerError::NoSpeechDetected)
        ));
    }
}
