//! External capability boundaries.
//!
//! The acoustic models and the language model are collaborators, not part
//! of this crate. Each is a trait with a mock implementation for tests.

pub mod diarization;
pub mod llm;
pub mod stt;
pub mod vad;

pub use diarization::{FixedLabeler, SpeakerLabeler};
pub use llm::{LanguageModel, MockLanguageModel, ModelError};
pub use stt::{MockRecognizer, Recognizer, RecognizerError, Transcript};
pub use vad::{MockScorer, ScorerError, VoiceScorer};
