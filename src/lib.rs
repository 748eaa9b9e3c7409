//! livecoach - Real-time conversation coaching from live audio
//!
//! Streams audio through activity detection and speech recognition into
//! coaching advice, with a rule-based fallback when the primary model
//! misbehaves.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod advice;
pub mod audio;
pub mod capability;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod session;

// Capability boundaries (plug in real models here)
pub use capability::diarization::SpeakerLabeler;
pub use capability::stt::Recognizer;
pub use capability::vad::VoiceScorer;

// Pipeline
pub use audio::source::AudioSource;
pub use pipeline::orchestrator::{Capabilities, Pipeline, SessionHandle};

// Session
pub use session::{Mode, SessionEvent, SessionSnapshot, SessionState};

// Error handling
pub use error::{CoachError, Result};

// Config
pub use config::Config;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, Stage, StationError};
pub use pipeline::station::Station;
