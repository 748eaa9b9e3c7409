//! Speaker-identification capability boundary.
//!
//! Diarization is an external collaborator. When none is wired in, turns
//! are attributed to `Speaker::Unknown`.

use crate::pipeline::types::{Speaker, SpeechSegment};

/// Trait for the external diarization system.
pub trait SpeakerLabeler: Send + Sync {
    fn label(&self, segment: &SpeechSegment) -> Speaker;
}

/// Labeler that attributes every segment to a fixed speaker.
pub struct FixedLabeler(pub Speaker);

impl Default for FixedLabeler {
    fn default() -> Self {
        Self(Speaker::Unknown)
    }
}

impl SpeakerLabeler for FixedLabeler {
    fn label(&self, _segment: &SpeechSegment) -> Speaker {
        self.0
    }
}
