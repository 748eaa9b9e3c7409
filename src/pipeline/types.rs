//! Data types flowing through the coaching pipeline.

use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime};

/// A fixed-duration slice of the raw sample stream.
///
/// Immutable once produced by the chunker; discarded after classification.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM samples (16-bit signed integers).
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Timestamp when the chunk was captured.
    pub captured_at: Instant,
    /// Normalized RMS loudness (0.0 to 1.0).
    pub rms: f32,
}

impl AudioChunk {
    /// Creates a new chunk, computing its RMS loudness.
    pub fn new(samples: Vec<i16>, sample_rate: u32, captured_at: Instant) -> Self {
        let rms = crate::audio::gate::calculate_rms(&samples);
        Self {
            samples,
            sample_rate,
            captured_at,
            rms,
        }
    }

    /// Duration of the chunk in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u64 * 1000 / self.sample_rate as u64) as u32
    }
}

/// Which detector classified the speech that formed a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    /// The primary neural voice-activity scorer.
    Primary,
    /// The deterministic RMS-energy heuristic.
    EnergyFallback,
}

/// Contiguous speech merged from consecutive speech-classified chunks.
#[derive(Debug, Clone)]
pub struct SpeechSegment {
    /// Concatenated PCM samples of the speech chunks.
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Capture time of the first chunk.
    pub started_at: Instant,
    /// Capture time of the last chunk.
    pub ended_at: Instant,
    /// Mean voice-activity confidence across the segment.
    pub vad_confidence: f32,
    /// Detector that produced the classifications.
    pub source: DetectionSource,
}

impl SpeechSegment {
    /// Duration of the buffered speech in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u64 * 1000 / self.sample_rate as u64) as u32
    }
}

/// Speaker identity for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The coached user.
    You,
    /// The conversation partner.
    Other,
    /// Diarization unavailable or undecided.
    Unknown,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::You => "YOU",
            Speaker::Other => "OTHER",
            Speaker::Unknown => "UNKNOWN",
        }
    }
}

/// A recognized transcript with its speaker attribution, before turn
/// assembly assigns an id.
#[derive(Debug, Clone)]
pub struct LabeledTranscript {
    pub transcript: crate::capability::stt::Transcript,
    pub speaker: Speaker,
}

/// One assembled, timestamped, speaker-attributed unit of transcribed speech.
///
/// `id` is strictly increasing and gapless across a session. A turn is never
/// mutated after creation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    pub confidence: f32,
    pub language: String,
    pub timestamp: SystemTime,
}

/// Priority of a coaching recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Category of a coaching recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    RapportBuilding,
    Listening,
    Questioning,
    ObjectionHandling,
    Closing,
    /// Anything outside the named skills, e.g. value framing.
    #[serde(alias = "VALUE_PROPOSITION")]
    Other,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::RapportBuilding => "RAPPORT_BUILDING",
            Category::Listening => "LISTENING",
            Category::Questioning => "QUESTIONING",
            Category::ObjectionHandling => "OBJECTION_HANDLING",
            Category::Closing => "CLOSING",
            Category::Other => "OTHER",
        };
        write!(f, "{s}")
    }
}

/// Which path produced a piece of advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceSource {
    PrimaryModel,
    RuleBased,
}

/// One coaching recommendation, tied 1:1 to a turn.
#[derive(Debug, Clone)]
pub struct CoachingAdvice {
    /// Id of the turn this advice responds to.
    pub turn_id: u64,
    pub priority: Priority,
    pub category: Category,
    pub insight: String,
    pub action: String,
    pub source: AdviceSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_chunk_computes_rms() {
        let chunk = AudioChunk::new(vec![0i16; 1600], 16000, Instant::now());
        assert_eq!(chunk.rms, 0.0);
        assert_eq!(chunk.duration_ms(), 100);

        let loud = AudioChunk::new(vec![10000i16; 1600], 16000, Instant::now());
        assert!(loud.rms > 0.1);
    }

    #[test]
    fn test_segment_duration() {
        let now = Instant::now();
        let segment = SpeechSegment {
            samples: vec![0i16; 8000],
            sample_rate: 16000,
            started_at: now,
            ended_at: now,
            vad_confidence: 0.9,
            source: DetectionSource::Primary,
        };
        assert_eq!(segment.duration_ms(), 500);
    }

    #[test]
    fn test_speaker_labels() {
        assert_eq!(Speaker::You.as_str(), "YOU");
        assert_eq!(Speaker::Other.as_str(), "OTHER");
        assert_eq!(Speaker::Unknown.as_str(), "UNKNOWN");
    }

    #[test]
    fn test_priority_serde_screaming_case() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"HIGH\"");
        let parsed: Priority = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(parsed, Priority::Medium);
    }

    #[test]
    fn test_category_value_proposition_alias() {
        let parsed: Category = serde_json::from_str("\"VALUE_PROPOSITION\"").unwrap();
        assert_eq!(parsed, Category::Other);
        let parsed: Category = serde_json::from_str("\"OBJECTION_HANDLING\"").unwrap();
        assert_eq!(parsed, Category::ObjectionHandling);
    }
}
