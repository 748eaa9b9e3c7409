//! Audio capture and speech-activity detection.

pub mod gate;
pub mod source;

pub use gate::{ActivityGate, Classification, SegmentBuilder, calculate_rms};
pub use source::{AudioSource, FramePhase, MockAudioSource, WavAudioSource};
