//! Default configuration constants for livecoach.
//!
//! Shared across config types so defaults live in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and keeps chunk buffers small.
pub const SAMPLE_RATE: u32 = 16000;

/// Default audio chunk duration in seconds.
///
/// Each chunk is classified independently by the activity gate, so shorter
/// chunks give finer segment boundaries at the cost of more classifier calls.
pub const CHUNK_SECS: f32 = 1.0;

/// Noise-gate floor (normalized RMS, 0.0 to 1.0).
///
/// Chunks below this are silence and no detector runs at all. Tuned low for
/// quiet microphones; raise it in noisy rooms.
pub const NOISE_FLOOR: f32 = 0.0005;

/// Primary voice-activity threshold applied to the scorer's confidence.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Energy-fallback speech threshold (normalized RMS).
///
/// Deliberately higher than the noise floor: when the primary detector is
/// unavailable we accept more missed speech to avoid phantom segments.
pub const ENERGY_THRESHOLD: f32 = 0.05;

/// Silence gap in milliseconds that closes an open speech segment.
pub const SILENCE_GAP_MS: u32 = 800;

/// Minimum speech segment duration in milliseconds.
///
/// Anything shorter is treated as a noise burst and discarded, which is the
/// mechanism that prevents phantom transcriptions.
pub const MIN_SEGMENT_MS: u32 = 500;

/// Maximum speech segment duration in milliseconds.
///
/// A segment is force-closed at this length so continuous speech cannot
/// buffer unboundedly before transcription.
pub const MAX_SEGMENT_MS: u32 = 15000;

/// Number of recent turns included in the advice prompt.
pub const CONTEXT_TURNS: usize = 10;

/// Wall-clock timeout for one isolated model call, in seconds.
pub const MODEL_TIMEOUT_SECS: u64 = 15;

/// Consecutive primary-path failures before the circuit breaker opens.
pub const FAILURE_THRESHOLD: u32 = 3;

/// Token budget for one model response.
pub const MAX_TOKENS: u32 = 200;

/// Bounded queue capacities between pipeline workers.
///
/// When a queue is full the producer drops the oldest item rather than
/// blocking, trading completeness for bounded latency.
pub const CHUNK_QUEUE_CAPACITY: usize = 32;
pub const SEGMENT_QUEUE_CAPACITY: usize = 16;
pub const TRANSCRIPT_QUEUE_CAPACITY: usize = 16;
