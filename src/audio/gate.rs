//! Activity gate: two-tier speech classification and segment assembly.
//!
//! A cheap RMS noise gate runs first, then the primary scorer with a
//! deterministic energy fallback. Speech chunks merge into segments that
//! close on a silence gap or a maximum duration.

use crate::capability::vad::{ScorerError, VoiceScorer};
use crate::config::GateConfig;
use crate::pipeline::types::{AudioChunk, DetectionSource, SpeechSegment};
use std::sync::Arc;

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// Returns a normalized value (0.0 to 1.0), where 0.0 is silence and
/// ~0.707 is a full-scale sine wave.
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

/// Result of classifying one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Below the noise-gate floor; no detector ran.
    Silence,
    /// Above the floor but not speech.
    Noise,
    /// Speech, with the detector's confidence and identity.
    Speech {
        confidence: f32,
        source: DetectionSource,
    },
}

impl Classification {
    pub fn is_speech(&self) -> bool {
        matches!(self, Classification::Speech { .. })
    }
}

/// Two-tier chunk classifier.
pub struct ActivityGate {
    config: GateConfig,
    scorer: Option<Arc<dyn VoiceScorer>>,
    warned_fallback: bool,
}

impl ActivityGate {
    /// Creates a gate with an optional primary scorer.
    ///
    /// Without a scorer every chunk goes through the energy heuristic.
    pub fn new(config: GateConfig, scorer: Option<Arc<dyn VoiceScorer>>) -> Self {
        Self {
            config,
            scorer,
            warned_fallback: false,
        }
    }

    /// Classifies a chunk as silence, noise, or speech.
    pub fn classify(&mut self, chunk: &AudioChunk) -> Classification {
        // Noise gate first: reject quiet chunks before any detector runs.
        if chunk.rms < self.config.noise_floor {
            return Classification::Silence;
        }

        if let Some(scorer) = &self.scorer {
            match scorer.score(chunk) {
                Ok(confidence) => {
                    return if confidence >= self.config.vad_threshold {
                        Classification::Speech {
                            confidence,
                            source: DetectionSource::Primary,
                        }
                    } else {
                        Classification::Noise
                    };
                }
                Err(e) => {
                    if !self.warned_fallback {
                        self.warned_fallback = true;
                        let reason = match e {
                            ScorerError::ModelUnavailable => "model unavailable".to_string(),
                            ScorerError::Failed(msg) => msg,
                        };
                        eprintln!("livecoach: primary detector failed ({reason}), using energy fallback");
                    }
                }
            }
        }

        self.energy_classify(chunk)
    }

    /// Energy heuristic: RMS above a second, higher threshold means speech.
    fn energy_classify(&self, chunk: &AudioChunk) -> Classification {
        if chunk.rms > self.config.energy_threshold {
            let confidence = (chunk.rms / (self.config.energy_threshold * 2.0)).min(1.0);
            Classification::Speech {
                confidence,
                source: DetectionSource::EnergyFallback,
            }
        } else {
            Classification::Noise
        }
    }
}

/// Open speech accumulation state.
struct PendingSegment {
    samples: Vec<i16>,
    started_at: std::time::Instant,
    ended_at: std::time::Instant,
    confidence_sum: f32,
    chunk_count: u32,
    source: DetectionSource,
    gap_ms: u32,
}

/// Merges speech-classified chunks into speech segments.
///
/// A segment closes when the observed silence gap reaches `silence_gap_ms`
/// or the buffered speech reaches `max_segment_ms`. Segments shorter than
/// `min_segment_ms` are discarded as noise bursts.
pub struct SegmentBuilder {
    config: GateConfig,
    pending: Option<PendingSegment>,
}

impl SegmentBuilder {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            pending: None,
        }
    }

    /// Feeds one classified chunk; returns a segment when one closes.
    pub fn push(
        &mut self,
        chunk: &AudioChunk,
        classification: Classification,
    ) -> Option<SpeechSegment> {
        match classification {
            Classification::Speech { confidence, source } => {
                let pending = self.pending.get_or_insert_with(|| PendingSegment {
                    samples: Vec::new(),
                    started_at: chunk.captured_at,
                    ended_at: chunk.captured_at,
                    confidence_sum: 0.0,
                    chunk_count: 0,
                    source,
                    gap_ms: 0,
                });
                pending.samples.extend_from_slice(&chunk.samples);
                pending.ended_at = chunk.captured_at;
                pending.confidence_sum += confidence;
                pending.chunk_count += 1;
                pending.gap_ms = 0;
                if source == DetectionSource::EnergyFallback {
                    pending.source = DetectionSource::EnergyFallback;
                }

                let duration_ms =
                    (pending.samples.len() as u64 * 1000 / chunk.sample_rate as u64) as u32;
                if duration_ms >= self.config.max_segment_ms {
                    return self.close(chunk.sample_rate);
                }
                None
            }
            Classification::Silence | Classification::Noise => {
                let Some(pending) = self.pending.as_mut() else {
                    return None;
                };
                pending.gap_ms += chunk.duration_ms();
                if pending.gap_ms >= self.config.silence_gap_ms {
                    return self.close(chunk.sample_rate);
                }
                None
            }
        }
    }

    /// Closes the open segment, discarding it if below the minimum duration.
    fn close(&mut self, sample_rate: u32) -> Option<SpeechSegment> {
        let pending = self.pending.take()?;
        let duration_ms = (pending.samples.len() as u64 * 1000 / sample_rate as u64) as u32;
        if duration_ms < self.config.min_segment_ms {
            return None;
        }
        let vad_confidence = if pending.chunk_count > 0 {
            pending.confidence_sum / pending.chunk_count as f32
        } else {
            0.0
        };
        Some(SpeechSegment {
            samples: pending.samples,
            sample_rate,
            started_at: pending.started_at,
            ended_at: pending.ended_at,
            vad_confidence,
            source: pending.source,
        })
    }

    /// Flushes any open segment during shutdown.
    pub fn flush(&mut self, sample_rate: u32) -> Option<SpeechSegment> {
        self.close(sample_rate)
    }
}
