//! Worker that turns classified chunks into speech segments.

use crate::audio::gate::{ActivityGate, SegmentBuilder};
use crate::capability::vad::VoiceScorer;
use crate::config::GateConfig;
use crate::pipeline::error::{Stage, StationError};
use crate::pipeline::queue::DropOldestSender;
use crate::pipeline::station::Station;
use crate::pipeline::types::{AudioChunk, SpeechSegment};
use crate::session::SessionState;
use std::sync::Arc;

/// Classifies each chunk and assembles speech segments.
pub struct GateStation {
    gate: ActivityGate,
    builder: SegmentBuilder,
    session: Arc<SessionState>,
    sample_rate: u32,
    flush_tx: Option<DropOldestSender<SpeechSegment>>,
}

impl GateStation {
    pub fn new(
        config: GateConfig,
        scorer: Option<Arc<dyn VoiceScorer>>,
        session: Arc<SessionState>,
        sample_rate: u32,
    ) -> Self {
        Self {
            gate: ActivityGate::new(config.clone(), scorer),
            builder: SegmentBuilder::new(config),
            session,
            sample_rate,
            flush_tx: None,
        }
    }

    /// Channel for flushing a half-open segment during shutdown.
    pub fn with_flush_tx(mut self, tx: DropOldestSender<SpeechSegment>) -> Self {
        self.flush_tx = Some(tx);
        self
    }
}

impl Station for GateStation {
    type Input = AudioChunk;
    type Output = SpeechSegment;

    fn stage(&self) -> Stage {
        Stage::Gate
    }

    fn process(&mut self, chunk: AudioChunk) -> Result<Option<SpeechSegment>, StationError> {
        let classification = self.gate.classify(&chunk);
        match self.builder.push(&chunk, classification) {
            Some(segment) => {
                self.session.note_segment();
                Ok(Some(segment))
            }
            None => Ok(None),
        }
    }

    fn shutdown(&mut self) {
        // The tail of the stream never sees a closing silence gap; emit
        // whatever speech is still buffered.
        if let Some(segment) = self.builder.flush(self.sample_rate)
            && let Some(tx) = &self.flush_tx
        {
            self.session.note_segment();
            tx.send(segment);
        }
    }
}
