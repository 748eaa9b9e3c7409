//! Worker that recognizes speech segments and attributes a speaker.

use crate::capability::diarization::SpeakerLabeler;
use crate::capability::stt::{Recognizer, RecognizerError};
use crate::pipeline::error::{Stage, StationError};
use crate::pipeline::station::Station;
use crate::pipeline::types::{LabeledTranscript, SpeechSegment};
use std::sync::Arc;
use std::time::Instant;

/// Runs the recognizer on each segment and labels the speaker while the
/// audio is still in hand.
pub struct TranscriberStation {
    recognizer: Arc<dyn Recognizer>,
    labeler: Arc<dyn SpeakerLabeler>,
    warned_backpressure: bool,
}

impl TranscriberStation {
    pub fn new(recognizer: Arc<dyn Recognizer>, labeler: Arc<dyn SpeakerLabeler>) -> Self {
        Self {
            recognizer,
            labeler,
            warned_backpressure: false,
        }
    }
}

impl Station for TranscriberStation {
    type Input = SpeechSegment;
    type Output = LabeledTranscript;

    fn stage(&self) -> Stage {
        Stage::Transcribe
    }

    fn process(&mut self, segment: SpeechSegment) -> Result<Option<LabeledTranscript>, StationError> {
        let start = Instant::now();
        let segment_ms = segment.duration_ms();

        let transcript = match self.recognizer.transcribe(&segment) {
            Ok(transcript) => transcript,
            // Borderline segments routinely contain no recognizable
            // speech; drop them without reporting.
            Err(RecognizerError::NoSpeechDetected) => return Ok(None),
            Err(RecognizerError::Failed(msg)) => {
                return Err(StationError::Recoverable(format!(
                    "recognition failed: {msg}"
                )));
            }
        };

        // Warn once if recognition is slower than real time; the segment
        // queue will start shedding under sustained lag.
        if !self.warned_backpressure {
            let elapsed_ms = start.elapsed().as_millis() as u32;
            if elapsed_ms > segment_ms {
                self.warned_backpressure = true;
                eprintln!(
                    "livecoach: recognition slower than real-time ({elapsed_ms}ms for {segment_ms}ms of audio)"
                );
            }
        }

        if transcript.text.trim().is_empty() {
            return Ok(None);
        }

        let speaker = self.labeler.label(&segment);
        Ok(Some(LabeledTranscript {
            transcript,
            speaker,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::diarization::FixedLabeler;
    use crate::capability::stt::MockRecognizer;
    use crate::pipeline::types::{DetectionSource, Speaker};

    fn segment(ms: u32) -> SpeechSegment {
        let now = Instant::now();
        SpeechSegment {
            samples: vec![3000i16; (16 * ms) as usize],
            sample_rate: 16000,
            started_at: now,
            ended_at: now,
            vad_confidence: 0.8,
            source: DetectionSource::Primary,
        }
    }

    fn station(recognizer: MockRecognizer) -> TranscriberStation {
        TranscriberStation::new(
            Arc::new(recognizer),
            Arc::new(FixedLabeler(Speaker::Other)),
        )
    }

    #[test]
    fn test_transcribes_and_labels() {
        let mut station = station(MockRecognizer::new("hello there").with_confidence(0.85));
        let output = station.process(segment(1000)).unwrap().unwrap();
        assert_eq!(output.transcript.text, "hello there");
        assert_eq!(output.transcript.confidence, 0.85);
        assert_eq!(output.speaker, Speaker::Other);
    }

    #[test]
    fn test_no_speech_is_dropped_silently() {
        let mut station = station(MockRecognizer::new("ignored").with_no_speech());
        assert!(station.process(segment(1000)).unwrap().is_none());
    }

    #[test]
    fn test_whitespace_text_is_dropped() {
        let mut station = station(MockRecognizer::new("   \n"));
        assert!(station.process(segment(1000)).unwrap().is_none());
    }

    #[test]
    fn test_recognizer_failure_is_recoverable() {
        struct FailingRecognizer;
        impl Recognizer for FailingRecognizer {
            fn transcribe(
                &self,
                _segment: &SpeechSegment,
            ) -> Result<crate::capability::stt::Transcript, RecognizerError> {
                Err(RecognizerError::Failed("model crashed".to_string()))
            }
        }

        let mut station = TranscriberStation::new(
            Arc::new(FailingRecognizer),
            Arc::new(FixedLabeler::default()),
        );
        match station.process(segment(1000)) {
            Err(StationError::Recoverable(msg)) => assert!(msg.contains("model crashed")),
            other => panic!("Expected recoverable error, got {other:?}"),
        }
    }
}
