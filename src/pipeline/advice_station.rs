//! Terminal worker: assembles turns and records them with advice.

use crate::advice::engine::AdviceEngine;
use crate::pipeline::error::{Stage, StationError};
use crate::pipeline::station::Station;
use crate::pipeline::types::{AdviceSource, LabeledTranscript, Turn};
use crate::session::{Mode, SessionState};
use std::sync::Arc;
use std::time::SystemTime;

/// Assigns turn ids to labeled transcripts.
///
/// Runs inside the advice worker, after the last lossy queue, so ids are
/// strictly increasing and gapless: a transcript shed by backpressure
/// never had an id to begin with.
pub struct TurnAssembler {
    next_id: u64,
}

impl TurnAssembler {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Build the next turn; transcripts that trim to nothing are dropped.
    pub fn assemble(&mut self, labeled: LabeledTranscript) -> Option<Turn> {
        let text = labeled.transcript.text.trim();
        if text.is_empty() {
            return None;
        }
        let turn = Turn {
            id: self.next_id,
            speaker: labeled.speaker,
            text: text.to_string(),
            confidence: labeled.transcript.confidence,
            language: labeled.transcript.language,
            timestamp: SystemTime::now(),
        };
        self.next_id += 1;
        Some(turn)
    }
}

impl Default for TurnAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal station: turn assembly, advice, session append.
///
/// The turn and its advice land in the session as one atomic append, so
/// every snapshot holds exactly one advice entry per turn.
pub struct AdviceStation {
    assembler: TurnAssembler,
    engine: AdviceEngine,
    session: Arc<SessionState>,
}

impl AdviceStation {
    pub fn new(engine: AdviceEngine, session: Arc<SessionState>) -> Self {
        Self {
            assembler: TurnAssembler::new(),
            engine,
            session,
        }
    }
}

impl Station for AdviceStation {
    type Input = LabeledTranscript;
    type Output = ();

    fn stage(&self) -> Stage {
        Stage::Advise
    }

    fn process(&mut self, labeled: LabeledTranscript) -> Result<Option<()>, StationError> {
        let Some(turn) = self.assembler.assemble(labeled) else {
            return Ok(None);
        };

        let context = self.session.recent_turns(self.engine.context_turns());
        let mode = self.session.mode();
        let outcome = self.engine.advise(mode, &context, &turn);

        if let Some(failure) = outcome.failure {
            eprintln!(
                "livecoach: primary model {failure} on turn {}, using rule-based advice",
                turn.id
            );
            let threshold = self.engine.failure_threshold();
            if self.session.record_model_failure(threshold) == Mode::FallbackActive
                && mode == Mode::PrimaryActive
            {
                eprintln!(
                    "livecoach: primary model disabled after {threshold} consecutive failures, \
                     rule-based advice for the rest of the session"
                );
            }
        } else if outcome.advice.source == AdviceSource::PrimaryModel {
            self.session.record_model_success();
        }

        self.session.append(turn, outcome.advice);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::executor::ThreadExecutor;
    use crate::capability::llm::MockLanguageModel;
    use crate::capability::stt::Transcript;
    use crate::config::AdviceConfig;
    use crate::pipeline::types::{Category, Speaker};

    fn labeled(text: &str) -> LabeledTranscript {
        LabeledTranscript {
            transcript: Transcript {
                text: text.to_string(),
                confidence: 0.9,
                language: "en".to_string(),
            },
            speaker: Speaker::Other,
        }
    }

    fn rules_only_station(session: Arc<SessionState>) -> AdviceStation {
        AdviceStation::new(AdviceEngine::new(None, AdviceConfig::default()), session)
    }

    #[test]
    fn test_assembler_ids_are_sequential_from_zero() {
        let mut assembler = TurnAssembler::new();
        assert_eq!(assembler.assemble(labeled("one")).unwrap().id, 0);
        assert_eq!(assembler.assemble(labeled("two")).unwrap().id, 1);
        // A dropped transcript must not consume an id.
        assert!(assembler.assemble(labeled("   ")).is_none());
        assert_eq!(assembler.assemble(labeled("three")).unwrap().id, 2);
    }

    #[test]
    fn test_assembler_trims_text() {
        let mut assembler = TurnAssembler::new();
        let turn = assembler.assemble(labeled("  hello  ")).unwrap();
        assert_eq!(turn.text, "hello");
        assert_eq!(turn.speaker, Speaker::Other);
    }

    #[test]
    fn test_station_appends_turn_with_advice() {
        let session = Arc::new(SessionState::new());
        let mut station = rules_only_station(session.clone());

        station.process(labeled("what is the price?")).unwrap();
        station.process(labeled("we have a problem")).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.advice.len(), 2);
        assert_eq!(snapshot.advice[0].category, Category::ObjectionHandling);
        assert_eq!(snapshot.advice[1].category, Category::Questioning);
    }

    #[test]
    fn test_empty_transcript_appends_nothing() {
        let session = Arc::new(SessionState::new());
        let mut station = rules_only_station(session.clone());
        station.process(labeled("  ")).unwrap();
        assert!(session.snapshot().turns.is_empty());
    }

    #[test]
    fn test_repeated_failures_open_the_breaker() {
        let session = Arc::new(SessionState::new());
        let model = Arc::new(MockLanguageModel::failing("down"));
        let executor = Arc::new(ThreadExecutor::new(model.clone()));
        let config = AdviceConfig {
            failure_threshold: 3,
            model_timeout_secs: 1,
            ..AdviceConfig::default()
        };
        let mut station =
            AdviceStation::new(AdviceEngine::new(Some(executor), config), session.clone());

        for i in 0..4 {
            station.process(labeled(&format!("turn number {i}"))).unwrap();
        }

        let snapshot = session.snapshot();
        assert_eq!(snapshot.mode, Mode::FallbackActive);
        assert_eq!(snapshot.turns.len(), 4);
        assert_eq!(snapshot.advice.len(), 4);
        // The fourth turn never reached the model.
        assert_eq!(model.call_count(), 3);
    }

    #[test]
    fn test_primary_success_resets_streak() {
        let session = Arc::new(SessionState::new());
        const GOOD: &str = r#"{"priority": "LOW", "category": "LISTENING",
                               "insight": "x", "action": "y"}"#;
        let model = Arc::new(MockLanguageModel::with_responses(&[
            "bad", "bad", GOOD, "bad", "bad",
        ]));
        let executor = Arc::new(ThreadExecutor::new(model));
        let config = AdviceConfig {
            failure_threshold: 2,
            model_timeout_secs: 1,
            ..AdviceConfig::default()
        };
        let mut station =
            AdviceStation::new(AdviceEngine::new(Some(executor), config), session.clone());

        // First turn: "bad" then retry "bad" = one failure. Second turn:
        // GOOD on the first attempt resets the streak.
        station.process(labeled("first")).unwrap();
        station.process(labeled("second")).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.mode, Mode::PrimaryActive);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.advice[1].source, AdviceSource::PrimaryModel);
    }
}
