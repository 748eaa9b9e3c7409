//! Coaching pipeline that runs from session start until shutdown.

use crate::advice::engine::AdviceEngine;
use crate::advice::executor::AdviceExecutor;
use crate::audio::source::AudioSource;
use crate::capability::diarization::SpeakerLabeler;
use crate::capability::stt::Recognizer;
use crate::capability::vad::VoiceScorer;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::advice_station::AdviceStation;
use crate::pipeline::error::{ErrorReporter, LogReporter, Stage, StationError};
use crate::pipeline::gate_station::GateStation;
use crate::pipeline::queue::bounded_drop_oldest;
use crate::pipeline::station::StationRunner;
use crate::pipeline::transcriber_station::TranscriberStation;
use crate::pipeline::types::AudioChunk;
use crate::session::{SessionEvent, SessionSnapshot, SessionState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// External collaborators the pipeline runs against.
pub struct Capabilities {
    /// Primary voice-activity scorer. Without one, the energy heuristic
    /// classifies every chunk.
    pub scorer: Option<Arc<dyn VoiceScorer>>,
    pub recognizer: Arc<dyn Recognizer>,
    /// Primary advice model executor. Without one, advice is rule-based.
    pub executor: Option<Arc<dyn AdviceExecutor>>,
    pub labeler: Arc<dyn SpeakerLabeler>,
}

/// Handle to a running coaching session.
pub struct SessionHandle {
    running: Arc<AtomicBool>,
    audio_done: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    session: Arc<SessionState>,
}

impl SessionHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True once a finite source has been fully read. The pipeline may
    /// still be draining in-flight work.
    pub fn audio_finished(&self) -> bool {
        self.audio_done.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Stops the session and returns the final snapshot.
    ///
    /// Waits up to 5s for workers to drain and exit, joining each to
    /// detect panics. Past the deadline, remaining threads are detached
    /// and die with the process.
    pub fn stop(mut self) -> SessionSnapshot {
        self.running.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_secs(5);
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let msg = panic_info
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                            .unwrap_or("unknown panic");
                        eprintln!("livecoach: pipeline thread panicked: {msg}");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                eprintln!(
                    "livecoach: shutdown timeout, {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }
            thread::sleep(poll_interval);
        }

        self.session.snapshot()
    }
}

/// Coaching pipeline: AudioSource → Gate → Transcriber → Advice.
pub struct Pipeline {
    config: Config,
    error_reporter: Arc<dyn ErrorReporter>,
    event_tx: Option<crossbeam_channel::Sender<SessionEvent>>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            error_reporter: Arc::new(LogReporter),
            event_tx: None,
        }
    }

    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Session events (turns advised, mode changes) are delivered
    /// non-blocking; a slow receiver loses events, never stalls workers.
    pub fn with_event_sender(mut self, tx: crossbeam_channel::Sender<SessionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Starts the pipeline against a source and its collaborators.
    pub fn start(
        self,
        mut audio_source: Box<dyn AudioSource>,
        capabilities: Capabilities,
    ) -> Result<SessionHandle> {
        self.config.validate()?;

        let mut session = SessionState::new();
        if let Some(tx) = self.event_tx {
            session = session.with_event_sender(tx);
        }
        let session = Arc::new(session);

        let running = Arc::new(AtomicBool::new(true));
        let audio_done = Arc::new(AtomicBool::new(false));

        let (chunk_tx, chunk_rx) = bounded_drop_oldest(
            self.config.queues.chunk_capacity,
            session.chunk_drop_counter(),
        );
        let (segment_tx, segment_rx) = bounded_drop_oldest(
            self.config.queues.segment_capacity,
            session.segment_drop_counter(),
        );
        let (transcript_tx, transcript_rx) = bounded_drop_oldest(
            self.config.queues.transcript_capacity,
            session.transcript_drop_counter(),
        );
        // Terminal station output goes nowhere; drop-oldest never blocks.
        let (done_tx, _done_rx) = bounded_drop_oldest::<()>(1, Arc::new(AtomicU64::new(0)));

        let sample_rate = audio_source.sample_rate();

        let gate_station = GateStation::new(
            self.config.gate.clone(),
            capabilities.scorer,
            session.clone(),
            sample_rate,
        )
        .with_flush_tx(segment_tx.clone());

        let transcriber_station =
            TranscriberStation::new(capabilities.recognizer, capabilities.labeler);

        let engine = AdviceEngine::new(capabilities.executor, self.config.advice.clone());
        let advice_station = AdviceStation::new(engine, session.clone());

        let gate_runner = StationRunner::spawn(
            gate_station,
            chunk_rx,
            segment_tx,
            self.error_reporter.clone(),
        );
        let transcriber_runner = StationRunner::spawn(
            transcriber_station,
            segment_rx,
            transcript_tx,
            self.error_reporter.clone(),
        );
        let advice_runner = StationRunner::spawn(
            advice_station,
            transcript_rx,
            done_tx,
            self.error_reporter.clone(),
        );

        audio_source.start()?;
        let source_is_finite = audio_source.is_finite();
        // Sized from the source's actual rate so chunk duration holds even
        // when it differs from the configured rate.
        let chunk_samples = (sample_rate as f32 * self.config.audio.chunk_secs) as usize;

        // Chunk producer: accumulate source batches into fixed chunks.
        let producer_running = running.clone();
        let producer_done = audio_done.clone();
        let producer_session = session.clone();
        let producer_reporter = self.error_reporter.clone();
        let producer_handle = thread::spawn(move || {
            let poll_interval = Duration::from_millis(16);
            let mut buffer: Vec<i16> = Vec::with_capacity(chunk_samples * 2);

            while producer_running.load(Ordering::SeqCst) {
                let samples = match audio_source.read_samples() {
                    Ok(s) => s,
                    // No audio means no session; a read failure ends
                    // capture immediately and is surfaced on the session.
                    Err(e) => {
                        let message = format!("audio capture failed: {e}");
                        producer_reporter
                            .report(Stage::Capture, &StationError::Fatal(message.clone()));
                        producer_session.record_audio_failure(message);
                        producer_running.store(false, Ordering::SeqCst);
                        break;
                    }
                };

                if samples.is_empty() {
                    if source_is_finite {
                        // Source exhausted; ship the partial tail chunk.
                        if !buffer.is_empty() {
                            let chunk = AudioChunk::new(
                                std::mem::take(&mut buffer),
                                sample_rate,
                                Instant::now(),
                            );
                            producer_session.note_chunk();
                            chunk_tx.send(chunk);
                        }
                        break;
                    }
                    // Live source warming up; keep polling.
                    thread::sleep(poll_interval);
                    continue;
                }

                buffer.extend_from_slice(&samples);
                while buffer.len() >= chunk_samples {
                    let rest = buffer.split_off(chunk_samples);
                    let chunk = AudioChunk::new(
                        std::mem::replace(&mut buffer, rest),
                        sample_rate,
                        Instant::now(),
                    );
                    producer_session.note_chunk();
                    chunk_tx.send(chunk);
                }

                // Finite sources drain at full speed; live capture is
                // polled at ~60Hz.
                if !source_is_finite {
                    thread::sleep(poll_interval);
                }
            }

            audio_source.stop();
            producer_done.store(true, Ordering::SeqCst);
        });

        let mut threads = vec![producer_handle];
        for runner in [gate_runner, transcriber_runner, advice_runner] {
            threads.push(thread::spawn(move || {
                if let Err(msg) = runner.join() {
                    eprintln!("livecoach: {msg}");
                }
            }));
        }

        Ok(SessionHandle {
            running,
            audio_done,
            threads,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::{FramePhase, MockAudioSource};
    use crate::capability::diarization::FixedLabeler;
    use crate::capability::stt::MockRecognizer;
    use crate::capability::vad::MockScorer;
    use crate::config::Config;

    fn fast_config() -> Config {
        let mut config = Config::default();
        // 50ms chunks so tests run in well under a second.
        config.audio.chunk_secs = 0.05;
        config.gate.silence_gap_ms = 100;
        config.gate.min_segment_ms = 100;
        config
    }

    fn capabilities(recognizer: MockRecognizer) -> Capabilities {
        Capabilities {
            scorer: Some(Arc::new(MockScorer::new(0.9))),
            recognizer: Arc::new(recognizer),
            executor: None,
            labeler: Arc::new(FixedLabeler::default()),
        }
    }

    fn wait_until_drained(handle: &SessionHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.audio_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        // Allow in-flight segments to reach the session.
        thread::sleep(Duration::from_millis(300));
    }

    #[test]
    fn test_pipeline_produces_turns_from_speech() {
        let frame_len = 800; // 50ms at 16kHz
        let source = Box::new(MockAudioSource::new(vec![
            FramePhase::loud(8000, frame_len, 6),
            FramePhase::quiet(frame_len, 4),
        ]));

        let pipeline = Pipeline::new(fast_config());
        let handle = pipeline
            .start(source, capabilities(MockRecognizer::new("hello coach")))
            .unwrap();
        assert!(handle.is_running());

        wait_until_drained(&handle);
        let snapshot = handle.stop();

        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(snapshot.turns[0].text, "hello coach");
        assert_eq!(snapshot.turns[0].id, 0);
        assert_eq!(snapshot.advice.len(), 1);
        assert!(snapshot.chunk_count >= 6);
        assert_eq!(snapshot.segment_count, 1);
    }

    #[test]
    fn test_quiet_audio_produces_no_turns() {
        let source = Box::new(MockAudioSource::new(vec![FramePhase::quiet(800, 10)]));
        let recognizer = MockRecognizer::new("should not appear");

        let pipeline = Pipeline::new(fast_config());
        let handle = pipeline.start(source, capabilities(recognizer)).unwrap();

        wait_until_drained(&handle);
        let snapshot = handle.stop();

        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.segment_count, 0);
        assert!(snapshot.chunk_count >= 9);
    }

    #[test]
    fn test_start_fails_on_invalid_config() {
        let mut config = Config::default();
        config.audio.chunk_secs = 0.0;
        let source = Box::new(MockAudioSource::new(Vec::new()));
        let result = Pipeline::new(config).start(source, capabilities(MockRecognizer::new("x")));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_error_ends_capture() {
        let source = Box::new(MockAudioSource::with_read_failure("device unplugged"));
        let pipeline = Pipeline::new(fast_config());
        let handle = pipeline
            .start(source, capabilities(MockRecognizer::new("x")))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(3);
        while !handle.audio_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(handle.audio_finished());
        assert!(!handle.is_running());

        let snapshot = handle.stop();
        assert!(snapshot.turns.is_empty());
        let error = snapshot.audio_error.expect("capture failure recorded");
        assert!(error.contains("device unplugged"));
    }

    #[test]
    fn test_stop_is_prompt_even_mid_stream() {
        let source = Box::new(
            MockAudioSource::new(vec![FramePhase::loud(8000, 800, 100)]).as_live_source(),
        );
        let pipeline = Pipeline::new(fast_config());
        let handle = pipeline
            .start(source, capabilities(MockRecognizer::new("mid")))
            .unwrap();

        thread::sleep(Duration::from_millis(100));
        let started = Instant::now();
        let _snapshot = handle.stop();
        assert!(started.elapsed() < Duration::from_secs(6));
    }
}
