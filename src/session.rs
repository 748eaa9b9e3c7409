//! Session state: the append-only record of turns and advice.
//!
//! One mutex guards the turn log, the advice log, and the breaker. A turn
//! and its advice are always appended under a single lock acquisition, so
//! every snapshot observes exactly one advice entry per turn.

use crate::pipeline::types::{CoachingAdvice, Turn};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Which advice path the session is on.
///
/// The transition is one-directional: once fallback is active the primary
/// model is never attempted again for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    PrimaryActive,
    FallbackActive,
}

/// Notifications emitted as the session progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    TurnAdvised { turn_id: u64 },
    ModeChanged(Mode),
    /// Audio capture failed; the session is winding down. The error text
    /// is in the snapshot's `audio_error`.
    AudioFailed,
}

struct Inner {
    turns: Vec<Turn>,
    advice: Vec<CoachingAdvice>,
    consecutive_failures: u32,
    mode: Mode,
    audio_error: Option<String>,
}

/// Shared state for one coaching session.
pub struct SessionState {
    inner: Mutex<Inner>,
    chunk_count: AtomicU64,
    segment_count: AtomicU64,
    chunks_dropped: Arc<AtomicU64>,
    segments_dropped: Arc<AtomicU64>,
    transcripts_dropped: Arc<AtomicU64>,
    started_at: Instant,
    events: Option<Sender<SessionEvent>>,
}

/// Point-in-time copy of the session for display or inspection.
#[derive(Clone)]
pub struct SessionSnapshot {
    pub turns: Vec<Turn>,
    pub advice: Vec<CoachingAdvice>,
    pub mode: Mode,
    pub consecutive_failures: u32,
    pub chunk_count: u64,
    pub segment_count: u64,
    pub chunks_dropped: u64,
    pub segments_dropped: u64,
    pub transcripts_dropped: u64,
    /// Set when a fatal audio read error ended capture.
    pub audio_error: Option<String>,
    pub uptime: Duration,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                turns: Vec::new(),
                advice: Vec::new(),
                consecutive_failures: 0,
                mode: Mode::PrimaryActive,
                audio_error: None,
            }),
            chunk_count: AtomicU64::new(0),
            segment_count: AtomicU64::new(0),
            chunks_dropped: Arc::new(AtomicU64::new(0)),
            segments_dropped: Arc::new(AtomicU64::new(0)),
            transcripts_dropped: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
            events: None,
        }
    }

    pub fn with_event_sender(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding this lock poisons it; the data is still
        // append-only and consistent, so recover the guard.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // Never block the pipeline on a slow observer.
            let _ = events.try_send(event);
        }
    }

    pub fn note_chunk(&self) {
        self.chunk_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_segment(&self) {
        self.segment_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Shared counters the queues bump when they discard an item.
    pub fn chunk_drop_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.chunks_dropped)
    }

    pub fn segment_drop_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.segments_dropped)
    }

    pub fn transcript_drop_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.transcripts_dropped)
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// Reset the failure streak after a successful primary response.
    ///
    /// Has no effect on the mode: the breaker never closes again.
    pub fn record_model_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Record the fatal capture error that ended the audio stream. Only
    /// the first error is kept.
    pub fn record_audio_failure(&self, message: String) {
        let first = {
            let mut inner = self.lock();
            if inner.audio_error.is_none() {
                inner.audio_error = Some(message);
                true
            } else {
                false
            }
        };
        if first {
            self.emit(SessionEvent::AudioFailed);
        }
    }

    /// Count a primary failure; flip to fallback at the threshold.
    pub fn record_model_failure(&self, threshold: u32) -> Mode {
        let (mode, flipped) = {
            let mut inner = self.lock();
            let mut flipped = false;
            if inner.mode == Mode::PrimaryActive {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= threshold {
                    inner.mode = Mode::FallbackActive;
                    flipped = true;
                }
            }
            (inner.mode, flipped)
        };
        if flipped {
            self.emit(SessionEvent::ModeChanged(mode));
        }
        mode
    }

    /// The most recent `count` turns, oldest first.
    pub fn recent_turns(&self, count: usize) -> Vec<Turn> {
        let inner = self.lock();
        let skip = inner.turns.len().saturating_sub(count);
        inner.turns[skip..].to_vec()
    }

    /// Append a turn with its advice as one atomic operation.
    pub fn append(&self, turn: Turn, advice: CoachingAdvice) {
        debug_assert_eq!(turn.id, advice.turn_id);
        let turn_id = turn.id;
        {
            let mut inner = self.lock();
            debug_assert_eq!(inner.turns.len() as u64, turn_id);
            inner.turns.push(turn);
            inner.advice.push(advice);
        }
        self.emit(SessionEvent::TurnAdvised { turn_id });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            turns: inner.turns.clone(),
            advice: inner.advice.clone(),
            mode: inner.mode,
            consecutive_failures: inner.consecutive_failures,
            chunk_count: self.chunk_count.load(Ordering::Relaxed),
            segment_count: self.segment_count.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            segments_dropped: self.segments_dropped.load(Ordering::Relaxed),
            transcripts_dropped: self.transcripts_dropped.load(Ordering::Relaxed),
            audio_error: inner.audio_error.clone(),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
