//! Fault classification and reporting for pipeline workers.

use thiserror::Error;

/// Pipeline stage a fault originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The chunk producer reading the audio source.
    Capture,
    /// Chunk classification and segment assembly.
    Gate,
    /// Speech recognition and speaker labeling.
    Transcribe,
    /// Turn assembly and advice generation.
    Advise,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Capture => "capture",
            Stage::Gate => "gate",
            Stage::Transcribe => "transcriber",
            Stage::Advise => "advice",
        }
    }
}

/// Errors that can occur while a worker processes an item.
#[derive(Error, Debug, Clone)]
pub enum StationError {
    /// The worker skips the item and keeps running.
    #[error("recoverable: {0}")]
    Recoverable(String),
    /// The worker stops; the rest of the pipeline drains and shuts down.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Trait for reporting worker faults.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, stage: Stage, error: &StationError);
}

/// Default reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: Stage, error: &StationError) {
        eprintln!("livecoach: [{}] {}", stage.as_str(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_station_error_display() {
        let recoverable = StationError::Recoverable("segment skipped".to_string());
        assert_eq!(recoverable.to_string(), "recoverable: segment skipped");

        let fatal = StationError::Fatal("audio device lost".to_string());
        assert_eq!(fatal.to_string(), "fatal: audio device lost");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Capture.as_str(), "capture");
        assert_eq!(Stage::Advise.as_str(), "advice");
    }

    #[test]
    fn test_log_reporter_does_not_panic() {
        let reporter = LogReporter;
        reporter.report(Stage::Gate, &StationError::Recoverable("test error".to_string()));
    }

    /// Reporter that collects faults for assertions.
    pub struct CollectingReporter(pub Mutex<Vec<(Stage, String)>>);

    #[test]
    fn test_custom_reporter_receives_stage() {
        let reporter = CollectingReporter(Mutex::new(Vec::new()));
        reporter.report(Stage::Transcribe, &StationError::Fatal("boom".to_string()));
        let seen = reporter.0.lock().unwrap();
        assert_eq!(seen[0].0, Stage::Transcribe);
        assert_eq!(seen[0].1, "fatal: boom");
    }

    impl ErrorReporter for CollectingReporter {
        fn report(&self, stage: Stage, error: &StationError) {
            self.0.lock().unwrap().push((stage, error.to_string()));
        }
    }
}
