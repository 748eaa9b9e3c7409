//! Generic worker loop shared by all pipeline stages.

use crate::pipeline::error::{ErrorReporter, Stage, StationError};
use crate::pipeline::queue::DropOldestSender;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One stage of the pipeline: consumes inputs, optionally emits an output.
pub trait Station: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn stage(&self) -> Stage;

    /// Process one item. `Ok(None)` consumes the item without emitting.
    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError>;

    /// Called once after the input channel closes, before the worker exits.
    fn shutdown(&mut self) {}
}

/// Runs a station on its own thread.
///
/// Shutdown cascades through the channels: when the upstream sender drops,
/// the receive loop sees a disconnect, runs the station's `shutdown`, then
/// drops its own output sender.
pub struct StationRunner {
    stage: Stage,
    handle: JoinHandle<()>,
}

impl StationRunner {
    pub fn spawn<S: Station>(
        mut station: S,
        input_rx: Receiver<S::Input>,
        output_tx: DropOldestSender<S::Output>,
        reporter: std::sync::Arc<dyn ErrorReporter>,
    ) -> Self {
        let stage = station.stage();
        let handle = thread::spawn(move || {
            loop {
                match input_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(input) => match station.process(input) {
                        Ok(Some(output)) => {
                            output_tx.send(output);
                        }
                        Ok(None) => {}
                        Err(error @ StationError::Recoverable(_)) => {
                            reporter.report(stage, &error);
                        }
                        Err(error @ StationError::Fatal(_)) => {
                            reporter.report(stage, &error);
                            break;
                        }
                    },
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            station.shutdown();
        });
        Self { stage, handle }
    }

    /// Wait for the worker to exit, surfacing a panic as an error message.
    pub fn join(self) -> Result<(), String> {
        self.handle.join().map_err(|panic_info| {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            format!("{} worker panicked: {msg}", self.stage.as_str())
        })
    }
}
