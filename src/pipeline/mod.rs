//! The streaming coaching pipeline.
//!
//! Three workers connected by bounded drop-oldest queues, fed by a chunk
//! producer thread: audio chunks become speech segments, segments become
//! labeled transcripts, transcripts become turns with advice.

pub mod advice_station;
pub mod error;
pub mod gate_station;
pub mod orchestrator;
pub mod queue;
pub mod station;
pub mod transcriber_station;
pub mod types;

pub use advice_station::{AdviceStation, TurnAssembler};
pub use error::{ErrorReporter, LogReporter, Stage, StationError};
pub use gate_station::GateStation;
pub use orchestrator::{Capabilities, Pipeline, SessionHandle};
pub use queue::{DropOldestSender, bounded_drop_oldest};
pub use station::{Station, StationRunner};
pub use transcriber_station::TranscriberStation;
