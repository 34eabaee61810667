//! Live tailing for the reward log tracker.
//!
//! - [`tailer`]: follows a growing file line by line, reporting idle periods
//! - [`emitter`]: fans snapshots out to observers
//! - [`pipeline`]: the background task that drives both, plus [`Monitor`]
//!   for switching between files

pub mod emitter;
pub mod pipeline;
pub mod tailer;

pub use emitter::{Observer, ObserverId, SnapshotEmitter};
pub use pipeline::{Monitor, PipelineConfig, PipelineError, PipelineHandle, spawn};
pub use tailer::{LogTailer, TailError, TailEvent, TailOptions};
