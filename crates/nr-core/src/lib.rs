//! Core domain logic for the reward log tracker.
//!
//! This crate contains the synchronous parts of the pipeline:
//! - Classification: turning raw log lines into typed events
//! - Aggregation: the session state machine and its snapshots
//! - Summaries: the persisted record of a finished session
//! - Reports: projecting saved sessions into per-period rates

pub mod aggregator;
pub mod classify;
pub mod event;
pub mod report;
pub mod snapshot;
pub mod summary;

pub use aggregator::Aggregator;
pub use classify::{ClassifyError, Classifier, Markers};
pub use event::{LogEvent, LogLine};
pub use report::{Projection, Rates, ReportRow};
pub use snapshot::{Snapshot, SnapshotKind};
pub use summary::{SessionSummary, SummaryError};
