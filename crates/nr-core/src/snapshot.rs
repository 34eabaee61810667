//! Point-in-time copies of session state and their display formatting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown by displays.
pub const APP_TITLE: &str = "Numeric Received";

/// What caused a snapshot to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// A log event changed session state.
    Event,
    /// An idle tick refreshed the elapsed time.
    Heartbeat,
}

/// An immutable copy of aggregated session state.
///
/// Owns its reward map outright; nothing in it refers back to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    /// Whether the session was still open when this snapshot was taken.
    pub active: bool,
    pub started_at: DateTime<Utc>,
    /// Time of the last in-session log event, or wall time for heartbeats.
    pub last_event_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub rewards: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Amount accumulated for `name`, zero if never seen.
    pub fn reward(&self, name: &str) -> u64 {
        self.rewards.get(name).copied().unwrap_or(0)
    }

    /// Per-second rate for `field`, or `None` while no time has elapsed.
    #[expect(
        clippy::cast_precision_loss,
        reason = "reward totals stay far below 2^52"
    )]
    pub fn rate(&self, field: &str) -> Option<f64> {
        if self.duration_seconds <= 0.0 {
            return None;
        }
        Some(self.reward(field) as f64 / self.duration_seconds)
    }
}

/// Formats elapsed seconds as `HHh MMm Ss`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "clamped to a non-negative whole number first"
)]
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = total % 3600 / 60;
    let secs = total % 60;
    format!("{hours:02}h {minutes:02}m {secs}s")
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "rates are non-negative and displayed as whole numbers"
)]
fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "--".to_string(), |r| format!("{:02}", r.floor() as u64))
}

/// Window title for the given snapshot.
///
/// Shows "not running" when there is no open session.
pub fn format_title(snapshot: Option<&Snapshot>, field: &str, label: &str) -> String {
    match snapshot {
        Some(s) if s.active => format!(
            "{APP_TITLE} ({}) ({} {label})",
            format_elapsed(s.duration_seconds),
            format_rate(s.rate(field)),
        ),
        _ => format!("{APP_TITLE} (not running)"),
    }
}

/// One-line summary suitable for pasting into chat.
pub fn format_summary_line(snapshot: &Snapshot, field: &str, label: &str) -> String {
    format!(
        "NR ({}) - {} {label}",
        format_elapsed(snapshot.duration_seconds),
        format_rate(snapshot.rate(field)),
    )
}
