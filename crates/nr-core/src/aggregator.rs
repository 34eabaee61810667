//! Session state machine.
//!
//! The [`Aggregator`] owns the only mutable copy of session state. It is fed
//! classified log events in file order plus idle ticks, and answers each
//! input with an optional [`Snapshot`] describing the new state.
//!
//! # Time
//!
//! Event-driven snapshots measure duration from log time (`last_event_at -
//! started_at`). Heartbeat snapshots measure from wall time (`now -
//! started_at`) without touching `last_event_at`. Because the two clocks can
//! disagree, every reported duration is clamped to the largest duration
//! already reported in the same session, so displays never run backwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::event::{LogEvent, LogLine};
use crate::snapshot::{Snapshot, SnapshotKind};

/// Mutable state of the current (or most recent) session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionState {
    active: bool,
    started_at: DateTime<Utc>,
    last_event_at: DateTime<Utc>,
    rewards: BTreeMap<String, u64>,
    /// Largest duration already handed out in this session.
    reported: Duration,
}

impl SessionState {
    fn started(at: DateTime<Utc>) -> Self {
        Self {
            active: true,
            started_at: at,
            last_event_at: at,
            rewards: BTreeMap::new(),
            reported: Duration::zero(),
        }
    }
}

/// Consumes log events and ticks, producing snapshots.
///
/// Not `Sync`-shared: a single pipeline task drives it sequentially.
#[derive(Debug, Default)]
pub struct Aggregator {
    /// `None` until the first session start has been seen.
    session: Option<SessionState>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session is currently open.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }

    /// Applies a classified line. Lines without a timestamp are ignored.
    pub fn apply_line(&mut self, line: &LogLine) -> Option<Snapshot> {
        let at = line.at?;
        self.apply(&line.event, at)
    }

    /// Applies one event that occurred at `event_time` (log time).
    pub fn apply(&mut self, event: &LogEvent, event_time: DateTime<Utc>) -> Option<Snapshot> {
        match event {
            LogEvent::SessionStart { at } => {
                if self.is_active() {
                    tracing::debug!(at = %at, "session restarted without stop marker");
                } else {
                    tracing::debug!(at = %at, "session started");
                }
                let session = self.session.insert(SessionState::started(*at));
                Some(event_snapshot(session))
            }
            LogEvent::SessionStop { at } => {
                let session = self.session.as_mut().filter(|s| s.active)?;
                session.active = false;
                advance(session, *at);
                tracing::debug!(at = %at, rewards = session.rewards.len(), "session stopped");
                Some(event_snapshot(session))
            }
            LogEvent::RewardDelta { .. } | LogEvent::RewardUnit { .. } => {
                let (name, amount) = event.reward()?;
                let session = self.session.as_mut().filter(|s| s.active)?;
                let total = session.rewards.entry(name.to_string()).or_insert(0);
                *total = total.saturating_add(amount);
                advance(session, event_time);
                Some(event_snapshot(session))
            }
            LogEvent::Unrecognized => None,
        }
    }

    /// Produces a heartbeat snapshot at wall time `now` while a session is open.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Snapshot> {
        let session = self.session.as_mut().filter(|s| s.active)?;
        let elapsed = now - session.started_at;
        let duration = clamp_reported(session, elapsed);
        Some(Snapshot {
            kind: SnapshotKind::Heartbeat,
            active: true,
            started_at: session.started_at,
            last_event_at: now,
            duration_seconds: seconds(duration),
            rewards: session.rewards.clone(),
        })
    }

    /// Snapshot of the current state without changing it, if any session was seen.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let session = self.session.as_ref()?;
        let duration = (session.last_event_at - session.started_at).max(session.reported);
        Some(Snapshot {
            kind: SnapshotKind::Event,
            active: session.active,
            started_at: session.started_at,
            last_event_at: session.last_event_at,
            duration_seconds: seconds(duration),
            rewards: session.rewards.clone(),
        })
    }
}

/// Moves `last_event_at` forward; out-of-order times never move it back.
fn advance(session: &mut SessionState, event_time: DateTime<Utc>) {
    if event_time < session.last_event_at {
        tracing::debug!(
            event_time = %event_time,
            last_event_at = %session.last_event_at,
            "out-of-order event time"
        );
        return;
    }
    session.last_event_at = event_time;
}

fn clamp_reported(session: &mut SessionState, duration: Duration) -> Duration {
    let duration = duration.max(Duration::zero()).max(session.reported);
    session.reported = duration;
    duration
}

fn event_snapshot(session: &mut SessionState) -> Snapshot {
    let elapsed = session.last_event_at - session.started_at;
    let duration = clamp_reported(session, elapsed);
    Snapshot {
        kind: SnapshotKind::Event,
        active: session.active,
        started_at: session.started_at,
        last_event_at: session.last_event_at,
        duration_seconds: seconds(duration),
        rewards: session.rewards.clone(),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "session lengths in milliseconds fit comfortably in f64"
)]
fn seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}
