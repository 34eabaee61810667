//! Persisted session summaries.
//!
//! A summary is written by the caller when a session ends and later read by
//! the offline report. The on-disk shape is a flat JSON object:
//!
//! ```json
//! {"start": 1710532800.0, "end": 1710532920.0, "duration": 120.0, "rewards": {"Latinum": 3}}
//! ```
//!
//! `start` and `end` are Unix epoch seconds; `duration` is seconds.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid epoch seconds: {0}")]
    InvalidTimestamp(f64),
}

/// A finished (or in-progress) session as persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    #[serde(default)]
    pub rewards: BTreeMap<String, u64>,
}

#[expect(
    clippy::cast_precision_loss,
    reason = "epoch milliseconds fit in f64 without loss for centuries"
)]
fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "non-finite and out-of-range values are rejected by chrono"
)]
fn from_epoch_seconds(secs: f64) -> Result<DateTime<Utc>, SummaryError> {
    if !secs.is_finite() {
        return Err(SummaryError::InvalidTimestamp(secs));
    }
    Utc.timestamp_millis_opt((secs * 1000.0).round() as i64)
        .single()
        .ok_or(SummaryError::InvalidTimestamp(secs))
}

impl SessionSummary {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            start: epoch_seconds(snapshot.started_at),
            end: epoch_seconds(snapshot.last_event_at),
            duration: snapshot.duration_seconds,
            rewards: snapshot.rewards.clone(),
        }
    }

    pub fn started_at(&self) -> Result<DateTime<Utc>, SummaryError> {
        from_epoch_seconds(self.start)
    }

    pub fn ended_at(&self) -> Result<DateTime<Utc>, SummaryError> {
        from_epoch_seconds(self.end)
    }

    /// File name used when saving: whole start seconds plus `.json`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "whole seconds are enough to name a session"
    )]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.start.floor() as i64)
    }

    /// Writes the summary into `dir`, creating it if needed.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf, SummaryError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, SummaryError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
