//! Pattern classification of raw log lines.
//!
//! A line is accepted only when it carries the bracketed prefix
//! `[..., <YYYYMMDDTHHMMSS>, 0, ...]`. The free text after the prefix is then
//! tested against the known message shapes in priority order:
//!
//! 1. `Items acquired: <name> x <count>`
//! 2. `You received <count> <name>`
//! 3. `Item acquired: <name>`
//! 4. the session start marker (substring)
//! 5. the session stop marker (substring)
//!
//! The first match wins. Counts may contain thousands separators.

use std::num::ParseIntError;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::event::{LogEvent, LogLine};

/// Default substring marking the start of a tracked session.
pub const DEFAULT_START_MARKER: &str = "ChatLog ON";

/// Default substring marking the end of a tracked session.
pub const DEFAULT_STOP_MARKER: &str = "ChatLog OFF";

/// Format of the timestamp embedded in the line prefix (always UTC).
const PREFIX_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?:[^\]]*,)?(\d{8}T\d{6}),0(?:,[^\]]*)?\]\s*(.*)$").unwrap()
});

// Anchored at the start only; text after the count is ignored.
static BATCH_ACQUIRED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Items acquired: (.+) x ([\d,]+)").unwrap());

static RECEIVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^You received ([\d,]+) (.+?)\s*$").unwrap());

static SINGLE_ACQUIRED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Item acquired: (.+?)\s*$").unwrap());

/// Errors for lines that matched a pattern but carried bad data.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A count field matched the pattern but did not parse as an integer.
    #[error("invalid count {raw:?} in line {line:?}")]
    InvalidCount {
        raw: String,
        line: String,
        #[source]
        source: ParseIntError,
    },
}

/// Session boundary markers recognized by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub stop: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MARKER.to_string(),
            stop: DEFAULT_STOP_MARKER.to_string(),
        }
    }
}

/// Stateless line classifier.
///
/// Holds only the configured markers, so one instance can classify any
/// number of lines.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    markers: Markers,
}

impl Classifier {
    /// Creates a classifier with the given session markers.
    pub const fn new(markers: Markers) -> Self {
        Self { markers }
    }

    pub const fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Classifies one line of log text.
    ///
    /// Lines without a valid prefix, or whose message matches nothing, are
    /// returned as [`LogEvent::Unrecognized`]. A matched count that fails to
    /// parse is an error rather than a zero.
    pub fn classify(&self, line: &str) -> Result<LogLine, ClassifyError> {
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(caps) = PREFIX_RE.captures(line) else {
            return Ok(LogLine::unrecognized());
        };
        let Some(at) = parse_prefix_time(&caps[1]) else {
            tracing::debug!(timestamp = &caps[1], "unparseable prefix timestamp");
            return Ok(LogLine::unrecognized());
        };
        let message = caps.get(2).map_or("", |m| m.as_str());

        let event = self.classify_message(message, at, line)?;
        Ok(LogLine {
            at: Some(at),
            event,
        })
    }

    fn classify_message(
        &self,
        message: &str,
        at: DateTime<Utc>,
        line: &str,
    ) -> Result<LogEvent, ClassifyError> {
        if let Some(caps) = BATCH_ACQUIRED_RE.captures(message) {
            return Ok(LogEvent::RewardDelta {
                name: caps[1].to_string(),
                amount: parse_count(&caps[2], line)?,
            });
        }

        if let Some(caps) = RECEIVED_RE.captures(message) {
            return Ok(LogEvent::RewardDelta {
                name: caps[2].to_string(),
                amount: parse_count(&caps[1], line)?,
            });
        }

        if let Some(caps) = SINGLE_ACQUIRED_RE.captures(message) {
            return Ok(LogEvent::RewardUnit {
                name: caps[1].to_string(),
            });
        }

        if message.contains(&self.markers.start) {
            return Ok(LogEvent::SessionStart { at });
        }

        if message.contains(&self.markers.stop) {
            return Ok(LogEvent::SessionStop { at });
        }

        Ok(LogEvent::Unrecognized)
    }
}

fn parse_prefix_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, PREFIX_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses a count, ignoring thousands separators.
fn parse_count(raw: &str, line: &str) -> Result<u64, ClassifyError> {
    raw.replace(',', "")
        .parse()
        .map_err(|source| ClassifyError::InvalidCount {
            raw: raw.to_string(),
            line: line.to_string(),
            source,
        })
}
