//! Typed events extracted from raw log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single event recognized in the log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// A named reward increment with an explicit count.
    RewardDelta { name: String, amount: u64 },
    /// A named reward acquired once, with no count in the message.
    RewardUnit { name: String },
    /// A tracked session has begun.
    SessionStart { at: DateTime<Utc> },
    /// The tracked session has ended.
    SessionStop { at: DateTime<Utc> },
    /// The line matched no known shape.
    Unrecognized,
}

impl LogEvent {
    /// Returns the reward name and amount if this event increments a reward.
    pub fn reward(&self) -> Option<(&str, u64)> {
        match self {
            Self::RewardDelta { name, amount } => Some((name, *amount)),
            Self::RewardUnit { name } => Some((name, 1)),
            _ => None,
        }
    }
}

/// A classified line together with the time embedded in its prefix.
///
/// `at` is `None` only when the timestamp prefix did not match, in which
/// case `event` is always [`LogEvent::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub at: Option<DateTime<Utc>>,
    pub event: LogEvent,
}

impl LogLine {
    /// A line with no usable prefix.
    pub const fn unrecognized() -> Self {
        Self {
            at: None,
            event: LogEvent::Unrecognized,
        }
    }

    pub const fn is_unrecognized(&self) -> bool {
        matches!(self.event, LogEvent::Unrecognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_unit_counts_as_one() {
        let event = LogEvent::RewardUnit {
            name: "Latinum".to_string(),
        };
        assert_eq!(event.reward(), Some(("Latinum", 1)));
    }

    #[test]
    fn session_markers_are_not_rewards() {
        let at = Utc::now();
        assert_eq!(LogEvent::SessionStart { at }.reward(), None);
        assert_eq!(LogEvent::SessionStop { at }.reward(), None);
        assert_eq!(LogEvent::Unrecognized.reward(), None);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = LogEvent::RewardDelta {
            name: "Dilithium Ore".to_string(),
            amount: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"reward_delta","name":"Dilithium Ore","amount":1500}"#
        );
    }
}
