use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an event entered the monitor's log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventResult {
    /// Extracted from the system event stream
    #[default]
    Detected,
    /// Seeded by the correlation engine ahead of a trigger
    Simulated,
}

impl std::fmt::Display for EventResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detected => write!(f, "detected"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// One authorization-related observation from the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationEvent {
    /// Name of the authorization right involved
    pub right_name: String,

    /// Human description of the right
    pub right_description: String,

    /// Free text context, usually the originating subsystem
    pub context: String,

    /// Detected or simulated
    pub result: EventResult,

    /// When the event was observed
    pub timestamp: DateTime<Utc>,

    /// Open key/value bag (source, raw message, trigger path, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AuthorizationEvent {
    /// Create a detected event stamped with the current time
    #[must_use]
    pub fn new(
        right_name: impl Into<String>,
        right_description: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            right_name: right_name.into(),
            right_description: right_description.into(),
            context: context.into(),
            result: EventResult::Detected,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Mark the event as simulated
    #[must_use]
    pub const fn simulated(mut self) -> Self {
        self.result = EventResult::Simulated;
        self
    }

    /// Override the timestamp
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add one metadata entry
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Count of events for one right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightCount {
    /// Right name
    pub right: String,
    /// Number of events recorded for it
    pub count: usize,
}

/// Summary statistics over the monitor's event log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    /// Events currently in the log
    pub total_events: usize,
    /// Distinct right names
    pub unique_rights: usize,
    /// Events newer than one hour
    pub events_last_hour: usize,
    /// Up to ten rights, most frequent first
    pub most_common_rights: Vec<RightCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let event = AuthorizationEvent::new("system.privilege.admin", "Admin", "authd")
            .simulated()
            .with_meta("source", "ui_simulation");
        assert_eq!(event.result, EventResult::Simulated);
        assert_eq!(event.metadata.get("source").map(String::as_str), Some("ui_simulation"));
    }

    #[test]
    fn test_result_serializes_lowercase() {
        let event = AuthorizationEvent::new("r", "d", "c");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["result"], "detected");
        assert_eq!(json["rightName"], "r");
    }
}
