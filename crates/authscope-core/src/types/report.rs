use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::event::{AuthorizationEvent, MonitorStats};
use super::interaction::InteractionRecord;
use super::point::AuthorizationPoint;

/// Summary bucket used for interaction records in `byKind`
pub const INTERACTION_KIND: &str = "interaction";

/// One entry of a report's result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiscoveryResult {
    /// Probe-sourced fact
    Point(AuthorizationPoint),
    /// Interaction-sourced correlation
    Interaction(InteractionRecord),
}

impl DiscoveryResult {
    /// Kind used for summary grouping
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Point(point) => &point.kind,
            Self::Interaction(_) => INTERACTION_KIND,
        }
    }
}

impl From<AuthorizationPoint> for DiscoveryResult {
    fn from(point: AuthorizationPoint) -> Self {
        Self::Point(point)
    }
}

impl From<InteractionRecord> for DiscoveryResult {
    fn from(record: InteractionRecord) -> Self {
        Self::Interaction(record)
    }
}

/// Timing of the discovery session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session start
    pub start: DateTime<Utc>,
    /// Session end
    pub end: DateTime<Utc>,
    /// `end - start` in seconds
    pub duration_seconds: f64,
}

impl SessionInfo {
    /// Build from start and end timestamps
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_seconds: (end - start).num_milliseconds() as f64 / 1000.0,
        }
    }
}

/// Totals over a report's result list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Number of results
    pub total: usize,
    /// Results per kind
    pub by_kind: BTreeMap<String, usize>,
}

impl ReportSummary {
    /// Count results by kind
    #[must_use]
    pub fn from_results(results: &[DiscoveryResult]) -> Self {
        let mut by_kind = BTreeMap::new();
        for result in results {
            *by_kind.entry(result.kind().to_string()).or_insert(0) += 1;
        }
        Self {
            total: results.len(),
            by_kind,
        }
    }
}

/// Aggregate handed to the report sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    /// Session timing
    pub session: SessionInfo,
    /// Points and interaction records, in discovery order
    pub authorization_results: Vec<DiscoveryResult>,
    /// Totals
    pub summary: ReportSummary,
    /// Detected hardware of the machine the run observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<serde_json::Value>,
    /// Hardware features whose settings were skipped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_features: Vec<String>,
    /// Event monitor statistics at the end of the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_monitor_stats: Option<MonitorStats>,
    /// Every event the monitor accepted during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_authorization_events: Vec<AuthorizationEvent>,
}

impl DiscoveryReport {
    /// Build a report over `results`
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, results: Vec<DiscoveryResult>) -> Self {
        let summary = ReportSummary::from_results(&results);
        Self {
            session: SessionInfo::new(start, end),
            authorization_results: results,
            summary,
            hardware_profile: None,
            unavailable_features: Vec::new(),
            system_monitor_stats: None,
            all_authorization_events: Vec::new(),
        }
    }

    /// Attach the run's environment: the hardware profile, the features it
    /// lacked, and the monitor's statistics and event log.
    #[must_use]
    pub fn with_environment(
        mut self,
        hardware_profile: serde_json::Value,
        unavailable_features: Vec<String>,
        stats: MonitorStats,
        events: Vec<AuthorizationEvent>,
    ) -> Self {
        self.hardware_profile = Some(hardware_profile);
        self.unavailable_features = unavailable_features;
        self.system_monitor_stats = Some(stats);
        self.all_authorization_events = events;
        self
    }

    /// Fold another report's results into this one, widening the session.
    ///
    /// Environment sections already on `self` are kept; missing ones are
    /// taken from `other`.
    pub fn merge(&mut self, other: Self) {
        let start = self.session.start.min(other.session.start);
        let end = self.session.end.max(other.session.end);
        self.authorization_results.extend(other.authorization_results);
        self.session = SessionInfo::new(start, end);
        self.summary = ReportSummary::from_results(&self.authorization_results);

        if self.hardware_profile.is_none() {
            self.hardware_profile = other.hardware_profile;
            self.unavailable_features = other.unavailable_features;
        }
        if self.system_monitor_stats.is_none() {
            self.system_monitor_stats = other.system_monitor_stats;
            self.all_authorization_events = other.all_authorization_events;
        }
    }

    /// Probe-sourced points in the report
    pub fn points(&self) -> impl Iterator<Item = &AuthorizationPoint> {
        self.authorization_results.iter().filter_map(|r| match r {
            DiscoveryResult::Point(point) => Some(point),
            DiscoveryResult::Interaction(_) => None,
        })
    }

    /// Interaction records in the report
    pub fn interactions(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.authorization_results.iter().filter_map(|r| match r {
            DiscoveryResult::Interaction(record) => Some(record),
            DiscoveryResult::Point(_) => None,
        })
    }
}
