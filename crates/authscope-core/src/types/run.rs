use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an orchestrator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No run has been started
    #[default]
    NotStarted,
    /// Probes are executing
    Running,
    /// Every check executed
    Completed,
    /// Cancelled by `stop()`
    Stopped,
    /// A fatal fault ended the run
    Error,
}

impl RunStatus {
    /// Returns true for Completed, Stopped and Error
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Orchestrator-level run state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Current status
    pub status: RunStatus,
    /// Catalog size plus enumerated sections, fixed at start
    pub total_checks: usize,
    /// Checks executed so far
    pub completed_checks: usize,
    /// Checks that faulted and contributed nothing
    pub failed_checks: usize,
    /// Label of the check in flight
    pub current_label: String,
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal status
    pub ended_at: Option<DateTime<Utc>>,
    /// Fatal error message, when status is Error
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RunState {
    /// Fresh Running state for a new run
    #[must_use]
    pub fn started(total_checks: usize) -> Self {
        Self {
            status: RunStatus::Running,
            total_checks,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Move to a terminal status and stamp the end time
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }

    /// Seconds between start and end, or start and now while running
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_seconds(&self) -> f64 {
        let Some(start) = self.started_at else {
            return 0.0;
        };
        let end = if self.status.is_terminal() {
            self.ended_at.unwrap_or_else(Utc::now)
        } else {
            Utc::now()
        };
        (end - start).num_milliseconds() as f64 / 1000.0
    }

    /// Snapshot for the progress query surface
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            is_running: self.status == RunStatus::Running,
            percent: percent(self.completed_checks, self.total_checks),
            current_label: self.current_label.clone(),
            completed: self.completed_checks,
            total: self.total_checks,
        }
    }
}

/// Cheap progress view polled by the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Whether a run is in flight
    pub is_running: bool,
    /// Completion percentage, 0..=100
    pub percent: u8,
    /// Label of the check in flight
    pub current_label: String,
    /// Checks executed
    pub completed: usize,
    /// Checks planned
    pub total: usize,
}

#[allow(clippy::cast_possible_truncation)]
fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) * 100) / total) as u8
}
