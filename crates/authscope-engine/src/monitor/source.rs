//! Event sources feeding the monitor.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use authscope_core::{AuthScopeError, Result};

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::POLL_TIMEOUT;

/// Unified-log predicate covering the authorization daemons and policy subsystems
const LOG_PREDICATE: &str = "process == \"authd\" OR process == \"SecurityAgent\" \
    OR process == \"tccd\" OR category == \"SystemPolicy\" OR subsystem CONTAINS \"security\"";

/// One raw entry of the system event stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEntry {
    /// Message text
    pub event_message: String,
    /// Path of the emitting executable
    pub process_image_path: String,
    /// Logging subsystem
    pub subsystem: String,
    /// Logging category
    pub category: String,
}

impl LogEntry {
    /// Entry with only a message and emitting process
    pub fn new(process_image_path: impl Into<String>, event_message: impl Into<String>) -> Self {
        Self {
            event_message: event_message.into(),
            process_image_path: process_image_path.into(),
            ..Self::default()
        }
    }

    /// Set the subsystem and category
    #[must_use]
    pub fn in_category(mut self, subsystem: impl Into<String>, category: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self.category = category.into();
        self
    }

    /// File name of the emitting process
    pub fn process_name(&self) -> &str {
        self.process_image_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.process_image_path)
    }
}

/// Asynchronous stream of system log entries.
///
/// Each call returns the entries of the most recent `slice` of history.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch entries from the last `slice`
    async fn poll(&self, slice: Duration) -> Result<Vec<LogEntry>>;
}

/// [`EventSource`] reading the macOS unified log through `log show`
pub struct UnifiedLogSource {
    runner: Arc<dyn CommandRunner>,
}

impl Default for UnifiedLogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifiedLogSource {
    /// Source bounded by the poll timeout
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemCommandRunner::with_timeout(POLL_TIMEOUT)))
    }

    /// Source issuing `log show` through `runner`
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl EventSource for UnifiedLogSource {
    async fn poll(&self, slice: Duration) -> Result<Vec<LogEntry>> {
        let last = format!("{}s", slice.as_secs().max(1));
        let out = self
            .runner
            .run(
                "log",
                &["show", "--last", &last, "--predicate", LOG_PREDICATE, "--style", "ndjson"],
            )
            .await?;

        if !out.success() {
            return Err(AuthScopeError::EventSource(format!(
                "log show exited with {}: {}",
                out.exit_code,
                out.stderr.trim()
            )));
        }

        Ok(parse_ndjson(&out.stdout))
    }
}

/// Parse newline-delimited JSON log output, skipping lines that are not entries
pub fn parse_ndjson(stdout: &str) -> Vec<LogEntry> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping malformed log line");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_parse_ndjson_skips_garbage() {
        let stdout = r#"{"eventMessage":"authorization right 'system.privilege.admin'","processImagePath":"/System/Library/Frameworks/Security.framework/Versions/A/MachServices/authd.xpc/Contents/MacOS/authd","timestamp":"x"}
not json
{"eventMessage":"hello","category":"SystemPolicy"}

"#;
        let entries = parse_ndjson(stdout);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].process_name(), "authd");
        assert_eq!(entries[1].category, "SystemPolicy");
        assert!(entries[1].subsystem.is_empty());
    }

    #[tokio::test]
    async fn test_unified_log_failure_is_event_source_error() {
        let runner = Arc::new(ScriptedRunner::new().fail("log", "log: permission denied"));
        let source = UnifiedLogSource::with_runner(runner);
        let err = source.poll(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AuthScopeError::EventSource(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_unified_log_parses_entries() {
        let runner = Arc::new(
            ScriptedRunner::new().ok("log", r#"{"eventMessage":"tccd: kTCCServiceCamera","processImagePath":"/usr/libexec/tccd"}"#),
        );
        let source = UnifiedLogSource::with_runner(runner.clone());
        let entries = source.poll(Duration::from_millis(200)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].process_name(), "tccd");
        assert!(runner.calls().iter().any(|c| c.contains("--last 1s")));
    }
}
