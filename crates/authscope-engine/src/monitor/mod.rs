//! Background authorization event monitor.
//!
//! A single polling loop reads the [`EventSource`], runs every entry
//! through the [`EventExtractor`] and records the resulting events.
//! Recording drops near duplicates and notifies subscribers.

mod extract;
mod source;

pub use extract::{
    describe_right, EventExtractor, KNOWN_RIGHTS, SYSTEM_POLICY_RIGHT, TCC_RIGHT, UNKNOWN_RIGHT,
};
pub use source::{parse_ndjson, EventSource, LogEntry, UnifiedLogSource};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use authscope_core::{AuthorizationEvent, MonitorStats, RightCount};

use crate::{DEDUP_LOOKBACK, DEDUP_WINDOW, MONITOR_STOP_TIMEOUT, POLL_INTERVAL, POLL_SLICE};

type Subscriber = Arc<dyn Fn(&AuthorizationEvent) + Send + Sync>;

/// Right seeded by [`EventMonitor::simulate_trigger`]
const SIMULATED_RIGHT: &str = "system.preferences.security";

/// Number of rights listed in [`MonitorStats::most_common_rights`]
const TOP_RIGHTS: usize = 10;

/// Append-only authorization event log with a background poller.
///
/// Clones share the same log, subscribers and polling task.
#[derive(Clone)]
pub struct EventMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    source: Arc<dyn EventSource>,
    extractor: EventExtractor,
    events: Mutex<Vec<AuthorizationEvent>>,
    subscribers: Mutex<Vec<Subscriber>>,
    running: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventMonitor {
    /// Monitor over `source`
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                source,
                extractor: EventExtractor::new(),
                events: Mutex::default(),
                subscribers: Mutex::default(),
                running: AtomicBool::new(false),
                task: Mutex::default(),
            }),
        }
    }

    /// Monitor over the macOS unified log
    pub fn system() -> Self {
        Self::new(Arc::new(UnifiedLogSource::new()))
    }

    /// Returns true while the polling loop is active
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Spawn the polling loop. A second call while running only warns.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_monitoring(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            warn!("event monitor already running");
            return;
        }
        info!("starting authorization event monitor");

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            while monitor.is_running() {
                monitor.poll_once().await;
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            debug!("event monitor loop exited");
        });
        *lock(&self.inner.task) = Some(handle);
    }

    /// Signal the loop to stop and wait for it, aborting after the stop timeout
    pub async fn stop_monitoring(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping authorization event monitor");

        let handle = lock(&self.inner.task).take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(MONITOR_STOP_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                warn!(
                    timeout_secs = MONITOR_STOP_TIMEOUT.as_secs(),
                    "event monitor did not stop in time, aborting"
                );
                handle.abort();
            }
        }
    }

    /// Run one poll cycle, returning how many events were accepted.
    ///
    /// A failing poll is logged and yields zero.
    pub async fn poll_once(&self) -> usize {
        let entries = match self.inner.source.poll(POLL_SLICE).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "event poll failed, skipping cycle");
                return 0;
            }
        };

        entries
            .iter()
            .flat_map(|entry| self.inner.extractor.extract(entry))
            .map(|event| self.record(event))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Register a callback invoked for every accepted event, in registration order
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&AuthorizationEvent) + Send + Sync + 'static,
    {
        lock(&self.inner.subscribers).push(Arc::new(callback));
    }

    /// Append `event` unless it duplicates a recent one.
    ///
    /// Among the last ten events, one with the same right less than a
    /// second away makes `event` a duplicate. Returns true if accepted.
    pub fn record(&self, event: AuthorizationEvent) -> bool {
        {
            let mut events = lock(&self.inner.events);
            let start = events.len().saturating_sub(DEDUP_LOOKBACK);
            let duplicate = events[start..].iter().any(|recent| {
                recent.right_name == event.right_name
                    && within(recent.timestamp, event.timestamp, DEDUP_WINDOW)
            });
            if duplicate {
                debug!(right = %event.right_name, "dropping duplicate event");
                return false;
            }
            events.push(event.clone());
        }

        info!(right = %event.right_name, result = %event.result, "authorization event recorded");
        self.notify(&event);
        true
    }

    fn notify(&self, event: &AuthorizationEvent) {
        let subscribers = lock(&self.inner.subscribers).clone();
        for (index, subscriber) in subscribers.iter().enumerate() {
            if std::panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))).is_err() {
                error!(subscriber = index, right = %event.right_name, "event subscriber panicked");
            }
        }
    }

    /// Snapshot of the whole log
    pub fn events(&self) -> Vec<AuthorizationEvent> {
        lock(&self.inner.events).clone()
    }

    /// Events with `timestamp >= since`
    pub fn events_since(&self, since: DateTime<Utc>) -> Vec<AuthorizationEvent> {
        lock(&self.inner.events)
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect()
    }

    /// Events with `start <= timestamp <= end`
    pub fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<AuthorizationEvent> {
        lock(&self.inner.events)
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }

    /// Empty the log
    pub fn clear_events(&self) {
        lock(&self.inner.events).clear();
        info!("authorization events cleared");
    }

    /// Seed a simulated event ahead of triggering `path`.
    ///
    /// Only paths mentioning security or privacy produce an event.
    pub fn simulate_trigger(&self, path: &str) -> bool {
        debug!(path, "watching for authorization triggered by path");
        let lower = path.to_lowercase();
        if !(lower.contains("security") || lower.contains("privacy")) {
            return false;
        }

        let event = AuthorizationEvent::new(
            SIMULATED_RIGHT,
            "Security & Privacy settings access",
            format!("System Settings: {path}"),
        )
        .simulated()
        .with_meta("trigger_path", path)
        .with_meta("source", "ui_simulation");
        self.record(event)
    }

    /// Summary statistics over the log
    pub fn stats(&self) -> MonitorStats {
        let events = lock(&self.inner.events);
        let hour_ago = Utc::now() - chrono::Duration::hours(1);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in events.iter() {
            *counts.entry(event.right_name.as_str()).or_insert(0) += 1;
        }

        let mut most_common: Vec<RightCount> = counts
            .iter()
            .map(|(right, count)| RightCount {
                right: (*right).to_string(),
                count: *count,
            })
            .collect();
        most_common.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.right.cmp(&b.right)));
        most_common.truncate(TOP_RIGHTS);

        MonitorStats {
            total_events: events.len(),
            unique_rights: counts.len(),
            events_last_hour: events.iter().filter(|e| e.timestamp > hour_ago).count(),
            most_common_rights: most_common,
        }
    }
}

impl std::fmt::Debug for EventMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMonitor")
            .field("events", &lock(&self.inner.events).len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Strictly less than `window` apart, in either direction
fn within(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    let delta = if a >= b { a - b } else { b - a };
    delta.to_std().is_ok_and(|d| d < window)
}
