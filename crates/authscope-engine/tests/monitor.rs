//! Event monitor polling, deduplication and queries.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use authscope_core::AuthorizationEvent;
use authscope_engine::monitor::{LogEntry, SYSTEM_POLICY_RIGHT, TCC_RIGHT};
use authscope_engine::testing::QueuedSource;
use authscope_engine::EventMonitor;

#[tokio::test]
async fn background_loop_feeds_subscribers() {
    let source = Arc::new(QueuedSource::new());
    source.push(vec![
        LogEntry::new("/usr/libexec/tccd", "authorization request for kTCCServiceMicrophone"),
        LogEntry::new("/usr/libexec/syspolicyd", "policy evaluation finished")
            .in_category("com.apple.syspolicy", "SystemPolicy"),
    ]);
    source.push_error("log show timed out");
    source.push(Vec::new());
    source.push(vec![LogEntry::new("/usr/libexec/tccd", "authorization request for kTCCServiceMicrophone")]);

    let monitor = EventMonitor::new(source);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    monitor.subscribe(move |event| sink.lock().unwrap().push(event.right_name.clone()));

    monitor.start_monitoring();
    tokio::time::sleep(Duration::from_millis(1_800)).await;
    monitor.stop_monitoring().await;

    let seen = seen.lock().unwrap().clone();
    assert!(seen.contains(&TCC_RIGHT.to_string()));
    assert!(seen.contains(&SYSTEM_POLICY_RIGHT.to_string()));
    assert!(seen.contains(&"kTCCServiceMicrophone".to_string()));

    // The fourth poll repeats the first entry more than a second later.
    let mic = seen.iter().filter(|r| *r == "kTCCServiceMicrophone").count();
    assert_eq!(mic, 2);
    assert_eq!(monitor.stats().total_events, seen.len());
}

#[test]
fn identical_events_within_a_second_collapse() {
    let monitor = EventMonitor::new(Arc::new(QueuedSource::new()));
    let t = Utc::now();
    monitor.record(AuthorizationEvent::new("system.preferences.sharing", "", "").at(t));
    monitor.record(
        AuthorizationEvent::new("system.preferences.sharing", "", "")
            .at(t - ChronoDuration::milliseconds(999)),
    );
    assert_eq!(monitor.events().len(), 1);
}

#[test]
fn events_since_edges() {
    let monitor = EventMonitor::new(Arc::new(QueuedSource::new()));
    let t = Utc::now();
    for (i, right) in ["a", "b", "c"].iter().enumerate() {
        monitor.record(AuthorizationEvent::new(*right, "", "").at(t + ChronoDuration::seconds(i64::try_from(i).unwrap())));
    }

    assert_eq!(monitor.events_since(t - ChronoDuration::days(1)).len(), 3);
    assert!(monitor.events_since(t + ChronoDuration::days(1)).is_empty());
    let since = monitor.events_since(t + ChronoDuration::seconds(1));
    assert!(since.iter().all(|e| e.timestamp >= t + ChronoDuration::seconds(1)));
    assert_eq!(since.len(), 2);
}
