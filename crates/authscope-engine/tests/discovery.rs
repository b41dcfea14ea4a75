//! End-to-end orchestrator runs against scripted collaborators.

use std::sync::Arc;
use std::time::{Duration, Instant};

use authscope_core::{AuthScopeError, AuthType, AuthorizationPoint, RunStatus};
use authscope_engine::testing::{FakeNavigator, FakeProbe, QueuedSource, ScriptedRunner};
use authscope_engine::{
    default_catalog, EventMonitor, HardwareProfile, Orchestrator, Probe, RunContext,
};

fn context(runner: ScriptedRunner, navigator: FakeNavigator) -> RunContext {
    RunContext::new(
        Arc::new(runner),
        Arc::new(navigator),
        Arc::new(HardwareProfile::full()),
        EventMonitor::new(Arc::new(QueuedSource::new())),
    )
}

fn slow_probes(count: usize, delay: Duration) -> Vec<Box<dyn Probe>> {
    (0..count)
        .map(|i| Box::new(FakeProbe::slow(&format!("slow-{i}"), delay)) as Box<dyn Probe>)
        .collect()
}

#[tokio::test]
async fn progress_is_monotonic_and_reaches_total() {
    let navigator = FakeNavigator::new().section("Sharing", &[]).section("Network", &[]);
    let orch = Arc::new(Orchestrator::with_probes(
        context(ScriptedRunner::new(), navigator),
        slow_probes(8, Duration::from_millis(20)),
    ));

    let runner = Arc::clone(&orch);
    let run = tokio::spawn(async move { runner.start().await });

    let mut seen = Vec::new();
    while !run.is_finished() {
        seen.push(orch.progress().completed);
        tokio::time::sleep(Duration::from_millis(3)).await;
    }
    run.await.unwrap().unwrap();
    seen.push(orch.progress().completed);

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
    let state = orch.state();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.total_checks, 10);
    assert_eq!(state.completed_checks, state.total_checks);
    assert_eq!(orch.progress().percent, 100);
}

#[tokio::test]
async fn second_start_while_running_is_rejected() {
    let orch = Arc::new(Orchestrator::with_probes(
        context(ScriptedRunner::new(), FakeNavigator::new()),
        slow_probes(3, Duration::from_millis(50)),
    ));

    let runner = Arc::clone(&orch);
    let run = tokio::spawn(async move { runner.start().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = orch.start().await.unwrap_err();
    assert!(matches!(err, AuthScopeError::AlreadyRunning));

    run.await.unwrap().unwrap();
    assert_eq!(orch.state().status, RunStatus::Completed);
}

#[tokio::test]
async fn stop_halts_within_one_probe() {
    let delay = Duration::from_millis(100);
    let orch = Arc::new(Orchestrator::with_probes(
        context(ScriptedRunner::new(), FakeNavigator::new().section("Sharing", &[])),
        slow_probes(6, delay),
    ));

    let runner = Arc::clone(&orch);
    let run = tokio::spawn(async move { runner.start().await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    let asked = Instant::now();
    orch.stop();
    let report = run.await.unwrap().unwrap();
    assert!(asked.elapsed() < delay + Duration::from_millis(80));

    let state = orch.state();
    assert_eq!(state.status, RunStatus::Stopped);
    assert!(state.completed_checks < state.total_checks);
    assert_eq!(report.summary.total, orch.results().len());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(orch.state().status, RunStatus::Stopped);
    assert!(orch.elapsed_seconds() > 0.0);
}

#[tokio::test]
async fn admin_security_point_gets_admin_right() {
    let point = AuthorizationPoint::new(
        "security",
        "Lock Screen",
        "Lock Screen > Require password",
        AuthType::Admin,
        "Requires an administrator",
        "scenario",
    );
    let orch = Orchestrator::with_probes(
        context(ScriptedRunner::new(), FakeNavigator::new()),
        vec![Box::new(FakeProbe::yielding("scenario", vec![point]))],
    );

    let report = orch.start().await.unwrap();
    let points: Vec<_> = report.points().collect();
    assert_eq!(points[0].right_identifier.as_deref(), Some("system.privilege.admin"));
}

#[tokio::test]
async fn default_catalog_survives_a_bare_system() {
    // Nothing is scripted: every command fails to spawn.
    let runner = ScriptedRunner::new();
    let navigator = FakeNavigator::new().section("Users & Groups", &[]);
    let orch = Orchestrator::new(context(runner, navigator));

    let report = orch.start().await.unwrap();
    let state = orch.state();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.total_checks, default_catalog().len() + 1);
    assert!(state.failed_checks > 0);
    assert_eq!(report.summary.by_kind["accounts"], 1);
    assert!(report.points().all(|p| p.right_identifier.is_some()));
}

#[tokio::test]
async fn default_catalog_on_scripted_mac() {
    let runner = ScriptedRunner::new()
        .ok("fdesetup", "FileVault is On.\n")
        .ok("spctl", "assessments enabled\n")
        .ok("csrutil", "System Integrity Protection status: enabled.\n")
        .ok("sqlite3", "com.apple.Terminal|kTCCServiceSystemPolicyAllFiles\n")
        .ok_when(
            "security",
            "system.preferences.network",
            "<dict><key>rule</key><array><string>authenticate-admin</string></array></dict>",
        )
        .ok("security", "    \"/Users/me/Library/Keychains/login.keychain-db\"\n");
    let orch = Orchestrator::new(context(runner, FakeNavigator::new()));

    let report = orch.start().await.unwrap();
    let by_probe = |name: &str| report.points().filter(|p| p.source_probe == name).count();

    assert_eq!(by_probe("filevault"), 1);
    assert_eq!(by_probe("gatekeeper"), 1);
    assert_eq!(by_probe("system_integrity_protection"), 1);
    assert_eq!(by_probe("keychain"), 1);
    assert!(by_probe("tcc_database") >= 1);
    assert_eq!(by_probe("firmware_password"), 0);

    let sip = report
        .points()
        .find(|p| p.source_probe == "system_integrity_protection")
        .unwrap();
    assert_eq!(sip.auth_type, AuthType::RecoveryMode);
    assert_eq!(sip.right_identifier.as_deref(), Some("system.csr.configure"));
}
