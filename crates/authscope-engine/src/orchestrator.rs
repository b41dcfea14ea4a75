//! Probe orchestrator.
//!
//! Runs the catalog and the per-section checks strictly in order, one at a
//! time, while `progress()` may be polled from other tasks.

use chrono::Utc;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

use authscope_core::{
    AuthScopeError, AuthorizationPoint, DiscoveryReport, DiscoveryResult, Progress, Result,
    RunState, RunStatus,
};

use crate::catalog::{default_catalog, section_points, Probe};
use crate::context::RunContext;
use crate::rights::{enhance_rights, RightRules};

/// Sequences probes and section checks, tracking a [`RunState`]
pub struct Orchestrator {
    ctx: RunContext,
    probes: Vec<Box<dyn Probe>>,
    rules: RightRules,
    state: RwLock<RunState>,
    results: Mutex<Vec<AuthorizationPoint>>,
    stop: AtomicBool,
}

impl Orchestrator {
    /// Orchestrator over the built-in catalog and rule table
    pub fn new(ctx: RunContext) -> Self {
        Self::with_probes(ctx, default_catalog())
    }

    /// Orchestrator over an explicit probe list
    pub fn with_probes(ctx: RunContext, probes: Vec<Box<dyn Probe>>) -> Self {
        Self {
            ctx,
            probes,
            rules: RightRules::default(),
            state: RwLock::default(),
            results: Mutex::default(),
            stop: AtomicBool::new(false),
        }
    }

    /// Replace the right inference rules
    #[must_use]
    pub fn with_rules(mut self, rules: RightRules) -> Self {
        self.rules = rules;
        self
    }

    /// Registered probes, in execution order
    pub fn probes(&self) -> &[Box<dyn Probe>] {
        &self.probes
    }

    /// Run every probe, then every section check.
    ///
    /// Probe failures and panics are logged and counted; they never end the
    /// run. The returned report holds whatever was collected, including
    /// after a cooperative stop.
    ///
    /// # Errors
    ///
    /// [`AuthScopeError::AlreadyRunning`] if a run is in flight, or the
    /// navigator's error when sections cannot be enumerated (the run then
    /// ends in [`RunStatus::Error`]).
    pub async fn start(&self) -> Result<DiscoveryReport> {
        {
            let mut state = self.write_state();
            if state.status == RunStatus::Running {
                warn!("discovery already running");
                return Err(AuthScopeError::AlreadyRunning);
            }
            self.stop.store(false, Ordering::SeqCst);
            *state = RunState::started(0);
        }
        self.lock_results().clear();
        let started = Utc::now();
        info!(probes = self.probes.len(), "starting authorization discovery");

        let sections = match self.ctx.navigator.list_sections().await {
            Ok(sections) => sections,
            Err(e) => {
                error!(error = %e, "could not enumerate settings sections");
                let mut state = self.write_state();
                state.error_message = Some(e.to_string());
                state.finish(RunStatus::Error);
                return Err(e);
            }
        };
        self.write_state().total_checks = self.probes.len() + sections.len();

        let mut stopped = false;
        for probe in &self.probes {
            if self.stop.load(Ordering::SeqCst) {
                stopped = true;
                break;
            }
            self.write_state().current_label = probe.label().to_string();
            let points = self.run_probe(probe.as_ref()).await;
            self.advance(points);
        }

        for section in &sections {
            if stopped || self.stop.load(Ordering::SeqCst) {
                stopped = true;
                break;
            }
            self.write_state().current_label = section.clone();
            let points = if self.ctx.oracle.should_skip(section) {
                debug!(section = %section, "section skipped for missing hardware");
                Some(Vec::new())
            } else {
                Some(section_points(section))
            };
            self.advance(points);
        }

        // A stop accepted during the last check still ends the run as Stopped
        let stopped = stopped || self.stop.load(Ordering::SeqCst);
        let filled = enhance_rights(&mut self.lock_results(), &self.rules);
        let status = if stopped {
            RunStatus::Stopped
        } else {
            RunStatus::Completed
        };
        let report = {
            let mut state = self.write_state();
            state.current_label.clear();
            state.finish(status);
            info!(
                status = %status,
                completed = state.completed_checks,
                failed = state.failed_checks,
                inferred_rights = filled,
                elapsed_secs = state.elapsed_seconds(),
                "discovery finished"
            );
            DiscoveryReport::new(started, state.ended_at.unwrap_or_else(Utc::now), self.report_results())
        };
        Ok(report)
    }

    async fn run_probe(&self, probe: &dyn Probe) -> Option<Vec<AuthorizationPoint>> {
        let outcome = AssertUnwindSafe(probe.run(self.ctx.runner.as_ref()))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(points)) => {
                debug!(probe = probe.name(), found = points.len(), "probe finished");
                Some(points)
            }
            Ok(Err(e)) => {
                warn!(probe = probe.name(), error = %e, "probe failed, skipping");
                None
            }
            Err(_) => {
                warn!(probe = probe.name(), "probe panicked, skipping");
                None
            }
        }
    }

    /// Count one check as done; `None` marks it failed
    fn advance(&self, points: Option<Vec<AuthorizationPoint>>) {
        let failed = points.is_none();
        if let Some(points) = points {
            self.lock_results().extend(points);
        }
        let mut state = self.write_state();
        state.completed_checks += 1;
        if failed {
            state.failed_checks += 1;
        }
    }

    /// Request cooperative cancellation before the next check
    pub fn stop(&self) {
        if self.read_state().status == RunStatus::Running {
            info!("discovery stop requested");
            self.stop.store(true, Ordering::SeqCst);
        }
    }

    /// Progress snapshot; safe to call while `start` runs
    pub fn progress(&self) -> Progress {
        self.read_state().progress()
    }

    /// Clone of the run state
    pub fn state(&self) -> RunState {
        self.read_state().clone()
    }

    /// Seconds since start, frozen once the run is terminal
    pub fn elapsed_seconds(&self) -> f64 {
        self.read_state().elapsed_seconds()
    }

    /// Points collected by the current or last run
    pub fn results(&self) -> Vec<AuthorizationPoint> {
        self.lock_results().clone()
    }

    fn report_results(&self) -> Vec<DiscoveryResult> {
        self.lock_results()
            .iter()
            .cloned()
            .map(DiscoveryResult::from)
            .collect()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RunState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, Vec<AuthorizationPoint>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("probes", &self.probes.len())
            .field("state", &self.read_state().status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareProfile;
    use crate::monitor::EventMonitor;
    use crate::testing::{FakeNavigator, FakeProbe, QueuedSource, ScriptedRunner};
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx(navigator: FakeNavigator) -> RunContext {
        RunContext::new(
            Arc::new(ScriptedRunner::new()),
            Arc::new(navigator),
            Arc::new(HardwareProfile::full()),
            EventMonitor::new(Arc::new(QueuedSource::new())),
        )
    }

    #[tokio::test]
    async fn test_failing_and_panicking_probes_are_isolated() {
        let probes: Vec<Box<dyn Probe>> = vec![
            Box::new(FakeProbe::admin("a", "network")),
            Box::new(FakeProbe::failing("b")),
            Box::new(FakeProbe::panicking("c")),
            Box::new(FakeProbe::admin("d", "security")),
        ];
        let orch = Orchestrator::with_probes(ctx(FakeNavigator::new()), probes);
        let report = orch.start().await.unwrap();

        let state = orch.state();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.total_checks, 4);
        assert_eq!(state.completed_checks, 4);
        assert_eq!(state.failed_checks, 2);
        assert_eq!(report.summary.total, 2);
    }

    #[tokio::test]
    async fn test_sections_count_as_checks() {
        let nav = FakeNavigator::new()
            .section("Sharing", &[])
            .section("Wallpaper", &[])
            .section("Battery", &[]);
        let profile = HardwareProfile::full().without_battery();
        let ctx = RunContext::new(
            Arc::new(ScriptedRunner::new()),
            Arc::new(nav),
            Arc::new(profile),
            EventMonitor::new(Arc::new(QueuedSource::new())),
        );
        let orch = Orchestrator::with_probes(ctx, Vec::new());
        let report = orch.start().await.unwrap();

        let state = orch.state();
        assert_eq!(state.total_checks, 3);
        assert_eq!(state.completed_checks, 3);
        assert_eq!(report.summary.by_kind["sharing"], 1);
        assert_eq!(report.summary.total, 1);
    }

    #[tokio::test]
    async fn test_rights_enhanced_after_run() {
        let orch = Orchestrator::with_probes(
            ctx(FakeNavigator::new()),
            vec![Box::new(FakeProbe::admin("fv", "security"))],
        );
        orch.start().await.unwrap();
        assert_eq!(
            orch.results()[0].right_identifier.as_deref(),
            Some("system.privilege.admin")
        );
    }

    #[tokio::test]
    async fn test_section_listing_failure_is_fatal() {
        let orch = Orchestrator::with_probes(
            ctx(FakeNavigator::new().failing_list()),
            vec![Box::new(FakeProbe::admin("a", "network"))],
        );
        assert!(orch.start().await.is_err());
        let state = orch.state();
        assert_eq!(state.status, RunStatus::Error);
        assert!(state.error_message.is_some());
        assert!(state.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_restart_resets_state() {
        let orch = Orchestrator::with_probes(
            ctx(FakeNavigator::new()),
            vec![Box::new(FakeProbe::admin("a", "network"))],
        );
        orch.start().await.unwrap();
        let first_start = orch.state().started_at;
        orch.start().await.unwrap();
        let state = orch.state();
        assert_eq!(state.completed_checks, 1);
        assert_eq!(orch.results().len(), 1);
        assert!(state.started_at >= first_start);
    }

    #[tokio::test]
    async fn test_stop_during_final_probe_ends_stopped() {
        let probes: Vec<Box<dyn Probe>> = vec![
            Box::new(FakeProbe::slow("first", Duration::from_millis(100))),
            Box::new(FakeProbe::slow("last", Duration::from_millis(200))),
        ];
        let orch = Arc::new(Orchestrator::with_probes(ctx(FakeNavigator::new()), probes));

        let runner = Arc::clone(&orch);
        let run = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(150)).await;
        orch.stop();
        run.await.unwrap().unwrap();

        let state = orch.state();
        assert_eq!(state.status, RunStatus::Stopped);
        assert_eq!(state.completed_checks, 2);
    }

    #[tokio::test]
    async fn test_start_clears_stale_stop_request() {
        let orch = Orchestrator::with_probes(
            ctx(FakeNavigator::new()),
            vec![Box::new(FakeProbe::admin("a", "network"))],
        );
        orch.stop.store(true, Ordering::SeqCst);
        orch.start().await.unwrap();
        assert_eq!(orch.state().status, RunStatus::Completed);
    }

    #[test]
    fn test_idle_progress() {
        let orch = Orchestrator::with_probes(ctx(FakeNavigator::new()), Vec::new());
        let progress = orch.progress();
        assert!(!progress.is_running);
        assert_eq!(progress.total, 0);
        assert!(orch.elapsed_seconds().abs() < f64::EPSILON);
    }
}
