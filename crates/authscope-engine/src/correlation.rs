//! Interaction correlation.
//!
//! For each control on the settings surface: note the time, trigger the
//! control, wait out the attribution window, and credit every event the
//! monitor logged inside `[t0, t0 + window]` to that control.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use authscope_core::{
    Control, DiscoveryReport, DiscoveryResult, ExplorationState, InteractionRecord, Result,
};

use crate::context::RunContext;
use crate::{ATTRIBUTION_WINDOW, SETTLE_DELAY};

/// Timing and scope of an exploration
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// How long after a trigger events are credited to it
    pub attribution_window: Duration,
    /// Pause between two triggers
    pub settle_delay: Duration,
    /// Sections never visited
    pub skip_sections: Vec<String>,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            attribution_window: ATTRIBUTION_WINDOW,
            settle_delay: SETTLE_DELAY,
            skip_sections: Vec::new(),
        }
    }
}

/// Drives the surface and pairs controls with the events they cause
pub struct CorrelationEngine {
    ctx: RunContext,
    config: CorrelationConfig,
    state: RwLock<ExplorationState>,
    records: Mutex<Vec<InteractionRecord>>,
    stop: AtomicBool,
}

impl CorrelationEngine {
    /// Engine with default timing
    pub fn new(ctx: RunContext) -> Self {
        Self::with_config(ctx, CorrelationConfig::default())
    }

    /// Engine with explicit timing
    pub fn with_config(ctx: RunContext, config: CorrelationConfig) -> Self {
        Self {
            ctx,
            config,
            state: RwLock::default(),
            records: Mutex::default(),
            stop: AtomicBool::new(false),
        }
    }

    /// Visit every section and trigger every control.
    ///
    /// A section that cannot be reached or enumerated is skipped. The
    /// returned report holds the records collected, including after a stop.
    ///
    /// # Errors
    ///
    /// The navigator's error when the surface cannot be opened or its
    /// sections listed; the state is then [`ExplorationState::Error`].
    pub async fn explore(&self) -> Result<DiscoveryReport> {
        self.stop.store(false, Ordering::SeqCst);
        self.lock_records().clear();
        let started = Utc::now();
        info!("starting interaction exploration");

        let navigator = &self.ctx.navigator;
        if let Err(e) = navigator.open().await {
            return Err(self.fail(e));
        }
        let sections = match navigator.list_sections().await {
            Ok(sections) => sections,
            Err(e) => return Err(self.fail(e)),
        };

        'sections: for section in &sections {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            if self.config.skip_sections.iter().any(|s| s == section)
                || self.ctx.oracle.should_skip(section)
            {
                debug!(section = %section, "section skipped");
                continue;
            }

            self.set_state(ExplorationState::Exploring(section.clone()));
            if let Err(e) = navigator.navigate(section).await {
                warn!(section = %section, error = %e, "navigation failed, skipping section");
                continue;
            }
            let controls = match navigator.list_controls().await {
                Ok(controls) => controls,
                Err(e) => {
                    warn!(section = %section, error = %e, "control enumeration failed, skipping section");
                    continue;
                }
            };
            debug!(section = %section, controls = controls.len(), "exploring section");

            for control in &controls {
                if self.stop.load(Ordering::SeqCst) {
                    break 'sections;
                }
                if self.ctx.oracle.should_skip(&control.path) {
                    continue;
                }
                if let Some(record) = self.interact(control).await {
                    info!(path = %record.control_path, events = record.events.len(), "authorization attributed");
                    self.lock_records().push(record);
                }
                if !self.config.settle_delay.is_zero() {
                    tokio::time::sleep(self.config.settle_delay).await;
                }
            }
        }

        self.set_state(ExplorationState::Completed);
        let records = self.records();
        info!(records = records.len(), "interaction exploration finished");
        Ok(DiscoveryReport::new(
            started,
            Utc::now(),
            records.into_iter().map(DiscoveryResult::from).collect(),
        ))
    }

    /// Trigger one control and collect what followed it
    async fn interact(&self, control: &Control) -> Option<InteractionRecord> {
        let navigator = &self.ctx.navigator;
        let t0 = Utc::now();
        self.ctx.monitor.simulate_trigger(&control.path);

        match navigator.trigger(control).await {
            Ok(true) => debug!(path = %control.path, "control triggered"),
            Ok(false) => debug!(path = %control.path, "control could not be clicked"),
            Err(e) => warn!(path = %control.path, error = %e, "trigger failed"),
        }
        tokio::time::sleep(self.config.attribution_window).await;

        let events = self
            .ctx
            .monitor
            .events_between(t0, window_end(t0, self.config.attribution_window));

        match navigator.dismiss_dialog().await {
            Ok(dialog) => debug!(path = %control.path, ?dialog, "dialog check done"),
            Err(e) => debug!(path = %control.path, error = %e, "dialog dismissal failed"),
        }

        InteractionRecord::attribute(control, events)
    }

    fn fail(&self, e: authscope_core::AuthScopeError) -> authscope_core::AuthScopeError {
        error!(error = %e, "settings surface unavailable");
        self.set_state(ExplorationState::Error(e.to_string()));
        e
    }

    /// Halt before the next control
    pub fn stop(&self) {
        info!("exploration stop requested");
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Current exploration state
    pub fn state(&self) -> ExplorationState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records collected by the current or last exploration
    pub fn records(&self) -> Vec<InteractionRecord> {
        self.lock_records().clone()
    }

    /// Timing in effect
    pub const fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    fn set_state(&self, state: ExplorationState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<InteractionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CorrelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationEngine")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn window_end(t0: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window).map_or(t0, |w| t0 + w)
}
