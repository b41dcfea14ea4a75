//! Run-scoped collaborators shared by the orchestrator and correlation engine.

use std::sync::Arc;

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::hardware::{CapabilityOracle, HardwareProfile};
use crate::monitor::EventMonitor;
use crate::surface::{SettingsNavigator, SurfaceNavigator};

/// Everything a run touches outside its own state.
///
/// Cloning is cheap; clones share the same collaborators and the same
/// event log.
#[derive(Clone)]
pub struct RunContext {
    /// Runs external commands for probes and the default navigator
    pub runner: Arc<dyn CommandRunner>,
    /// Drives the settings surface
    pub navigator: Arc<dyn SurfaceNavigator>,
    /// Decides which hardware-dependent paths to skip
    pub oracle: Arc<dyn CapabilityOracle>,
    /// Authorization event log
    pub monitor: EventMonitor,
}

impl RunContext {
    /// Assemble a context from explicit collaborators
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        navigator: Arc<dyn SurfaceNavigator>,
        oracle: Arc<dyn CapabilityOracle>,
        monitor: EventMonitor,
    ) -> Self {
        Self {
            runner,
            navigator,
            oracle,
            monitor,
        }
    }

    /// Context wired to the real system: shell commands, the settings
    /// application, a detected hardware profile and the unified log.
    pub async fn system() -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
        let profile = HardwareProfile::detect(runner.as_ref()).await;
        Self::with_profile(runner, Arc::new(profile))
    }

    /// Context over `runner` using an already detected hardware profile
    pub fn with_profile(runner: Arc<dyn CommandRunner>, profile: Arc<HardwareProfile>) -> Self {
        let navigator = Arc::new(SettingsNavigator::new(Arc::clone(&runner)));
        Self {
            navigator,
            oracle: profile,
            monitor: EventMonitor::system(),
            runner,
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}
