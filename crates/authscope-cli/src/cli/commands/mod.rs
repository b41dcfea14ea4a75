//! Command implementations.

pub mod config;
pub mod discover;
pub mod explore;
pub mod hardware;
pub mod monitor;
pub mod probes;

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use authscope_core::DiscoveryReport;
use authscope_engine::{CommandRunner, HardwareProfile, RunContext, SystemCommandRunner};

use crate::config::Config;
use crate::output::{self, OutputFormat};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,

    /// Loaded configuration
    pub config: Config,
}

impl Context {
    /// Print `report` in the selected format and save it where asked.
    ///
    /// `save` is the `--save` target; the configured `report_dir` gets a
    /// copy as well.
    pub fn emit_report(&self, report: &DiscoveryReport, save: Option<&Path>) -> Result<()> {
        match output::render(self.output_format, report)? {
            Some(text) => println!("{text}"),
            None => output::print_report(report),
        }

        for target in save.into_iter().chain(self.config.report_dir.as_deref()) {
            let path = output::save_report(report, target)?;
            eprintln!("{} report saved to {}", "Saved:".green().bold(), path.display());
        }

        Ok(())
    }
}

/// Collaborators wired to this machine, plus the hardware profile they use.
pub async fn system_context() -> (RunContext, Arc<HardwareProfile>) {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
    let profile = Arc::new(HardwareProfile::detect(runner.as_ref()).await);
    (RunContext::with_profile(runner, Arc::clone(&profile)), profile)
}

/// Add the hardware profile and the monitor's stats and event log to `report`.
pub fn attach_environment(
    report: DiscoveryReport,
    run_ctx: &RunContext,
    profile: &HardwareProfile,
) -> Result<DiscoveryReport> {
    Ok(report.with_environment(
        serde_json::to_value(profile)?,
        profile.unavailable_features(),
        run_ctx.monitor.stats(),
        run_ctx.monitor.events(),
    ))
}

/// Warn on stderr, keeping stdout clean for structured output.
pub fn warn_user(message: impl std::fmt::Display) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}
