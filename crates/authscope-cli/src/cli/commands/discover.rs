//! `authscope discover` - run the probe catalog and report authorization points.

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use authscope_core::{DiscoveryReport, Progress, RunStatus};
use authscope_engine::{CorrelationConfig, CorrelationEngine, Orchestrator};

use super::{attach_environment, explore, system_context, warn_user, Context};
use crate::cli::args::DiscoverArgs;
use crate::output::OutputFormat;

const PROGRESS_TICK: Duration = Duration::from_millis(100);

pub async fn execute(ctx: Context, args: DiscoverArgs) -> Result<()> {
    let (run_ctx, profile) = system_context().await;
    run_ctx.monitor.start_monitoring();

    let orchestrator = Arc::new(Orchestrator::new(run_ctx.clone()));
    let show_bar = !args.no_progress && ctx.output_format == OutputFormat::Pretty;

    let mut report = match drive(&orchestrator, show_bar, tokio::signal::ctrl_c()).await {
        Ok(report) => report,
        Err(e) => {
            run_ctx.monitor.stop_monitoring().await;
            return Err(e);
        }
    };

    let stopped = orchestrator.state().status == RunStatus::Stopped;
    if (args.explore || ctx.config.explore_by_default) && !stopped {
        let engine = Arc::new(CorrelationEngine::with_config(
            run_ctx.clone(),
            CorrelationConfig {
                skip_sections: ctx.config.skip_sections.clone(),
                ..CorrelationConfig::default()
            },
        ));
        match explore::drive(engine, tokio::signal::ctrl_c()).await {
            Ok(interactions) => report.merge(interactions),
            Err(e) => warn_user(format!("exploration skipped: {e}")),
        }
    }
    run_ctx.monitor.stop_monitoring().await;

    let report = attach_environment(report, &run_ctx, &profile)?;
    ctx.emit_report(&report, args.save.as_deref())?;

    if ctx.output_format == OutputFormat::Pretty {
        let state = orchestrator.state();
        println!();
        println!(
            "  {} {} in {:.1}s, {} of {} checks failed",
            "Run:".bold(),
            state.status,
            state.elapsed_seconds(),
            state.failed_checks,
            state.total_checks
        );
    }

    Ok(())
}

/// Run the orchestrator, feeding the progress bar and turning `interrupt`
/// (Ctrl-C in practice) into a stop.
async fn drive<F>(orchestrator: &Arc<Orchestrator>, show_bar: bool, interrupt: F) -> Result<DiscoveryReport>
where
    F: Future,
{
    let bar = show_bar.then(progress_bar);
    let runner = Arc::clone(orchestrator);
    let mut run = tokio::spawn(async move { runner.start().await });
    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let joined = loop {
        tokio::select! {
            joined = &mut run => break joined,
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                warn!("interrupt received, stopping after the current check");
                orchestrator.stop();
            }
            _ = ticker.tick() => {
                if let Some(bar) = &bar {
                    update(bar, &orchestrator.progress());
                }
            }
        }
    };

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let report = joined??;
    Ok(report)
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

fn update(bar: &ProgressBar, progress: &Progress) {
    bar.set_length(u64::try_from(progress.total).unwrap_or(u64::MAX));
    bar.set_position(u64::try_from(progress.completed).unwrap_or(u64::MAX));
    bar.set_message(progress.current_label.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use authscope_engine::testing::{FakeNavigator, FakeProbe, QueuedSource, ScriptedRunner};
    use authscope_engine::{EventMonitor, HardwareProfile, Probe, RunContext};

    fn orchestrator(probes: usize) -> Arc<Orchestrator> {
        let ctx = RunContext::new(
            Arc::new(ScriptedRunner::new()),
            Arc::new(FakeNavigator::new()),
            Arc::new(HardwareProfile::full()),
            EventMonitor::new(Arc::new(QueuedSource::new())),
        );
        let probes = (0..probes)
            .map(|i| Box::new(FakeProbe::slow(&format!("slow-{i}"), Duration::from_millis(100))) as Box<dyn Probe>)
            .collect();
        Arc::new(Orchestrator::with_probes(ctx, probes))
    }

    #[tokio::test]
    async fn test_interrupt_stops_the_run() {
        let orch = orchestrator(5);
        let interrupt = tokio::time::sleep(Duration::from_millis(150));

        drive(&orch, false, interrupt).await.unwrap();
        let state = orch.state();
        assert_eq!(state.status, RunStatus::Stopped);
        assert!(state.completed_checks < state.total_checks);
    }

    #[tokio::test]
    async fn test_interrupt_is_observed_across_progress_ticks() {
        // The interrupt lands after several ticks have already fired.
        let orch = orchestrator(6);
        let interrupt = tokio::time::sleep(PROGRESS_TICK * 3 + Duration::from_millis(20));

        drive(&orch, false, interrupt).await.unwrap();
        assert_eq!(orch.state().status, RunStatus::Stopped);
    }

    #[tokio::test]
    async fn test_run_without_interrupt_completes() {
        let orch = orchestrator(2);
        drive(&orch, false, std::future::pending::<()>()).await.unwrap();
        assert_eq!(orch.state().status, RunStatus::Completed);
    }
}
