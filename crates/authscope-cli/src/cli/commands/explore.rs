//! `authscope explore` - attribute authorization events to settings controls.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use authscope_core::DiscoveryReport;
use authscope_engine::{CorrelationConfig, CorrelationEngine};

use super::{attach_environment, system_context, Context};
use crate::cli::args::ExploreArgs;

pub async fn execute(ctx: Context, args: ExploreArgs) -> Result<()> {
    let (run_ctx, profile) = system_context().await;
    let mut skip_sections = ctx.config.skip_sections.clone();
    skip_sections.extend(args.skip_sections);

    let engine = Arc::new(CorrelationEngine::with_config(
        run_ctx.clone(),
        CorrelationConfig {
            skip_sections,
            ..CorrelationConfig::default()
        },
    ));

    run_ctx.monitor.start_monitoring();
    let outcome = drive(engine, tokio::signal::ctrl_c()).await;
    run_ctx.monitor.stop_monitoring().await;

    let report = attach_environment(outcome?, &run_ctx, &profile)?;
    ctx.emit_report(&report, args.save.as_deref())
}

/// Run `engine` to completion, turning `interrupt` (Ctrl-C in practice)
/// into a cooperative stop.
pub async fn drive<F>(engine: Arc<CorrelationEngine>, interrupt: F) -> Result<DiscoveryReport>
where
    F: Future,
{
    let runner = Arc::clone(&engine);
    let mut run = tokio::spawn(async move { runner.explore().await });
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let joined = loop {
        tokio::select! {
            joined = &mut run => break joined,
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                warn!("interrupt received, stopping after the current control");
                engine.stop();
            }
        }
    };

    let report = joined??;
    Ok(report)
}
