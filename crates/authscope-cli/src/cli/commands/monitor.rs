//! `authscope monitor` - stream authorization events from the unified log.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use tracing::info;

use authscope_engine::EventMonitor;

use super::Context;
use crate::cli::args::MonitorArgs;
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: MonitorArgs) -> Result<()> {
    let monitor = EventMonitor::system();
    let format = ctx.output_format;

    monitor.subscribe(move |event| match format {
        OutputFormat::Pretty => println!("{}", output::event_line(event)),
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        }
        OutputFormat::Yaml => {
            if let Ok(doc) = serde_yaml::to_string(event) {
                println!("---\n{doc}");
            }
        }
    });

    if format == OutputFormat::Pretty {
        let until = args
            .seconds
            .map_or_else(|| "Ctrl-C".to_string(), |s| format!("{s}s or Ctrl-C"));
        eprintln!("{} authorization events (until {until})", "Monitoring".bold());
    }

    monitor.start_monitoring();
    let deadline = async {
        match args.seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        () = deadline => {}
        _ = tokio::signal::ctrl_c() => info!("interrupt received, stopping monitor"),
    }
    monitor.stop_monitoring().await;

    let stats = monitor.stats();
    match format {
        OutputFormat::Pretty => {
            println!();
            output::print_stats(&stats);
        }
        _ => {
            if let Some(text) = output::render(format, &stats)? {
                eprintln!("{text}");
            }
        }
    }

    Ok(())
}
