//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;

    init_logging(cli.verbose, config.log_level.as_deref());
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Flag beats config beats default
    let output_format = cli.output.or(config.output_format).unwrap_or_default();

    // Create context for commands
    let ctx = commands::Context {
        output_format,
        verbose: cli.verbose,
        no_color: cli.no_color,
        config,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Discover(args) => commands::discover::execute(ctx, args).await,
        Commands::Probes => commands::probes::execute(&ctx),
        Commands::Monitor(args) => commands::monitor::execute(ctx, args).await,
        Commands::Explore(args) => commands::explore::execute(ctx, args).await,
        Commands::Hardware => commands::hardware::execute(ctx).await,
        Commands::Config(args) => commands::config::execute(&ctx, args),
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins, then `--verbose`, then the configured level.
fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(configured.unwrap_or("warn"))
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
