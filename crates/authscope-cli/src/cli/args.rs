//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Discover where macOS asks for authorization
///
/// Runs a catalog of read-only probes against the system, optionally
/// drives System Settings to attribute live authorization events to the
/// controls that caused them, and reports what it found.
#[derive(Parser, Debug)]
#[command(name = "authscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every probe and section check and report authorization points
    Discover(DiscoverArgs),

    /// List the built-in probes and section checks
    Probes,

    /// Stream authorization events from the unified log
    Monitor(MonitorArgs),

    /// Trigger settings controls and attribute the events they cause
    Explore(ExploreArgs),

    /// Show the detected hardware profile
    Hardware,

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Discover command
// ============================================================================

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Also run interaction exploration after the probes
    #[arg(long)]
    pub explore: bool,

    /// Write the JSON report to this file or directory
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

// ============================================================================
// Monitor command
// ============================================================================

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(short, long)]
    pub seconds: Option<u64>,
}

// ============================================================================
// Explore command
// ============================================================================

#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// Write the JSON report to this file or directory
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Sections to leave alone (repeatable)
    #[arg(long = "skip", value_name = "SECTION")]
    pub skip_sections: Vec<String>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key to set (e.g., output_format, report_dir)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["authscope", "discover", "--explore", "-o", "json"]).unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        match cli.command {
            Commands::Discover(args) => {
                assert!(args.explore);
                assert!(args.save.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_explore_skip_is_repeatable() {
        let cli = Cli::try_parse_from(["authscope", "explore", "--skip", "Sound", "--skip", "Wi-Fi"]).unwrap();
        match cli.command {
            Commands::Explore(args) => assert_eq!(args.skip_sections, vec!["Sound", "Wi-Fi"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
