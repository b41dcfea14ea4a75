//! # authscope-cli
//!
//! Command-line interface over the authscope engine.
//!
//! ## Features
//!
//! - **Discovery**: run every probe and section check with live progress
//! - **Exploration**: trigger settings controls and attribute the
//!   authorization events they cause
//! - **Monitoring**: stream deduplicated authorization events from the
//!   unified log
//! - **Multiple output formats**: pretty, JSON, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
