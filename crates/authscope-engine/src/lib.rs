//! # authscope-engine
//!
//! Discovery orchestration and event correlation.
//!
//! Three cooperating parts share one [`RunContext`]:
//!
//! - **[`Orchestrator`]** runs every [`Probe`] of the catalog in order, then
//!   one check per settings section, tracking progress in a [`RunState`]
//!   and filling missing right identifiers afterwards
//! - **[`EventMonitor`]** polls the system event stream in the background,
//!   extracts authorization events and deduplicates them
//! - **[`CorrelationEngine`]** clicks through the settings surface and
//!   credits events seen shortly after each click to that control
//!
//! ## Data Flow
//!
//! ```text
//! Orchestrator -> catalog probes -> AuthorizationPoint[]
//!              -> section checks -> enhance_rights -> DiscoveryReport
//!
//! CorrelationEngine -> SurfaceNavigator::trigger
//!                   -> EventMonitor::events_between -> InteractionRecord[]
//! ```
//!
//! Everything that touches the OS goes through a collaborator trait
//! ([`CommandRunner`], [`SurfaceNavigator`], [`CapabilityOracle`],
//! [`EventSource`]), so the whole engine runs against the fakes in the
//! `testing` module, compiled with the `test-utils` feature.
//!
//! [`RunState`]: authscope_core::RunState

use std::time::Duration;

pub mod catalog;
pub mod command;
pub mod context;
pub mod correlation;
pub mod hardware;
pub mod monitor;
pub mod orchestrator;
pub mod rights;
pub mod surface;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::{default_catalog, Probe};
pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use context::RunContext;
pub use correlation::{CorrelationConfig, CorrelationEngine};
pub use hardware::{CapabilityOracle, HardwareProfile};
pub use monitor::{EventMonitor, EventSource, LogEntry, UnifiedLogSource};
pub use orchestrator::Orchestrator;
pub use rights::{enhance_rights, RightRule, RightRules};
pub use surface::{SettingsNavigator, SurfaceNavigator};

/// Upper bound on any single external command
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Time after a trigger during which events are credited to it
pub const ATTRIBUTION_WINDOW: Duration = Duration::from_secs(1);

/// Pause between two control triggers
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Sleep between two event-source polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Slice of history requested by each poll
pub const POLL_SLICE: Duration = Duration::from_secs(1);

/// Upper bound on one poll command
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `stop_monitoring` waits for the loop before aborting it
pub const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Events closer than this with the same right are duplicates
pub const DEDUP_WINDOW: Duration = Duration::from_secs(1);

/// How many recent events the dedup check looks at
pub const DEDUP_LOOKBACK: usize = 10;
