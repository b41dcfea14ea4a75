//! Probe catalog.
//!
//! Every probe is independent: it shells out through the [`CommandRunner`]
//! it is handed and returns the authorization points it found. Probes share
//! no state, so the orchestrator can run them in any order.

mod authdb;
mod checks;
mod sections;
mod tcc;

pub use authdb::{classify_rule, AuthorizationDbProbe, AUDITED_RIGHTS};
pub use checks::{CommandCheck, Emit, COMMAND_CHECKS};
pub use sections::{section_points, SECTION_REQUIREMENTS};
pub use tcc::{parse_access_rows, TccDatabaseProbe};

use async_trait::async_trait;

use authscope_core::{AuthorizationPoint, Result};

use crate::command::CommandRunner;

/// One named check producing zero or more authorization points
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable identifier, recorded as `sourceProbe`
    fn name(&self) -> &str;

    /// Human label shown while the probe runs
    fn label(&self) -> &str;

    /// Run the check
    async fn run(&self, runner: &dyn CommandRunner) -> Result<Vec<AuthorizationPoint>>;
}

/// Every built-in probe, in execution order
pub fn default_catalog() -> Vec<Box<dyn Probe>> {
    let mut catalog: Vec<Box<dyn Probe>> = COMMAND_CHECKS
        .iter()
        .map(|check| Box::new(*check) as Box<dyn Probe>)
        .collect();
    catalog.push(Box::new(TccDatabaseProbe::new()));
    catalog.push(Box::new(AuthorizationDbProbe::new()));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let catalog = default_catalog();
        let names: HashSet<_> = catalog.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names.len(), catalog.len());
        assert_eq!(catalog.len(), COMMAND_CHECKS.len() + 2);
    }
}
