//! Privacy consent database (TCC) probe.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use authscope_core::{AuthType, AuthorizationPoint, Result};

use super::Probe;
use crate::command::CommandRunner;

const SYSTEM_TCC_DB: &str = "/Library/Application Support/com.apple.TCC/TCC.db";
const USER_TCC_DB: &str = "Library/Application Support/com.apple.TCC/TCC.db";
const ACCESS_QUERY: &str = "SELECT client,service FROM access";

/// Lists the consent grants stored in the system and per-user TCC databases
#[derive(Debug, Clone)]
pub struct TccDatabaseProbe {
    databases: Vec<PathBuf>,
}

impl Default for TccDatabaseProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TccDatabaseProbe {
    /// Probe over the system database and the current user's database
    pub fn new() -> Self {
        let mut databases = vec![PathBuf::from(SYSTEM_TCC_DB)];
        if let Some(home) = dirs::home_dir() {
            databases.push(home.join(USER_TCC_DB));
        }
        Self { databases }
    }

    /// Probe over explicit database paths
    pub fn with_databases(databases: Vec<PathBuf>) -> Self {
        Self { databases }
    }
}

#[async_trait]
impl Probe for TccDatabaseProbe {
    fn name(&self) -> &str {
        "tcc_database"
    }

    fn label(&self) -> &str {
        "Privacy consent database"
    }

    async fn run(&self, runner: &dyn CommandRunner) -> Result<Vec<AuthorizationPoint>> {
        let mut points = Vec::new();

        for db in &self.databases {
            let path = db.display().to_string();
            match runner.run("sqlite3", &[&path, ACCESS_QUERY]).await {
                Ok(out) if out.success() => {
                    points.extend(parse_access_rows(&out.stdout, self.name()));
                }
                Ok(out) => {
                    debug!(path = %path, stderr = %out.stderr.trim(), "TCC database not readable");
                }
                Err(e) => debug!(path = %path, error = %e, "TCC query failed"),
            }
        }

        Ok(points)
    }
}

/// Turn `client|service` rows into consent points
pub fn parse_access_rows(stdout: &str, source_probe: &str) -> Vec<AuthorizationPoint> {
    stdout
        .lines()
        .filter_map(|line| line.trim().split_once('|'))
        .filter(|(client, service)| !client.is_empty() && !service.is_empty())
        .map(|(client, service)| {
            let short = service.strip_prefix("kTCCService").unwrap_or(service);
            AuthorizationPoint::new(
                "privacy",
                format!("{short} ({client})"),
                format!("Privacy & Security > {short}"),
                AuthType::UserConsent,
                format!("{client} holds a consent grant for {service}"),
                source_probe,
            )
            .with_right(service)
        })
        .collect()
}
