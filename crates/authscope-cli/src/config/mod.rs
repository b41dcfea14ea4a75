//! Configuration management.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "AUTHSCOPE_CONFIG";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Log level when neither RUST_LOG nor --verbose is given.
    pub log_level: Option<String>,

    /// Every report is also saved here, under a timestamped name.
    pub report_dir: Option<PathBuf>,

    /// Run interaction exploration as part of `discover`.
    #[serde(default)]
    pub explore_by_default: bool,

    /// Sections exploration never visits.
    #[serde(default)]
    pub skip_sections: Vec<String>,
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("io", "authscope", "authscope")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from file.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Update one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output_format" | "output" => {
                self.output_format = Some(value.parse()?);
            }
            "log_level" => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    anyhow::bail!(
                        "Unknown log level: {}\nValid levels: {}",
                        value,
                        LOG_LEVELS.join(", ")
                    );
                }
                self.log_level = Some(level);
            }
            "report_dir" => {
                self.report_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "explore_by_default" | "explore" => {
                self.explore_by_default = value.parse()?;
            }
            "skip_sections" => {
                self.skip_sections = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                anyhow::bail!(
                    "Unknown config key: {}\n\n\
                     Available keys:\n  \
                     output_format      - Default output format (pretty/json/yaml)\n  \
                     log_level          - trace/debug/info/warn/error/off\n  \
                     report_dir         - Directory every report is saved to (empty to unset)\n  \
                     explore_by_default - Run exploration during discover (true/false)\n  \
                     skip_sections      - Comma-separated sections exploration skips",
                    key
                );
            }
        }

        Ok(())
    }
}
