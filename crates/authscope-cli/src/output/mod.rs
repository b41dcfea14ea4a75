//! Output formatting for different formats.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use authscope_core::{
    AuthType, AuthorizationEvent, AuthorizationPoint, DiscoveryReport, InteractionRecord,
    MonitorStats,
};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable listing with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json, yaml",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Serialize `value` for the machine-readable formats.
///
/// Returns `None` for [`OutputFormat::Pretty`]; the caller prints its own
/// listing then.
pub fn render<T: Serialize>(format: OutputFormat, value: &T) -> Result<Option<String>> {
    match format {
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
        OutputFormat::Pretty => Ok(None),
    }
}

/// File name a report started at `start` is saved under.
pub fn report_file_name(start: DateTime<Utc>) -> String {
    format!("authscope_report_{}.json", start.format("%Y%m%d_%H%M%S"))
}

/// Write `report` as JSON.
///
/// A `target` that is an existing directory gets a timestamped file inside
/// it; anything else is used as the file path. Returns the path written.
pub fn save_report(report: &DiscoveryReport, target: &Path) -> Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(report_file_name(report.session.start))
    } else {
        target.to_path_buf()
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;

    Ok(path)
}

fn auth_badge(auth_type: AuthType) -> ColoredString {
    let tag = auth_type.as_str();
    match auth_type {
        AuthType::Admin | AuthType::Firmware | AuthType::RecoveryMode => tag.red().bold(),
        AuthType::Keychain | AuthType::Biometric => tag.yellow(),
        AuthType::User | AuthType::UserConsent => tag.cyan(),
        AuthType::None | AuthType::Unknown => tag.dimmed(),
    }
}

/// One-line rendering of an event, as streamed by `monitor`.
pub fn event_line(event: &AuthorizationEvent) -> String {
    let line = format!(
        "{} {} ({})",
        event.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
        event.right_name.bold(),
        event.result,
    );
    if event.context.is_empty() {
        line
    } else {
        format!("{line} {}", event.context.dimmed())
    }
}

fn print_point(point: &AuthorizationPoint) {
    println!(
        "  {} {} [{}]",
        point.label.bold(),
        format!("({})", point.kind).dimmed(),
        auth_badge(point.auth_type),
    );
    println!("      {} {}", "at:".dimmed(), point.location);
    if let Some(right) = &point.right_identifier {
        println!("      {} {}", "right:".dimmed(), right.cyan());
    }
    if !point.description.is_empty() {
        println!("      {}", point.description);
    }
}

fn print_interaction(record: &InteractionRecord) {
    println!(
        "  {} {}",
        record.control_path.bold(),
        format!("({})", record.control_kind).dimmed()
    );
    for event in &record.events {
        println!("      {} {}", "->".yellow(), event.right_name.cyan());
    }
}

/// Human-readable report listing.
pub fn print_report(report: &DiscoveryReport) {
    println!("{}", "Authorization Discovery Report".bold().underline());
    println!();
    println!(
        "  {} {} ({:.1}s)",
        "Session:".bold(),
        report.session.start.format("%Y-%m-%d %H:%M:%S UTC"),
        report.session.duration_seconds
    );
    println!("  {} {}", "Findings:".bold(), report.summary.total);
    for (kind, count) in &report.summary.by_kind {
        println!("    {kind:<14} {count}");
    }

    let mut points = report.points().peekable();
    if points.peek().is_some() {
        println!();
        println!("{}", "Authorization points".bold());
        points.for_each(print_point);
    }

    let mut interactions = report.interactions().peekable();
    if interactions.peek().is_some() {
        println!();
        println!("{}", "Attributed interactions".bold());
        interactions.for_each(print_interaction);
    }

    if !report.unavailable_features.is_empty() {
        println!();
        println!(
            "  {} {}",
            "Skipped for missing hardware:".bold(),
            report.unavailable_features.join(", ").dimmed()
        );
    }
    if let Some(stats) = &report.system_monitor_stats {
        println!(
            "  {} {} events, {} distinct rights",
            "Monitor:".bold(),
            stats.total_events,
            stats.unique_rights
        );
    }
}

/// Human-readable monitor statistics.
pub fn print_stats(stats: &MonitorStats) {
    println!("{}", "Monitor Statistics".bold().underline());
    println!("  {} {}", "total events:".bold(), stats.total_events);
    println!("  {} {}", "unique rights:".bold(), stats.unique_rights);
    println!("  {} {}", "last hour:".bold(), stats.events_last_hour);
    if !stats.most_common_rights.is_empty() {
        println!("  {}", "most common:".bold());
        for entry in &stats.most_common_rights {
            println!("    {:>4}  {}", entry.count, entry.right.cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> DiscoveryReport {
        let start = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let point = AuthorizationPoint::new(
            "sharing",
            "Remote Login",
            "Sharing > Remote Login",
            AuthType::Admin,
            "",
            "remote_login",
        );
        DiscoveryReport::new(start, start, vec![point.into()])
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("csv".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    fn test_render_pretty_is_left_to_caller() {
        let report = report();
        assert!(render(OutputFormat::Pretty, &report).unwrap().is_none());

        let json = render(OutputFormat::Json, &report).unwrap().unwrap();
        assert!(json.contains("\"authorizationResults\""));
        let yaml = render(OutputFormat::Yaml, &report).unwrap().unwrap();
        assert!(yaml.contains("authType: admin"));
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(report().session.start),
            "authscope_report_20260304_050607.json"
        );
    }

    #[test]
    fn test_saved_report_carries_environment() {
        let dir = tempfile::tempdir().unwrap();
        let stats = MonitorStats {
            total_events: 1,
            unique_rights: 1,
            ..MonitorStats::default()
        };
        let report = report().with_environment(
            serde_json::json!({"model": "MacBookPro18,3", "has_touch_id": false}),
            vec!["touch id".to_string()],
            stats,
            vec![AuthorizationEvent::new("system.preferences.sharing", "", "")],
        );

        let path = save_report(&report, &dir.path().join("report.json")).unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["hardwareProfile"]["model"], "MacBookPro18,3");
        assert_eq!(saved["unavailableFeatures"], serde_json::json!(["touch id"]));
        assert_eq!(saved["systemMonitorStats"]["totalEvents"], 1);
        assert_eq!(saved["allAuthorizationEvents"][0]["rightName"], "system.preferences.sharing");
        assert_eq!(saved["summary"]["total"], 1);
    }

    #[test]
    fn test_save_into_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = report();

        let in_dir = save_report(&report, dir.path()).unwrap();
        assert_eq!(in_dir, dir.path().join("authscope_report_20260304_050607.json"));

        let explicit = dir.path().join("out").join("report.json");
        assert_eq!(save_report(&report, &explicit).unwrap(), explicit);

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&explicit).unwrap()).unwrap();
        assert_eq!(saved["summary"]["total"], 1);
        assert_eq!(saved["authorizationResults"][0]["sourceProbe"], "remote_login");
    }
}
