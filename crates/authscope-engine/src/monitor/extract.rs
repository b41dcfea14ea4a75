//! Turning raw log entries into authorization events.

use regex::Regex;

use authscope_core::AuthorizationEvent;

use super::source::LogEntry;

/// Right name used when a message matches but names no right
pub const UNKNOWN_RIGHT: &str = "unknown_authorization";

/// Right name for privacy-daemon permission requests
pub const TCC_RIGHT: &str = "TCC_Privacy_Request";

/// Right name for system policy changes
pub const SYSTEM_POLICY_RIGHT: &str = "SystemPolicy_Change";

/// Lowercase vocabulary marking a message as authorization-related
const AUTH_KEYWORDS: &[&str] = &[
    "authorization",
    "authenticate",
    "privilege",
    "right",
    "securityagent",
    "authd",
    "tccd",
    "kext",
    "system extension",
];

/// Lowercase fragments naming a privacy service
const TCC_SERVICE_HINTS: &[&str] = &[
    "ktccservice",
    "accessibility",
    "camera",
    "microphone",
    "screen",
    "full disk",
    "developer",
];

const QUOTED_RIGHT_PATTERNS: &[&str] = &[
    r#"(?i)right\s*['"]([^'"]+)['"]"#,
    r#"(?i)privilege\s*['"]([^'"]+)['"]"#,
    r#"(?i)authorization\s*['"]([^'"]+)['"]"#,
];

/// Authorization rights commonly seen on macOS, with descriptions
pub const KNOWN_RIGHTS: &[(&str, &str)] = &[
    ("system.preferences", "Access System Preferences"),
    ("system.preferences.security", "Modify Security & Privacy settings"),
    ("system.preferences.sharing", "Modify Sharing settings"),
    ("system.preferences.users", "Modify Users & Groups settings"),
    ("system.preferences.datetime", "Modify Date & Time settings"),
    ("system.preferences.network", "Modify Network settings"),
    ("system.preferences.energysaver", "Modify Energy Saver settings"),
    ("system.privilege.admin", "Administrator privileges required"),
    ("system.privilege.taskport", "Task port access"),
    ("system.install.software", "Install software"),
    ("system.install.software.iboot", "Install boot software"),
    ("com.apple.KernelExtensionManagement", "Kernel Extension Management"),
    ("com.apple.SystemExtensions", "System Extensions Management"),
    ("kTCCServiceAccessibility", "Accessibility access"),
    ("kTCCServiceCamera", "Camera access"),
    ("kTCCServiceMicrophone", "Microphone access"),
    ("kTCCServiceScreenCapture", "Screen recording access"),
    ("kTCCServiceSystemPolicyAllFiles", "Full disk access"),
    ("kTCCServiceDeveloperTool", "Developer tool access"),
    ("authenticate-admin", "Administrator authentication"),
    ("authenticate-session-owner", "Session owner authentication"),
    ("authenticate-session-user", "Session user authentication"),
];

/// Description of a known right
pub fn describe_right(right: &str) -> Option<&'static str> {
    KNOWN_RIGHTS
        .iter()
        .find(|(name, _)| *name == right)
        .map(|(_, description)| *description)
}

/// Pattern matcher applied to every polled entry
#[derive(Debug, Clone)]
pub struct EventExtractor {
    quoted: Vec<Regex>,
}

impl Default for EventExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventExtractor {
    /// Extractor with the built-in patterns
    pub fn new() -> Self {
        Self {
            quoted: QUOTED_RIGHT_PATTERNS
                .iter()
                .filter_map(|pattern| Regex::new(pattern).ok())
                .collect(),
        }
    }

    /// Events carried by one log entry, in rule order.
    ///
    /// One entry can yield several events: a `tccd` message about the
    /// camera is both generic authorization traffic and a privacy request.
    pub fn extract(&self, entry: &LogEntry) -> Vec<AuthorizationEvent> {
        let message = entry.event_message.as_str();
        let lower = message.to_lowercase();
        let mut events = Vec::new();

        if AUTH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            let right = self.right_name(message);
            let description = describe_right(&right).unwrap_or("Unknown authorization right");
            events.push(
                AuthorizationEvent::new(
                    right,
                    description,
                    format!("Process: {}", entry.process_image_path),
                )
                .with_meta("process", &entry.process_image_path)
                .with_meta("message", message)
                .with_meta("source", "system_log"),
            );
        }

        if entry.process_name() == "tccd" && TCC_SERVICE_HINTS.iter().any(|h| lower.contains(h)) {
            events.push(
                AuthorizationEvent::new(TCC_RIGHT, "Privacy permission request", "TCC Framework")
                    .with_meta("tcc_message", message)
                    .with_meta("source", "tccd"),
            );
        }

        let policy_stream =
            entry.category == "SystemPolicy" || entry.subsystem.to_lowercase().contains("security");
        if policy_stream && (lower.contains("authorization") || lower.contains("policy")) {
            events.push(
                AuthorizationEvent::new(
                    SYSTEM_POLICY_RIGHT,
                    "System policy authorization",
                    "System Policy",
                )
                .with_meta("policy_message", message)
                .with_meta("source", "system_policy"),
            );
        }

        events
    }

    /// Right named by a message.
    ///
    /// The longest known right contained in the message wins, so
    /// `system.preferences.security` is not reported as `system.preferences`.
    /// Otherwise the first quoted `right "..."` style pattern is used.
    pub fn right_name(&self, message: &str) -> String {
        let known = KNOWN_RIGHTS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| message.contains(name))
            .max_by_key(|name| name.len());
        if let Some(name) = known {
            return name.to_string();
        }

        self.quoted
            .iter()
            .find_map(|re| re.captures(message))
            .and_then(|caps| caps.get(1))
            .map_or_else(|| UNKNOWN_RIGHT.to_string(), |m| m.as_str().to_string())
    }
}
