use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::AuthorizationEvent;

/// One interactive element on the settings surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Visible name of the control
    pub name: String,
    /// Accessibility class ("button", "checkbox", ...)
    pub kind: String,
    /// "Section > Control" path
    pub path: String,
}

impl Control {
    /// Build a control living in `section`
    #[must_use]
    pub fn new(section: &str, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: format!("{section} > {name}"),
            name,
            kind: kind.into(),
        }
    }
}

/// What the dialog-dismissal step found and closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    /// Nothing was open
    #[default]
    None,
    /// An authorization prompt, cancelled
    AuthDialog,
    /// A generic alert, acknowledged
    AlertDialog,
    /// A sheet attached to the settings window, cancelled
    SettingsSheet,
}

impl std::str::FromStr for DialogKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "auth_dialog" => Self::AuthDialog,
            "alert_dialog" => Self::AlertDialog,
            "settings_sheet" => Self::SettingsSheet,
            _ => Self::None,
        })
    }
}

/// A triggered control paired with the authorization events it caused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    /// "Section > Control" path
    pub control_path: String,
    /// Visible name of the control
    pub control_name: String,
    /// Accessibility class of the control
    pub control_kind: String,
    /// Events attributed to the trigger, in log order
    pub events: Vec<AuthorizationEvent>,
    /// When attribution happened
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    /// Pair a control with attributed events.
    ///
    /// Returns `None` when `events` is empty: a control that caused no
    /// authorization is not recorded.
    #[must_use]
    pub fn attribute(control: &Control, events: Vec<AuthorizationEvent>) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        Some(Self {
            control_path: control.path.clone(),
            control_name: control.name.clone(),
            control_kind: control.kind.clone(),
            events,
            timestamp: Utc::now(),
        })
    }
}

/// Correlation engine run state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "section", rename_all = "snake_case")]
pub enum ExplorationState {
    /// No exploration started yet
    #[default]
    Idle,
    /// Working through the named section
    Exploring(String),
    /// All sections visited (or stopped cooperatively)
    Completed,
    /// The surface could not be driven at all
    Error(String),
}

impl ExplorationState {
    /// Returns true while a section is being explored
    #[must_use]
    pub const fn is_exploring(&self) -> bool {
        matches!(self, Self::Exploring(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_path() {
        let control = Control::new("Sharing", "Remote Login", "checkbox");
        assert_eq!(control.path, "Sharing > Remote Login");
    }

    #[test]
    fn test_empty_events_produce_no_record() {
        let control = Control::new("Sound", "Mute", "checkbox");
        assert!(InteractionRecord::attribute(&control, Vec::new()).is_none());
    }

    #[test]
    fn test_dialog_kind_parse() {
        assert_eq!("auth_dialog\n".parse::<DialogKind>().unwrap(), DialogKind::AuthDialog);
        assert_eq!("no_dialog".parse::<DialogKind>().unwrap(), DialogKind::None);
    }
}
