//! Settings surface navigation.
//!
//! [`SurfaceNavigator`] is the contract the correlation engine drives;
//! [`SettingsNavigator`] implements it over `open` and `osascript`.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use authscope_core::{AuthScopeError, Control, DialogKind, Result};

use crate::command::CommandRunner;

/// Wait after navigating before enumerating controls.
const PANE_LOAD_DELAY: Duration = Duration::from_secs(2);

/// Bundle identifier of the settings application.
const SETTINGS_BUNDLE_ID: &str = "com.apple.systempreferences";

/// Control names that belong to window chrome, never to a setting.
const CHROME_NAMES: &[&str] = &[
    "close",
    "minimize",
    "zoom",
    "toolbar",
    "window",
    "scroll",
    "splitter",
    "system settings",
    "back",
];

/// Panes of the settings application, paired with their deep-link extension.
pub const SETTINGS_PANES: &[(&str, &str)] = &[
    ("Wi-Fi", "com.apple.WiFi-Settings.extension"),
    ("Bluetooth", "com.apple.BluetoothSettings"),
    ("Network", "com.apple.Network-Settings.extension"),
    ("VPN", "com.apple.NetworkExtensionSettingsUI.NESettingsUIExtension"),
    ("Notifications", "com.apple.Notifications-Settings.extension"),
    ("Sound", "com.apple.Sound-Settings.extension"),
    ("Focus", "com.apple.Focus-Settings.extension"),
    ("Screen Time", "com.apple.ScreenTime-Settings.extension"),
    ("General", "com.apple.General-Settings.extension"),
    ("Appearance", "com.apple.Appearance-Settings.extension"),
    ("Accessibility", "com.apple.Accessibility-Settings.extension"),
    ("Control Center", "com.apple.ControlCenter-Settings.extension"),
    ("Siri & Spotlight", "com.apple.Siri-Settings.extension"),
    ("Privacy & Security", "com.apple.PrivacySecurity-Settings.extension"),
    ("Desktop & Dock", "com.apple.Desktop-Settings.extension"),
    ("Displays", "com.apple.Displays-Settings.extension"),
    ("Wallpaper", "com.apple.Wallpaper-Settings.extension"),
    ("Screen Saver", "com.apple.ScreenSaver-Settings.extension"),
    ("Battery", "com.apple.Battery-Settings.extension"),
    ("Energy Saver", "com.apple.EnergySaver-Settings.extension"),
    ("Keyboard", "com.apple.Keyboard-Settings.extension"),
    ("Mouse", "com.apple.Mouse-Settings.extension"),
    ("Trackpad", "com.apple.Trackpad-Settings.extension"),
    ("Printers & Scanners", "com.apple.Print-Scan-Settings.extension"),
    ("Game Center", "com.apple.GameCenter-Settings.extension"),
    ("Internet Accounts", "com.apple.Internet-Accounts-Settings.extension"),
    ("Passwords", "com.apple.Passwords-Settings.extension"),
    ("Wallet & Apple Pay", "com.apple.WalletSettingsExtension"),
    ("Users & Groups", "com.apple.Users-Groups-Settings.extension"),
    ("Touch ID & Passcode", "com.apple.TouchID-Settings.extension"),
    ("Login Items", "com.apple.LoginItems-Settings.extension"),
    ("Date & Time", "com.apple.Date-Time-Settings.extension"),
    ("Sharing", "com.apple.Sharing-Settings.extension"),
    ("Time Machine", "com.apple.TimeMachine-Settings.extension"),
    ("Transfer or Reset", "com.apple.Transfer-Reset-Settings.extension"),
    ("Software Update", "com.apple.Software-Update-Settings.extension"),
    ("Storage", "com.apple.Storage-Settings.extension"),
];

/// Drives the navigable settings UI.
#[async_trait]
pub trait SurfaceNavigator: Send + Sync {
    /// Activate the surface. An error here is fatal for the run.
    async fn open(&self) -> Result<()>;

    /// Enumerate top-level sections
    async fn list_sections(&self) -> Result<Vec<String>>;

    /// Bring `section` to the front
    async fn navigate(&self, section: &str) -> Result<()>;

    /// Interactive controls of the current section
    async fn list_controls(&self) -> Result<Vec<Control>>;

    /// Activate a control; `Ok(false)` if it could not be clicked
    async fn trigger(&self, control: &Control) -> Result<bool>;

    /// Close whatever prompt the last trigger left open
    async fn dismiss_dialog(&self) -> Result<DialogKind>;
}

/// [`SurfaceNavigator`] for the macOS settings application, via AppleScript
pub struct SettingsNavigator {
    runner: Arc<dyn CommandRunner>,
    current: Mutex<String>,
}

impl SettingsNavigator {
    /// Navigator issuing its commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            current: Mutex::new(String::new()),
        }
    }

    fn current_section(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, section: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = section.to_string();
    }

    async fn osascript(&self, script: &str) -> Result<crate::command::CommandOutput> {
        self.runner.run("osascript", &["-e", script]).await
    }
}

#[async_trait]
impl SurfaceNavigator for SettingsNavigator {
    async fn open(&self) -> Result<()> {
        let probe = self.osascript(ACCESSIBILITY_CHECK_SCRIPT).await?;
        if !probe.success() {
            return Err(AuthScopeError::SurfaceUnavailable(
                "accessibility access is required to drive System Settings".to_string(),
            ));
        }

        let out = self.osascript(ACTIVATE_SCRIPT).await?;
        if !out.success() {
            return Err(AuthScopeError::SurfaceUnavailable(format!(
                "System Settings could not be activated: {}",
                out.stderr.trim()
            )));
        }
        info!("System Settings opened");
        Ok(())
    }

    async fn list_sections(&self) -> Result<Vec<String>> {
        Ok(SETTINGS_PANES
            .iter()
            .map(|(name, _)| (*name).to_string())
            .collect())
    }

    async fn navigate(&self, section: &str) -> Result<()> {
        if let Some((_, extension)) = SETTINGS_PANES.iter().find(|(name, _)| *name == section) {
            let url = format!("x-apple.systempreferences:{extension}");
            match self.runner.run("open", &[&url]).await {
                Ok(out) if out.success() => {
                    self.set_current(section);
                    debug!(section, "navigated via deep link");
                    tokio::time::sleep(PANE_LOAD_DELAY).await;
                    return Ok(());
                }
                Ok(out) => warn!(section, stderr = %out.stderr.trim(), "deep link failed"),
                Err(e) => warn!(section, error = %e, "deep link failed"),
            }
        }

        let out = self.runner.run("open", &["-b", SETTINGS_BUNDLE_ID]).await?;
        if !out.success() {
            return Err(AuthScopeError::Navigation {
                section: section.to_string(),
                reason: out.stderr.trim().to_string(),
            });
        }
        self.set_current(section);
        debug!(section, "navigated via bundle fallback");
        tokio::time::sleep(PANE_LOAD_DELAY).await;
        Ok(())
    }

    async fn list_controls(&self) -> Result<Vec<Control>> {
        let section = self.current_section();
        let out = self.osascript(LIST_CONTROLS_SCRIPT).await?;
        if !out.success() {
            return Err(AuthScopeError::Navigation {
                section,
                reason: format!("control enumeration failed: {}", out.stderr.trim()),
            });
        }
        let controls = parse_controls(&section, &out.stdout);
        debug!(section = %section, count = controls.len(), "controls enumerated");
        Ok(controls)
    }

    async fn trigger(&self, control: &Control) -> Result<bool> {
        let name = escape_applescript(&control.name);
        for class in ["button", "checkbox", "radio button", "pop up button"] {
            let script = format!(
                "tell application \"System Events\" to tell process \"System Settings\"\n\
                 try\n\
                 click {class} \"{name}\" of front window\n\
                 return \"success\"\n\
                 end try\n\
                 end tell"
            );
            let out = self.osascript(&script).await?;
            if out.success() && out.stdout.contains("success") {
                debug!(path = %control.path, class, "control clicked");
                return Ok(true);
            }
        }

        let out = self
            .osascript(&CLICK_RECURSIVE_SCRIPT.replace("{name}", &name))
            .await?;
        let clicked = out.success() && out.stdout.contains("success");
        if !clicked {
            warn!(path = %control.path, "failed to click control");
        }
        Ok(clicked)
    }

    async fn dismiss_dialog(&self) -> Result<DialogKind> {
        let out = self.osascript(DISMISS_SCRIPT).await?;
        if !out.success() {
            return Ok(DialogKind::None);
        }
        let kind: DialogKind = out.stdout.parse().unwrap_or_default();
        if kind != DialogKind::None {
            info!(dialog = ?kind, "dialog dismissed");
        }
        Ok(kind)
    }
}

/// Parse `name|class` lines from the enumeration script.
///
/// Window chrome and duplicate names are dropped.
pub fn parse_controls(section: &str, stdout: &str) -> Vec<Control> {
    let mut seen = HashSet::new();
    let mut controls = Vec::new();

    for line in stdout.lines().map(str::trim) {
        if line.starts_with("Error:") {
            continue;
        }
        let Some((name, class)) = line.split_once('|') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name == "missing value" {
            continue;
        }
        let lower = name.to_lowercase();
        if CHROME_NAMES.iter().any(|chrome| lower.contains(chrome)) {
            continue;
        }
        if seen.insert(name.to_string()) {
            controls.push(Control::new(section, name, class.trim()));
        }
    }

    controls
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

const ACCESSIBILITY_CHECK_SCRIPT: &str = r#"
tell application "System Events"
    set processNames to name of every process
    return "Finder" is in processNames
end tell
"#;

const ACTIVATE_SCRIPT: &str = r#"
tell application "System Settings"
    activate
    delay 2
end tell
"#;

const LIST_CONTROLS_SCRIPT: &str = r#"
on collectControls(elem, depth)
    set found to {}
    if depth > 10 then return found
    try
        set elemClass to class of elem as string
        set elemName to ""
        try
            set elemName to name of elem as string
        end try
        if elemName is "" or elemName is "missing value" then
            try
                set elemName to title of elem as string
            end try
        end if
        if elemName is "" or elemName is "missing value" then
            try
                set elemName to help of elem as string
            end try
        end if
        if elemClass contains "button" or elemClass contains "checkbox" or elemClass contains "radio" or elemClass contains "pop up" or elemClass contains "menu" or elemClass contains "slider" or elemClass contains "stepper" or elemClass contains "text field" then
            if elemName is "" or elemName is "missing value" then set elemName to "Unnamed " & elemClass
            set end of found to elemName & "|" & elemClass
        end if
        try
            repeat with child in (every UI element of elem)
                set found to found & my collectControls(child, depth + 1)
            end repeat
        end try
    end try
    return found
end collectControls

tell application "System Events"
    tell process "System Settings"
        try
            set found to my collectControls(front window, 0)
            set AppleScript's text item delimiters to linefeed
            return found as text
        on error errMsg
            return "Error: " & errMsg
        end try
    end tell
end tell
"#;

const CLICK_RECURSIVE_SCRIPT: &str = r#"
on clickNamed(elem, targetName)
    try
        if (name of elem as string) contains targetName then
            click elem
            return true
        end if
        repeat with child in (every UI element of elem)
            if my clickNamed(child, targetName) then return true
        end repeat
    end try
    return false
end clickNamed

tell application "System Events"
    tell process "System Settings"
        try
            if my clickNamed(front window, "{name}") then return "success"
        end try
    end tell
end tell
"#;

const DISMISS_SCRIPT: &str = r#"
tell application "System Events"
    if exists window "SecurityAgent" then
        click button "Cancel" of window "SecurityAgent"
        return "auth_dialog"
    else if exists alert then
        click button "OK" of alert
        return "alert_dialog"
    else if exists sheet 1 of window 1 of process "System Settings" then
        click button "Cancel" of sheet 1 of window 1 of process "System Settings"
        return "settings_sheet"
    end if
    return "no_dialog"
end tell
"#;
