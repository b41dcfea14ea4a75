//! Known authorization requirements of settings sections.

use authscope_core::{AuthType, AuthorizationPoint};

/// Source probe recorded on section points
const SECTION_PROBE: &str = "surface_sections";

/// Section name, point kind, credential, description
pub const SECTION_REQUIREMENTS: &[(&str, &str, AuthType, &str)] = &[
    (
        "Users & Groups",
        "accounts",
        AuthType::Admin,
        "Adding, removing or promoting users requires administrator authentication",
    ),
    (
        "Touch ID & Passcode",
        "security",
        AuthType::Biometric,
        "Enrolling fingerprints requires the login password or an enrolled finger",
    ),
    (
        "Passwords",
        "security",
        AuthType::Biometric,
        "Viewing saved passwords requires Touch ID or the login password",
    ),
    (
        "Privacy & Security",
        "security",
        AuthType::Admin,
        "Changing security policy requires administrator authentication",
    ),
    (
        "Sharing",
        "sharing",
        AuthType::Admin,
        "Turning sharing services on or off requires administrator authentication",
    ),
    (
        "Date & Time",
        "datetime",
        AuthType::Admin,
        "Changing date, time or time zone requires administrator authentication",
    ),
    (
        "Software Update",
        "update",
        AuthType::Admin,
        "Installing updates requires administrator authentication",
    ),
    (
        "Network",
        "network",
        AuthType::Admin,
        "Changing network locations and services requires administrator authentication",
    ),
    (
        "Startup Disk",
        "startup",
        AuthType::Admin,
        "Choosing the startup disk requires administrator authentication",
    ),
    (
        "Time Machine",
        "backup",
        AuthType::Admin,
        "Selecting a backup disk requires administrator authentication",
    ),
    (
        "Printers & Scanners",
        "printing",
        AuthType::Admin,
        "Adding or removing printers requires administrator authentication",
    ),
    (
        "Energy Saver",
        "energy",
        AuthType::Admin,
        "Changing power schedules requires administrator authentication",
    ),
    (
        "Internet Accounts",
        "accounts",
        AuthType::Keychain,
        "Account credentials are stored in and read from the keychain",
    ),
    (
        "Wallet & Apple Pay",
        "security",
        AuthType::Biometric,
        "Adding cards requires Touch ID or the login password",
    ),
    (
        "Login Items",
        "security",
        AuthType::User,
        "Managing background items requires the login password",
    ),
    (
        "Transfer or Reset",
        "security",
        AuthType::Admin,
        "Erasing the Mac requires administrator authentication",
    ),
];

/// Points for one section; unknown sections yield none
pub fn section_points(section: &str) -> Vec<AuthorizationPoint> {
    SECTION_REQUIREMENTS
        .iter()
        .filter(|(name, ..)| *name == section)
        .map(|(name, kind, auth_type, description)| {
            AuthorizationPoint::new(*kind, *name, *name, *auth_type, *description, SECTION_PROBE)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_section() {
        let points = section_points("Sharing");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, "sharing");
        assert_eq!(points[0].location, "Sharing");
        assert_eq!(points[0].source_probe, SECTION_PROBE);
    }

    #[test]
    fn test_unknown_section_is_empty() {
        assert!(section_points("Wallpaper").is_empty());
    }
}
