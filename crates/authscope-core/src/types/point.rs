use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of credential an action asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// No authorization needed
    #[default]
    None,
    /// The logged-in user's password
    User,
    /// An administrator's credentials
    Admin,
    /// Keychain unlock
    Keychain,
    /// Touch ID or another biometric sensor
    Biometric,
    /// An explicit consent prompt (privacy permissions)
    UserConsent,
    /// Firmware password
    Firmware,
    /// Only changeable from recovery mode
    RecoveryMode,
    /// Authorization observed but its kind is not known
    Unknown,
}

impl AuthType {
    /// Returns the lowercase tag used in reports and rule matching
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::User => "user",
            Self::Admin => "admin",
            Self::Keychain => "keychain",
            Self::Biometric => "biometric",
            Self::UserConsent => "user_consent",
            Self::Firmware => "firmware",
            Self::RecoveryMode => "recovery_mode",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true for every variant except [`AuthType::None`]
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered fact about an authorization requirement.
///
/// `requires_auth` is derived from `auth_type` by the constructors, so a
/// point that needs no authorization always carries [`AuthType::None`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPoint {
    /// Category tag (security, network, privacy, accounts, ...)
    pub kind: String,

    /// Human label
    pub label: String,

    /// Hierarchical location, e.g. "Sharing > Remote Login"
    pub location: String,

    /// Whether any credential is needed
    pub requires_auth: bool,

    /// Kind of credential needed
    pub auth_type: AuthType,

    /// Name of the underlying authorization rule, when known
    #[serde(default)]
    pub right_identifier: Option<String>,

    /// What the authorization protects
    pub description: String,

    /// When the producing probe ran
    pub discovered_at: DateTime<Utc>,

    /// Name of the probe that produced this point
    pub source_probe: String,
}

impl AuthorizationPoint {
    /// Build a point stamped with the current time.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        label: impl Into<String>,
        location: impl Into<String>,
        auth_type: AuthType,
        description: impl Into<String>,
        source_probe: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            label: label.into(),
            location: location.into(),
            requires_auth: auth_type.requires_auth(),
            auth_type,
            right_identifier: None,
            description: description.into(),
            discovered_at: Utc::now(),
            source_probe: source_probe.into(),
        }
    }

    /// Attach a known right identifier
    #[must_use]
    pub fn with_right(mut self, right: impl Into<String>) -> Self {
        self.right_identifier = Some(right.into());
        self
    }

    /// Returns true if the point has no right identifier yet
    #[must_use]
    pub const fn lacks_right(&self) -> bool {
        self.right_identifier.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_auth_point_has_none_type() {
        let point = AuthorizationPoint::new(
            "system",
            "Screen Saver",
            "Screen Saver",
            AuthType::None,
            "Changing the screen saver needs no credentials",
            "sections",
        );
        assert!(!point.requires_auth);
        assert_eq!(point.auth_type, AuthType::None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let point = AuthorizationPoint::new(
            "privacy",
            "Camera",
            "Privacy & Security > Camera",
            AuthType::UserConsent,
            "Camera access",
            "tcc_database",
        )
        .with_right("kTCCServiceCamera");

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["requiresAuth"], true);
        assert_eq!(json["authType"], "user_consent");
        assert_eq!(json["rightIdentifier"], "kTCCServiceCamera");
        assert_eq!(json["sourceProbe"], "tcc_database");
    }

    #[test]
    fn test_auth_type_display() {
        assert_eq!(AuthType::RecoveryMode.to_string(), "recovery_mode");
        assert!(!AuthType::None.requires_auth());
        assert!(AuthType::Unknown.requires_auth());
    }
}
