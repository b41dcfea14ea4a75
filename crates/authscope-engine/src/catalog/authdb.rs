//! Authorization database probe.
//!
//! Reads the rule behind each audited right with
//! `security authorizationdb read` and classifies the credential it asks for.

use async_trait::async_trait;
use tracing::debug;

use authscope_core::{AuthType, AuthorizationPoint, Result};

use super::Probe;
use crate::command::CommandRunner;
use crate::monitor::describe_right;

/// Rights whose rules are read, with the kind of setting they govern
pub const AUDITED_RIGHTS: &[(&str, &str)] = &[
    ("system.preferences", "system"),
    ("system.preferences.security", "security"),
    ("system.preferences.sharing", "sharing"),
    ("system.preferences.network", "network"),
    ("system.preferences.datetime", "datetime"),
    ("system.preferences.energysaver", "energy"),
    ("system.preferences.printing", "printing"),
    ("system.preferences.accounts", "accounts"),
    ("system.preferences.startupdisk", "startup"),
    ("system.install.software", "update"),
    ("system.privilege.taskport", "security"),
];

/// Reads the authorization rule of every right in [`AUDITED_RIGHTS`]
#[derive(Debug, Clone, Default)]
pub struct AuthorizationDbProbe;

impl AuthorizationDbProbe {
    /// The probe
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Probe for AuthorizationDbProbe {
    fn name(&self) -> &str {
        "authorization_db"
    }

    fn label(&self) -> &str {
        "Authorization database rules"
    }

    async fn run(&self, runner: &dyn CommandRunner) -> Result<Vec<AuthorizationPoint>> {
        let mut points = Vec::new();

        for (right, kind) in AUDITED_RIGHTS {
            let out = match runner.run("security", &["authorizationdb", "read", right]).await {
                Ok(out) if out.success() => out,
                Ok(out) => {
                    debug!(right, exit_code = out.exit_code, "right not readable");
                    continue;
                }
                Err(e) => {
                    debug!(right, error = %e, "authorizationdb read failed");
                    continue;
                }
            };

            let auth_type = classify_rule(&out.stdout);
            if !auth_type.requires_auth() {
                continue;
            }

            let description = describe_right(right)
                .map_or_else(|| format!("Governed by the {right} rule"), str::to_string);
            points.push(
                AuthorizationPoint::new(
                    *kind,
                    *right,
                    format!("Authorization Database > {right}"),
                    auth_type,
                    description,
                    self.name(),
                )
                .with_right(*right),
            );
        }

        Ok(points)
    }
}

/// Credential demanded by a rule definition (plist text).
///
/// `allow` rules and unparseable output map to [`AuthType::None`].
pub fn classify_rule(plist: &str) -> AuthType {
    let compact: String = plist.split_whitespace().collect();
    let has_string = |value: &str| compact.contains(&format!("<string>{value}</string>"));

    if has_string("authenticate-admin")
        || has_string("authenticate-admin-nonshared")
        || (has_string("user") && compact.contains("<key>group</key><string>admin</string>"))
    {
        AuthType::Admin
    } else if has_string("authenticate-session-owner")
        || has_string("authenticate-session-owner-or-admin")
        || has_string("is-session-owner")
    {
        AuthType::User
    } else if has_string("allow") || has_string("is-root") {
        AuthType::None
    } else if compact.contains("<key>rule</key>") || compact.contains("<key>class</key>") {
        AuthType::Unknown
    } else {
        AuthType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    const ADMIN_RULE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>class</key>
    <string>rule</string>
    <key>rule</key>
    <array>
        <string>authenticate-admin</string>
    </array>
</dict>
</plist>"#;

    const SESSION_RULE: &str = "<dict><key>rule</key><array><string>authenticate-session-owner</string></array></dict>";

    const USER_GROUP_RULE: &str = r"<dict>
    <key>class</key>
    <string>user</string>
    <key>group</key>
    <string>admin</string>
</dict>";

    #[test]
    fn test_classify_rule() {
        assert_eq!(classify_rule(ADMIN_RULE), AuthType::Admin);
        assert_eq!(classify_rule(USER_GROUP_RULE), AuthType::Admin);
        assert_eq!(classify_rule(SESSION_RULE), AuthType::User);
        assert_eq!(classify_rule("<dict><key>rule</key><array><string>allow</string></array></dict>"), AuthType::None);
        assert_eq!(classify_rule("<dict><key>class</key><string>evaluate-mechanisms</string></dict>"), AuthType::Unknown);
        assert_eq!(classify_rule("garbage"), AuthType::None);
    }

    #[tokio::test]
    async fn test_probe_skips_allow_rules_and_failures() {
        let runner = ScriptedRunner::new()
            .ok_when("security", "system.preferences.sharing", ADMIN_RULE)
            .ok_when("security", "system.preferences.printing", "<string>allow</string>")
            .fail("security", "NO (-60005)");
        let points = AuthorizationDbProbe::new().run(&runner).await.unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, "sharing");
        assert_eq!(points[0].right_identifier.as_deref(), Some("system.preferences.sharing"));
        assert_eq!(points[0].description, "Modify Sharing settings");
    }
}
