//! Declarative command-backed checks.

use async_trait::async_trait;

use authscope_core::{AuthScopeError, AuthType, AuthorizationPoint, Result};

use super::Probe;
use crate::command::CommandRunner;

/// When a [`CommandCheck`] emits its point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Only if the command exits 0
    OnSuccess,
    /// Whenever the command ran, whatever its exit code; the command only
    /// confirms the facility exists on this OS release
    Always,
    /// If the command exits 0 and stdout contains the needle (case-insensitive)
    WhenStdoutContains(&'static str),
}

/// A probe that runs one command and emits at most one point
#[derive(Debug, Clone, Copy)]
pub struct CommandCheck {
    /// Probe name
    pub name: &'static str,
    /// Human label, also the point's label
    pub label: &'static str,
    /// Program to run
    pub program: &'static str,
    /// Its arguments
    pub args: &'static [&'static str],
    /// Emission rule
    pub emit: Emit,
    /// Point kind
    pub kind: &'static str,
    /// Point location
    pub location: &'static str,
    /// Credential the setting asks for
    pub auth_type: AuthType,
    /// Point description
    pub description: &'static str,
}

impl CommandCheck {
    fn point(&self) -> AuthorizationPoint {
        AuthorizationPoint::new(
            self.kind,
            self.label,
            self.location,
            self.auth_type,
            self.description,
            self.name,
        )
    }
}

#[async_trait]
impl Probe for CommandCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn label(&self) -> &str {
        self.label
    }

    async fn run(&self, runner: &dyn CommandRunner) -> Result<Vec<AuthorizationPoint>> {
        let outcome = runner.run(self.program, self.args).await;

        let emit = match (self.emit, &outcome) {
            (Emit::Always, Ok(_)) => true,
            (Emit::OnSuccess, Ok(out)) => out.success(),
            (Emit::WhenStdoutContains(needle), Ok(out)) => {
                out.success() && out.stdout.to_lowercase().contains(needle)
            }
            (_, Err(e)) => {
                return Err(AuthScopeError::Probe {
                    probe: self.name.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(if emit { vec![self.point()] } else { Vec::new() })
    }
}

/// Built-in command checks, in execution order
pub const COMMAND_CHECKS: &[CommandCheck] = &[
    CommandCheck {
        name: "filevault",
        label: "FileVault",
        program: "fdesetup",
        args: &["status"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Privacy & Security > FileVault",
        auth_type: AuthType::Admin,
        description: "Full disk encryption requires authentication for setup and recovery",
    },
    CommandCheck {
        name: "firmware_password",
        label: "Firmware Password",
        program: "/usr/sbin/firmwarepasswd",
        args: &["-check"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Startup Security > Firmware Password",
        auth_type: AuthType::Firmware,
        description: "Firmware password protects against unauthorized system access",
    },
    CommandCheck {
        name: "gatekeeper",
        label: "Gatekeeper",
        program: "spctl",
        args: &["--status"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Privacy & Security > Allow applications from",
        auth_type: AuthType::Admin,
        description: "Changing which applications may run requires administrator authentication",
    },
    CommandCheck {
        name: "system_integrity_protection",
        label: "System Integrity Protection",
        program: "csrutil",
        args: &["status"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Recovery > System Integrity Protection",
        auth_type: AuthType::RecoveryMode,
        description: "System Integrity Protection can only be reconfigured from recovery",
    },
    CommandCheck {
        name: "system_extensions",
        label: "System Extensions",
        program: "systemextensionsctl",
        args: &["list"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Privacy & Security > System Extensions",
        auth_type: AuthType::Admin,
        description: "Allowing a system extension requires administrator approval",
    },
    CommandCheck {
        name: "keychain",
        label: "Login Keychain",
        program: "security",
        args: &["list-keychains"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Passwords > Keychain",
        auth_type: AuthType::Keychain,
        description: "Reading stored credentials requires unlocking the keychain",
    },
    CommandCheck {
        name: "touch_id",
        label: "Touch ID",
        program: "bioutil",
        args: &["-r", "-s"],
        emit: Emit::OnSuccess,
        kind: "security",
        location: "Touch ID & Passcode > Fingerprints",
        auth_type: AuthType::Biometric,
        description: "Enrolled fingerprints can stand in for the login password",
    },
    CommandCheck {
        name: "software_update",
        label: "Software Update",
        program: "softwareupdate",
        args: &["--schedule"],
        emit: Emit::Always,
        kind: "update",
        location: "General > Software Update",
        auth_type: AuthType::Admin,
        description: "Installing system updates requires administrator authentication",
    },
    CommandCheck {
        name: "time_machine",
        label: "Time Machine",
        program: "tmutil",
        args: &["destinationinfo"],
        emit: Emit::WhenStdoutContains("encrypt"),
        kind: "backup",
        location: "General > Time Machine",
        auth_type: AuthType::User,
        description: "Time Machine backup encryption requires password for access",
    },
    CommandCheck {
        name: "firewall",
        label: "Firewall",
        program: "/usr/libexec/ApplicationFirewall/socketfilterfw",
        args: &["--getglobalstate"],
        emit: Emit::Always,
        kind: "network",
        location: "Network > Firewall",
        auth_type: AuthType::Admin,
        description: "Modifying firewall settings requires administrator authentication",
    },
    CommandCheck {
        name: "network_services",
        label: "Network Settings",
        program: "networksetup",
        args: &["-listallnetworkservices"],
        emit: Emit::Always,
        kind: "network",
        location: "Network > Services",
        auth_type: AuthType::Admin,
        description: "Modifying network services requires administrator authentication",
    },
    CommandCheck {
        name: "remote_login",
        label: "Remote Login",
        program: "systemsetup",
        args: &["-getremotelogin"],
        emit: Emit::Always,
        kind: "sharing",
        location: "Sharing > Remote Login",
        auth_type: AuthType::Admin,
        description: "Enabling remote login (SSH) requires administrator authentication",
    },
    CommandCheck {
        name: "file_sharing",
        label: "File Sharing",
        program: "sharing",
        args: &["-l"],
        emit: Emit::OnSuccess,
        kind: "sharing",
        location: "Sharing > File Sharing",
        auth_type: AuthType::Admin,
        description: "Adding shared folders requires administrator authentication",
    },
    CommandCheck {
        name: "date_time",
        label: "Date & Time",
        program: "systemsetup",
        args: &["-getusingnetworktime"],
        emit: Emit::Always,
        kind: "datetime",
        location: "General > Date & Time",
        auth_type: AuthType::Admin,
        description: "Changing the system clock source requires administrator authentication",
    },
    CommandCheck {
        name: "user_accounts",
        label: "Users & Groups",
        program: "dscl",
        args: &[".", "-list", "/Users"],
        emit: Emit::OnSuccess,
        kind: "accounts",
        location: "Users & Groups > Add User",
        auth_type: AuthType::Admin,
        description: "Creating or deleting user accounts requires administrator authentication",
    },
    CommandCheck {
        name: "printers",
        label: "Printers & Scanners",
        program: "lpstat",
        args: &["-p"],
        emit: Emit::Always,
        kind: "printing",
        location: "Printers & Scanners > Add Printer",
        auth_type: AuthType::Admin,
        description: "Adding a printer requires administrator authentication",
    },
    CommandCheck {
        name: "energy",
        label: "Energy Schedule",
        program: "pmset",
        args: &["-g", "sched"],
        emit: Emit::OnSuccess,
        kind: "energy",
        location: "Energy Saver > Schedule",
        auth_type: AuthType::Admin,
        description: "Scheduling startup or sleep requires administrator authentication",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    fn check(name: &str) -> CommandCheck {
        *COMMAND_CHECKS.iter().find(|c| c.name == name).unwrap()
    }

    #[tokio::test]
    async fn test_on_success_requires_zero_exit() {
        let ok = ScriptedRunner::new().ok("fdesetup", "FileVault is On.\n");
        let points = check("filevault").run(&ok).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].auth_type, AuthType::Admin);
        assert_eq!(points[0].source_probe, "filevault");
        assert!(points[0].requires_auth);

        let denied = ScriptedRunner::new().fail("fdesetup", "must be root");
        assert!(check("filevault").run(&denied).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_always_emits_even_on_failure() {
        let runner = ScriptedRunner::new().fail("softwareupdate", "no network");
        let points = check("software_update").run(&runner).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, "update");
    }

    #[tokio::test]
    async fn test_always_yields_nothing_when_command_missing() {
        let runner = ScriptedRunner::new();
        assert!(check("printers").run(&runner).await.is_err());
    }

    #[tokio::test]
    async fn test_always_yields_nothing_on_timeout() {
        let runner = ScriptedRunner::new().timeout("socketfilterfw");
        let err = check("firewall").run(&runner).await.unwrap_err();
        assert!(matches!(err, AuthScopeError::Probe { ref probe, .. } if probe == "firewall"));
    }

    #[tokio::test]
    async fn test_stdout_needle_is_case_insensitive() {
        let yes = ScriptedRunner::new().ok("tmutil", "Name: Backup\nEncrypted: Yes\n");
        assert_eq!(check("time_machine").run(&yes).await.unwrap().len(), 1);

        let no = ScriptedRunner::new().ok("tmutil", "Name: Backup\n");
        assert!(check("time_machine").run(&no).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_error_is_probe_error() {
        let runner = ScriptedRunner::new().timeout("csrutil");
        let err = check("system_integrity_protection").run(&runner).await.unwrap_err();
        assert!(matches!(err, AuthScopeError::Probe { ref probe, .. } if probe == "system_integrity_protection"));
    }

    #[tokio::test]
    async fn test_full_path_program_matches_by_file_name() {
        let runner = ScriptedRunner::new().ok("socketfilterfw", "Firewall is enabled. (State = 1)");
        let points = check("firewall").run(&runner).await.unwrap();
        assert_eq!(points[0].location, "Network > Firewall");
    }
}
