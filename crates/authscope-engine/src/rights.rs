//! Right identifier inference.
//!
//! Points produced without a right identifier are matched against an
//! ordered rule table: kind rules, then credential rules, then description
//! rules, then the generic admin fallback. The first matching rule wins.

use tracing::debug;

use authscope_core::{AuthType, AuthorizationPoint};

/// Right assigned to admin points no other rule claims
pub const ADMIN_FALLBACK_RIGHT: &str = "system.privilege.admin";

type Predicate = Box<dyn Fn(&AuthorizationPoint) -> bool + Send + Sync>;

/// One inference rule
pub struct RightRule {
    /// Short name for logs
    pub name: &'static str,
    predicate: Predicate,
    /// Right assigned on match
    pub right: &'static str,
}

impl RightRule {
    /// Rule assigning `right` to points matching `predicate`
    pub fn new<F>(name: &'static str, right: &'static str, predicate: F) -> Self
    where
        F: Fn(&AuthorizationPoint) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            predicate: Box::new(predicate),
            right,
        }
    }

    /// Returns true if the rule applies to `point`
    pub fn matches(&self, point: &AuthorizationPoint) -> bool {
        (self.predicate)(point)
    }
}

impl std::fmt::Debug for RightRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RightRule")
            .field("name", &self.name)
            .field("right", &self.right)
            .finish_non_exhaustive()
    }
}

/// Ordered rule table
#[derive(Debug)]
pub struct RightRules {
    rules: Vec<RightRule>,
}

const KIND_RULES: &[(&str, &str)] = &[
    ("network", "system.preferences.network"),
    ("sharing", "system.preferences.sharing"),
    ("accounts", "system.preferences.accounts"),
    ("printing", "system.preferences.printing"),
    ("datetime", "system.preferences.datetime"),
    ("energy", "system.preferences.energysaver"),
    ("privacy", "system.preferences.security"),
    ("update", "system.install.software"),
    ("startup", "system.preferences.startupdisk"),
    ("backup", "system.preferences.timemachine"),
];

const AUTH_TYPE_RULES: &[(AuthType, &str)] = &[
    (AuthType::Keychain, "system.keychain.modify"),
    (AuthType::Biometric, "com.apple.security.biometric"),
    (AuthType::Firmware, "system.firmware.password"),
    (AuthType::RecoveryMode, "system.csr.configure"),
    (AuthType::UserConsent, "com.apple.tcc.consent"),
];

/// Lowercase description fragments
const DESCRIPTION_RULES: &[(&[&str], &str)] = &[
    (&["filevault", "encryption"], "system.preferences.security"),
    (&["firewall"], "system.preferences.security.firewall"),
    (&["software update", "install"], "system.install.software"),
    (&["kernel extension"], "com.apple.KernelExtensionManagement"),
    (&["system extension"], "com.apple.SystemExtensions"),
    (&["time machine"], "system.preferences.timemachine"),
    (&["remote login", "ssh"], "system.preferences.sharing"),
    (&["account"], "system.preferences.accounts"),
];

impl Default for RightRules {
    fn default() -> Self {
        let mut rules = Self::empty();

        for (kind, right) in KIND_RULES {
            rules.push(RightRule::new("kind", *right, move |p| p.kind == *kind));
        }
        for (auth_type, right) in AUTH_TYPE_RULES {
            rules.push(RightRule::new("auth_type", *right, move |p| p.auth_type == *auth_type));
        }
        for (needles, right) in DESCRIPTION_RULES {
            rules.push(RightRule::new("description", *right, move |p| {
                let description = p.description.to_lowercase();
                needles.iter().any(|n| description.contains(n))
            }));
        }
        rules.push(RightRule::new("admin_fallback", ADMIN_FALLBACK_RIGHT, |p| {
            p.auth_type == AuthType::Admin
        }));

        rules
    }
}

impl RightRules {
    /// Table with no rules
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule at the lowest priority
    pub fn push(&mut self, rule: RightRule) {
        self.rules.push(rule);
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the table has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching `point`
    pub fn resolve(&self, point: &AuthorizationPoint) -> Option<&RightRule> {
        self.rules.iter().find(|rule| rule.matches(point))
    }
}

/// Fill `right_identifier` on points lacking one, returning how many were filled.
///
/// Points that already carry a right are never touched, so a second pass
/// changes nothing.
pub fn enhance_rights(points: &mut [AuthorizationPoint], rules: &RightRules) -> usize {
    let mut filled = 0;
    for point in points.iter_mut().filter(|p| p.lacks_right()) {
        if let Some(rule) = rules.resolve(point) {
            debug!(label = %point.label, rule = rule.name, right = rule.right, "inferred right");
            point.right_identifier = Some(rule.right.to_string());
            filled += 1;
        }
    }
    filled
}
