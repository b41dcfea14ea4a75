//! Hardware capability oracle.
//!
//! Settings that depend on absent hardware (no battery on a desktop, no
//! Touch ID sensor) are skipped instead of probed.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use crate::command::CommandRunner;

/// Decides whether a surface path targets hardware this machine lacks
pub trait CapabilityOracle: Send + Sync {
    /// Returns true if `path` should not be probed
    fn should_skip(&self, path: &str) -> bool;
}

/// Detected hardware features
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Model identifier (`hw.model`)
    pub model: String,
    /// Internal battery present
    pub has_battery: bool,
    /// Touch ID sensor present
    pub has_touch_id: bool,
    /// Face ID present
    pub has_face_id: bool,
    /// At least one Thunderbolt bus
    pub has_thunderbolt: bool,
    /// Ethernet hardware port present
    pub has_ethernet: bool,

    #[serde(skip)]
    unavailable: Mutex<Vec<String>>,
}

impl HardwareProfile {
    /// Profile claiming every feature, so nothing is skipped
    #[must_use]
    pub fn full() -> Self {
        Self {
            model: "unknown".to_string(),
            has_battery: true,
            has_touch_id: true,
            has_face_id: true,
            has_thunderbolt: true,
            has_ethernet: true,
            unavailable: Mutex::default(),
        }
    }

    /// Same profile without an internal battery
    #[must_use]
    pub fn without_battery(mut self) -> Self {
        self.has_battery = false;
        self
    }

    /// Same profile without a Touch ID sensor
    #[must_use]
    pub fn without_touch_id(mut self) -> Self {
        self.has_touch_id = false;
        self
    }

    /// Detect features by shelling out.
    ///
    /// Each check that cannot run counts as "feature absent", except Ethernet
    /// which is assumed present when the port list cannot be read.
    pub async fn detect(runner: &dyn CommandRunner) -> Self {
        let model = runner
            .run("sysctl", &["-n", "hw.model"])
            .await
            .ok()
            .and_then(|o| o.data().map(|s| s.trim().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        let has_battery = runner
            .run("pmset", &["-g", "batt"])
            .await
            .is_ok_and(|o| o.stdout.contains("InternalBattery"));

        let has_touch_id = runner
            .run("bioutil", &["-r"])
            .await
            .is_ok_and(|o| o.success() || o.stdout.contains("Touch ID"));

        let has_thunderbolt = runner
            .run("system_profiler", &["SPThunderboltDataType", "-json"])
            .await
            .ok()
            .and_then(|o| serde_json::from_str::<serde_json::Value>(&o.stdout).ok())
            .and_then(|v| v.get("SPThunderboltDataType")?.as_array().map(|a| !a.is_empty()))
            .unwrap_or(false);

        let has_ethernet = runner
            .run("networksetup", &["-listallhardwareports"])
            .await
            .map_or(true, |o| o.stdout.contains("Ethernet"));

        let profile = Self {
            model,
            has_battery,
            has_touch_id,
            has_face_id: false,
            has_thunderbolt,
            has_ethernet,
            unavailable: Mutex::default(),
        };
        info!(model = %profile.model, "hardware profile detected");
        profile
    }

    /// Paths skipped so far, with the missing feature
    pub fn unavailable_features(&self) -> Vec<String> {
        self.unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn feature_table(&self) -> [(&'static str, bool); 5] {
        [
            ("battery", self.has_battery),
            ("touch id", self.has_touch_id),
            ("face id", self.has_face_id),
            ("thunderbolt", self.has_thunderbolt),
            ("ethernet", self.has_ethernet),
        ]
    }
}

impl CapabilityOracle for HardwareProfile {
    fn should_skip(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        let missing = self
            .feature_table()
            .into_iter()
            .find(|(feature, present)| !present && lower.contains(feature));

        let Some((feature, _)) = missing else {
            return false;
        };

        let entry = format!("{path}: hardware not present ({feature})");
        debug!(path, feature, "skipping hardware-dependent path");
        let mut unavailable = self.unavailable.lock().unwrap_or_else(PoisonError::into_inner);
        if !unavailable.contains(&entry) {
            unavailable.push(entry);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_full_profile_skips_nothing() {
        let profile = HardwareProfile::full();
        assert!(!profile.should_skip("Battery"));
        assert!(!profile.should_skip("Touch ID & Passcode"));
    }

    #[test]
    fn test_missing_feature_is_skipped_and_recorded() {
        let profile = HardwareProfile {
            has_touch_id: false,
            ..HardwareProfile::full()
        };
        assert!(profile.should_skip("Touch ID & Passcode > Add Fingerprint"));
        assert!(profile.should_skip("Touch ID & Passcode > Add Fingerprint"));
        assert!(!profile.should_skip("Sharing"));
        assert_eq!(profile.unavailable_features().len(), 1);
    }

    #[tokio::test]
    async fn test_detect_from_command_output() {
        let runner = ScriptedRunner::new()
            .ok("sysctl", "MacBookPro18,3\n")
            .ok("pmset", "Now drawing from 'AC Power'\n -InternalBattery-0 (id=123)\n")
            .fail("bioutil", "")
            .ok("system_profiler", r#"{"SPThunderboltDataType": [{"_name": "bus0"}]}"#)
            .ok("networksetup", "Hardware Port: Wi-Fi\nDevice: en0\n");

        let profile = HardwareProfile::detect(&runner).await;
        assert_eq!(profile.model, "MacBookPro18,3");
        assert!(profile.has_battery);
        assert!(!profile.has_touch_id);
        assert!(profile.has_thunderbolt);
        assert!(!profile.has_ethernet);
    }

    #[test]
    fn test_builders_clear_features() {
        let profile = HardwareProfile::full().without_battery().without_touch_id();
        assert!(!profile.has_battery);
        assert!(!profile.has_touch_id);
        assert!(profile.has_ethernet);
        assert!(profile.should_skip("Battery"));
        assert_eq!(profile.unavailable_features().len(), 1);
    }

    #[test]
    fn test_detect_without_tools() {
        let profile = tokio_test::block_on(HardwareProfile::detect(&ScriptedRunner::new()));
        assert!(!profile.has_battery);
        assert!(!profile.has_touch_id);
        assert!(profile.has_ethernet);
        assert!(profile.should_skip("Battery"));
    }
}
