//! Device descriptor
//!
//! Static-ish facts about the host: model, OS, locale. Detection is
//! best-effort; anything that cannot be determined is left empty rather than
//! guessed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Hardware model, e.g. `MacBookPro18,3` or a DMI product name
    pub model: String,
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    /// BCP-47-ish locale tag, e.g. `en_GB`
    pub locale: String,
    pub cpu_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    /// Active network interface at the time of detection
    #[serde(default)]
    pub network: Option<String>,
}

impl DeviceDescriptor {
    /// Detect the current host. `network` is left unset; the sampler fills it
    /// from the connectivity probe.
    pub fn detect() -> Self {
        Self {
            model: detect_model().unwrap_or_else(|| std::env::consts::ARCH.to_string()),
            os_name: std::env::consts::OS.to_string(),
            os_version: os_version().unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
            locale: detect_locale(),
            cpu_count: crate::cpu::cpu_count(),
            app_version: None,
            carrier: None,
            network: None,
        }
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn with_network(mut self, network: Option<String>) -> Self {
        self.network = network;
        self
    }
}

fn detect_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|v| !v.is_empty())
        .map(|v| normalize_locale(&v))
        .unwrap_or_else(|| "en_US".to_string())
}

/// Strip the encoding and modifier: `en_GB.UTF-8@euro` -> `en_GB`
fn normalize_locale(raw: &str) -> String {
    let tag = raw.split(['.', '@']).next().unwrap_or(raw);
    if tag == "C" || tag == "POSIX" {
        "en_US".to_string()
    } else {
        tag.to_string()
    }
}

fn os_version() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()?;
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|s| parse_os_release(&s))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_os_release(raw: &str) -> Option<String> {
    let field = |name: &str| {
        raw.lines()
            .filter_map(|l| l.strip_prefix(name)?.strip_prefix('='))
            .map(|v| v.trim().trim_matches('"'))
            .find(|v| !v.is_empty())
            .map(str::to_string)
    };

    // VERSION_ID is the bare version; PRETTY_NAME repeats the distro name
    field("VERSION_ID")
        .or_else(|| field("VERSION"))
        .or_else(|| field("PRETTY_NAME"))
}

fn detect_model() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("sysctl")
            .arg("-n")
            .arg("hw.model")
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
    #[cfg(target_os = "linux")]
    {
        crate::procfs::read_trimmed("/sys/devices/virtual/dmi/id/product_name")
            .or_else(|| {
                crate::procfs::read_trimmed("/proc/device-tree/model")
                    .map(|m| m.trim_end_matches('\0').to_string())
            })
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
