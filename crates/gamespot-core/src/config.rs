//! Site configuration for a `GameSpot` kiosk.
//!
//! Everything here is static for the lifetime of the process:
//! 1. The console roster seeded into the database at startup
//! 2. The payer identity written on every payment record
//! 3. The relay table mapping console names to ESP32 controllers
//! 4. Relay timing (timeout buffer, retry delay, status timeout)
//!
//! Built-in defaults describe the first venue: five consoles and one
//! relay controller wired to `PS5 #4`. A TOML file replaces any section it
//! names; omitted sections keep their defaults.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Console names, in display order.
    pub roster: Vec<String>,
    /// Payer identity stored on each payment.
    pub default_user: String,
    /// Relay timing shared by all controllers.
    pub timing: RelayTiming,
    /// Relay controllers, at most one per console.
    #[serde(rename = "relay")]
    pub relays: Vec<RelayTargetConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            roster: ["PS5 #1", "PS5 #2", "PS5 #3", "PS5 #4", "Logitech G920"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_user: "Azonix07".to_string(),
            timing: RelayTiming::default(),
            relays: vec![RelayTargetConfig {
                console: "PS5 #4".to_string(),
                host: "192.168.1.212".to_string(),
                port: default_port(),
                on_pulse_ms: default_on_pulse_ms(),
                on_fallback_pulse_ms: default_on_fallback_pulse_ms(),
                off_pulse_ms: default_off_pulse_ms(),
            }],
        }
    }
}

/// Timing applied to every relay request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayTiming {
    /// Added to the pulse duration to form the request timeout.
    pub timeout_buffer_ms: u64,
    /// Pause between the first and the fallback "on" attempt.
    pub retry_delay_ms: u64,
    /// Timeout for status polls.
    pub status_timeout_ms: u64,
}

impl Default for RelayTiming {
    fn default() -> Self {
        Self {
            timeout_buffer_ms: 2_500,
            retry_delay_ms: 1_000,
            status_timeout_ms: 3_000,
        }
    }
}

/// One ESP32 relay controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayTargetConfig {
    pub console: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Pulse held for "on".
    #[serde(default = "default_on_pulse_ms")]
    pub on_pulse_ms: u64,
    /// Shorter pulse used for the single "on" retry. `None` disables the retry.
    #[serde(default = "default_on_fallback_pulse_ms")]
    pub on_fallback_pulse_ms: Option<u64>,
    /// Pulse held for "off".
    #[serde(default = "default_off_pulse_ms")]
    pub off_pulse_ms: u64,
}

const fn default_port() -> u16 {
    80
}

const fn default_on_pulse_ms() -> u64 {
    500
}

#[allow(clippy::unnecessary_wraps)]
const fn default_on_fallback_pulse_ms() -> Option<u64> {
    Some(250)
}

const fn default_off_pulse_ms() -> u64 {
    3_000
}

impl SiteConfig {
    /// Load a site config from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read site config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a site config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check roster and relay table consistency.
    pub fn validate(&self) -> Result<()> {
        if self.roster.is_empty() {
            return Err(Error::Config("roster must name at least one console".into()));
        }
        if self.default_user.trim().is_empty() {
            return Err(Error::Config("default_user must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for name in &self.roster {
            if name.trim().is_empty() {
                return Err(Error::Config("roster contains an empty console name".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("duplicate console in roster: {name}")));
            }
        }

        let mut wired = HashSet::new();
        for relay in &self.relays {
            if !seen.contains(relay.console.as_str()) {
                return Err(Error::Config(format!(
                    "relay configured for unknown console: {}",
                    relay.console
                )));
            }
            if !wired.insert(relay.console.as_str()) {
                return Err(Error::Config(format!(
                    "more than one relay configured for {}",
                    relay.console
                )));
            }
            if relay.host.trim().is_empty() {
                return Err(Error::Config(format!("relay for {} has no host", relay.console)));
            }
            let zero_fallback = relay.on_fallback_pulse_ms == Some(0);
            if relay.on_pulse_ms == 0 || relay.off_pulse_ms == 0 || zero_fallback {
                return Err(Error::Config(format!(
                    "relay for {} has a zero pulse duration",
                    relay.console
                )));
            }
        }

        Ok(())
    }

    /// Relay controller wired to `console`, if any.
    pub fn relay_for(&self, console: &str) -> Option<&RelayTargetConfig> {
        self.relays.iter().find(|r| r.console == console)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SiteConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roster.len(), 5);
        assert_eq!(config.relay_for("PS5 #4").unwrap().host, "192.168.1.212");
        assert!(config.relay_for("PS5 #1").is_none());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = SiteConfig::from_toml("  \n").unwrap();
        assert_eq!(config.roster, SiteConfig::default().roster);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = SiteConfig::from_toml(
            r#"
roster = ["Bay A", "Bay B"]

[[relay]]
console = "Bay B"
host = "10.0.0.7"
"#,
        )
        .unwrap();
        assert_eq!(config.roster, vec!["Bay A", "Bay B"]);
        assert_eq!(config.default_user, "Azonix07");
        assert_eq!(config.timing, RelayTiming::default());

        let relay = config.relay_for("Bay B").unwrap();
        assert_eq!(relay.port, 80);
        assert_eq!(relay.on_pulse_ms, 500);
        assert_eq!(relay.on_fallback_pulse_ms, Some(250));
    }

    #[test]
    fn relay_for_unknown_console_is_rejected() {
        let err = SiteConfig::from_toml(
            r#"
roster = ["Bay A"]

[[relay]]
console = "Bay Z"
host = "10.0.0.7"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn duplicate_roster_entry_is_rejected() {
        let err = SiteConfig::from_toml(r#"roster = ["Bay A", "Bay A"]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn zero_pulse_is_rejected() {
        let err = SiteConfig::from_toml(
            r#"
roster = ["Bay A"]

[[relay]]
console = "Bay A"
host = "10.0.0.7"
off_pulse_ms = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("zero pulse"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gamespot.toml");
        std::fs::write(&path, "default_user = \"front-desk\"\n").unwrap();
        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.default_user, "front-desk");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = SiteConfig::load(Path::new("/nonexistent/gamespot.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
