//! Relay wiring: which controller drives which console.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gamespot_core::{RelayTargetConfig, RelayTiming};

use crate::policy::PressPolicy;

/// Power action sent to a relay controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayAction {
    On,
    Off,
}

impl RelayAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for RelayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action must be \"on\" or \"off\", got {0:?}")]
pub struct ParseActionError(pub String);

impl FromStr for RelayAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(ParseActionError(other.to_string())),
        }
    }
}

/// A console's relay controller and its per-action press policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    pub console: String,
    pub host: String,
    pub port: u16,
    pub on: PressPolicy,
    pub off: PressPolicy,
}

impl RelayTarget {
    /// Build from site config. "On" gets the fallback retry; "off" never does.
    pub fn from_config(config: &RelayTargetConfig, timing: &RelayTiming) -> Self {
        let retry_delay = Duration::from_millis(timing.retry_delay_ms);
        let on = match config.on_fallback_pulse_ms {
            Some(fallback) => PressPolicy::with_fallback(config.on_pulse_ms, fallback, retry_delay),
            None => PressPolicy::single(config.on_pulse_ms),
        };
        Self {
            console: config.console.clone(),
            host: config.host.clone(),
            port: config.port,
            on,
            off: PressPolicy::single(config.off_pulse_ms),
        }
    }

    pub const fn policy(&self, action: RelayAction) -> &PressPolicy {
        match action {
            RelayAction::On => &self.on,
            RelayAction::Off => &self.off,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `GET /relay/{action}?duration={ms}` on the controller.
    pub fn press_url(&self, action: RelayAction, duration_ms: u64) -> String {
        format!("{}/relay/{action}?duration={duration_ms}", self.base_url())
    }

    /// `GET /status` on the controller.
    pub fn status_url(&self) -> String {
        format!("{}/status", self.base_url())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> RelayTargetConfig {
        RelayTargetConfig {
            console: "PS5 #4".into(),
            host: "192.168.1.212".into(),
            port: 80,
            on_pulse_ms: 500,
            on_fallback_pulse_ms: Some(250),
            off_pulse_ms: 3_000,
        }
    }

    #[test]
    fn action_parses_only_on_and_off() {
        assert_eq!("on".parse::<RelayAction>().unwrap(), RelayAction::On);
        assert_eq!("off".parse::<RelayAction>().unwrap(), RelayAction::Off);
        assert!("ON".parse::<RelayAction>().is_err());
        assert!("".parse::<RelayAction>().is_err());
    }

    #[test]
    fn off_policy_never_retries() {
        let target = RelayTarget::from_config(&config(), &RelayTiming::default());
        assert_eq!(target.policy(RelayAction::Off).fallback_ms, None);
        assert!(target.policy(RelayAction::On).fallback_ms.is_some());
        assert_eq!(target.on.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn on_without_fallback_is_single() {
        let mut cfg = config();
        cfg.on_fallback_pulse_ms = None;
        let target = RelayTarget::from_config(&cfg, &RelayTiming::default());
        assert_eq!(target.on, PressPolicy::single(500));
    }

    #[test]
    fn urls_are_built_from_host_and_port() {
        let target = RelayTarget::from_config(&config(), &RelayTiming::default());
        assert_eq!(
            target.press_url(RelayAction::On, 500),
            "http://192.168.1.212:80/relay/on?duration=500"
        );
        assert_eq!(target.status_url(), "http://192.168.1.212:80/status");
    }
}
