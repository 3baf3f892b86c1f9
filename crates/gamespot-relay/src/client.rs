//! HTTP client for ESP32 relay controllers.
//!
//! Every request carries its own timeout: the pulse duration plus a fixed
//! buffer, so a slow relay that is still holding the contact is not
//! reported as a timeout. Consoles without a controller (or every console,
//! in test mode) get a simulated response of the same shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use gamespot_core::{RelayTiming, SiteConfig};

use crate::target::{RelayAction, RelayTarget};

/// Relay client errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay for {console} timed out after {timeout_ms} ms")]
    Timeout { console: String, timeout_ms: u64 },

    #[error("Relay for {console} unreachable: {message}")]
    Network { console: String, message: String },

    #[error("Relay for {console} rejected the request ({status}): {message}")]
    Device {
        console: String,
        status: u16,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl RelayError {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn from_reqwest(console: &str, timeout: Duration, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                console: console.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            Self::Network {
                console: console.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Raw successful reply from a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReply {
    pub status: u16,
    /// JSON body, or the body text as a JSON string when it is not JSON.
    pub body: Value,
}

/// Outcome of a power action, live or simulated.
///
/// Both modes serialize the same keys; `simulated` is the only way to tell
/// them apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub console: String,
    pub action: RelayAction,
    pub simulated: bool,
    /// Requests actually sent (0 when simulated).
    pub attempts: u32,
    /// Pulse of the attempt that succeeded.
    pub pulse_ms: Option<u64>,
    /// Controller reply body.
    pub device: Value,
}

impl RelayResponse {
    pub fn simulated(console: &str, action: RelayAction) -> Self {
        Self {
            console: console.to_string(),
            action,
            simulated: true,
            attempts: 0,
            pulse_ms: None,
            device: Value::Null,
        }
    }
}

/// Reply to a status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayStatus {
    pub latency_ms: u64,
    pub device: Value,
}

/// One row of the controller reachability snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub console: String,
    pub host: String,
    pub port: u16,
    /// `online`, `offline` or `simulated`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for the relay controllers of one site.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    targets: Arc<Vec<RelayTarget>>,
    index: Arc<HashMap<String, usize>>,
    timeout_buffer: Duration,
    status_timeout: Duration,
    test_mode: bool,
}

impl RelayClient {
    /// Build a client for every relay in the site config.
    pub fn new(site: &SiteConfig, test_mode: bool) -> Result<Self, RelayError> {
        let targets = site
            .relays
            .iter()
            .map(|r| RelayTarget::from_config(r, &site.timing))
            .collect();
        Self::with_targets(targets, &site.timing, test_mode)
    }

    /// Build a client for an explicit target list.
    pub fn with_targets(
        targets: Vec<RelayTarget>,
        timing: &RelayTiming,
        test_mode: bool,
    ) -> Result<Self, RelayError> {
        // reqwest is built with `rustls-no-provider`; installing twice is harmless.
        let _ = rustls::crypto::ring::default_provider().install_default();

        // Controllers sit on the venue LAN; never route them through a proxy.
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;

        let index = targets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.console.clone(), i))
            .collect();

        Ok(Self {
            http,
            targets: Arc::new(targets),
            index: Arc::new(index),
            timeout_buffer: Duration::from_millis(timing.timeout_buffer_ms),
            status_timeout: Duration::from_millis(timing.status_timeout_ms),
            test_mode,
        })
    }

    /// Whether every action is simulated regardless of wiring.
    pub const fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// The wired console whose press can take longest, with that bound.
    pub fn slowest_press(&self) -> Option<(&str, Duration)> {
        self.targets
            .iter()
            .flat_map(|t| {
                [RelayAction::On, RelayAction::Off].map(|action| {
                    let worst = t.policy(action).worst_case(self.timeout_buffer);
                    (t.console.as_str(), worst)
                })
            })
            .max_by_key(|&(_, worst)| worst)
    }

    pub fn target(&self, console: &str) -> Option<&RelayTarget> {
        self.index.get(console).map(|&i| &self.targets[i])
    }

    pub fn targets(&self) -> &[RelayTarget] {
        &self.targets
    }

    /// Whether `console` would get a real network call.
    pub fn is_live(&self, console: &str) -> bool {
        !self.test_mode && self.index.contains_key(console)
    }

    /// Send one press pulse. Timeout is `duration_ms` plus the buffer.
    pub async fn press(
        &self,
        target: &RelayTarget,
        action: RelayAction,
        duration_ms: u64,
    ) -> Result<DeviceReply, RelayError> {
        let url = target.press_url(action, duration_ms);
        let timeout = Duration::from_millis(duration_ms) + self.timeout_buffer;
        debug!(console = %target.console, %action, duration_ms, %url, "Pressing relay");
        let reply = self.get(&target.console, &url, timeout).await?;

        if reply.body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(RelayError::Device {
                console: target.console.clone(),
                status: reply.status,
                message: reply
                    .body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("controller reported failure")
                    .to_string(),
            });
        }
        Ok(reply)
    }

    /// Poll the controller's status endpoint.
    pub async fn status(&self, target: &RelayTarget) -> Result<RelayStatus, RelayError> {
        let started = tokio::time::Instant::now();
        let reply = self
            .get(&target.console, &target.status_url(), self.status_timeout)
            .await?;
        Ok(RelayStatus {
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            device: reply.body,
        })
    }

    /// Run `action` for `console` under its press policy.
    ///
    /// Simulated (no network call) in test mode or when the console has no
    /// relay wired.
    pub async fn power(
        &self,
        console: &str,
        action: RelayAction,
    ) -> Result<RelayResponse, RelayError> {
        let target = match self.target(console) {
            Some(target) if !self.test_mode => target,
            _ => {
                debug!(console, %action, "Simulated relay action");
                return Ok(RelayResponse::simulated(console, action));
            }
        };

        let policy = *target.policy(action);
        let respond = |attempts: u32, pulse_ms: u64, reply: DeviceReply| RelayResponse {
            console: console.to_string(),
            action,
            simulated: false,
            attempts,
            pulse_ms: Some(pulse_ms),
            device: reply.body,
        };

        let first_err = match self.press(target, action, policy.primary_ms).await {
            Ok(reply) => {
                info!(console, %action, pulse_ms = policy.primary_ms, "Relay pressed");
                return Ok(respond(1, policy.primary_ms, reply));
            }
            Err(e) => e,
        };

        let Some(fallback_ms) = policy.fallback_ms else {
            warn!(console, %action, error = %first_err, "Relay press failed");
            return Err(first_err);
        };

        warn!(
            console,
            %action,
            error = %first_err,
            fallback_ms,
            delay_ms = u64::try_from(policy.retry_delay.as_millis()).unwrap_or(u64::MAX),
            "Relay press failed, retrying with fallback pulse"
        );
        tokio::time::sleep(policy.retry_delay).await;

        match self.press(target, action, fallback_ms).await {
            Ok(reply) => {
                info!(console, %action, pulse_ms = fallback_ms, "Relay pressed on retry");
                Ok(respond(2, fallback_ms, reply))
            }
            Err(e) => {
                warn!(console, %action, error = %e, "Relay retry failed");
                Err(e)
            }
        }
    }

    /// Reachability of every controller, polled concurrently.
    ///
    /// Rows come back in configuration order.
    pub async fn snapshot(&self) -> Vec<ControllerStatus> {
        if self.test_mode {
            return self
                .targets
                .iter()
                .map(|t| ControllerStatus {
                    console: t.console.clone(),
                    host: t.host.clone(),
                    port: t.port,
                    status: "simulated",
                    latency_ms: None,
                    device: None,
                    error: None,
                })
                .collect();
        }

        let mut set = JoinSet::new();
        for (i, target) in self.targets.iter().enumerate() {
            let client = self.clone();
            let target = target.clone();
            set.spawn(async move {
                let result = client.status(&target).await;
                (i, target, result)
            });
        }

        let mut rows: Vec<Option<ControllerStatus>> = vec![None; self.targets.len()];
        while let Some(joined) = set.join_next().await {
            let (i, target, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "Relay status task failed");
                    continue;
                }
            };
            let row = match result {
                Ok(status) => ControllerStatus {
                    console: target.console,
                    host: target.host,
                    port: target.port,
                    status: "online",
                    latency_ms: Some(status.latency_ms),
                    device: Some(status.device),
                    error: None,
                },
                Err(e) => ControllerStatus {
                    console: target.console,
                    host: target.host,
                    port: target.port,
                    status: "offline",
                    latency_ms: None,
                    device: None,
                    error: Some(e.to_string()),
                },
            };
            rows[i] = Some(row);
        }
        rows.into_iter().flatten().collect()
    }

    async fn get(
        &self,
        console: &str,
        url: &str,
        timeout: Duration,
    ) -> Result<DeviceReply, RelayError> {
        let resp = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| RelayError::from_reqwest(console, timeout, &e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RelayError::from_reqwest(console, timeout, &e))?;

        if !status.is_success() {
            return Err(RelayError::Device {
                console: console.to_string(),
                status: status.as_u16(),
                message: if text.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                } else {
                    text
                },
            });
        }

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(DeviceReply {
            status: status.as_u16(),
            body,
        })
    }
}
