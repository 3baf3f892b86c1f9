//! Console booking state machine.
//!
//! Each console is either free or booked. `book` only takes a free console;
//! `pay` books unconditionally and then powers the console on; `reset` frees
//! it and powers it off. Sessions are never expired automatically: a console
//! whose time ran out reports zero remaining until someone resets it.
//!
//! The console lock covers only the state transition. Relay side effects are
//! queued on the console's relay lane before the lock is released, so presses
//! still run in transition order, and the caller waits at most
//! `relay_deadline` for its own press. A press still running past the
//! deadline is reported as pending and finishes in the background.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use gamespot_core::time::unix_millis;
use gamespot_relay::{ControllerStatus, RelayAction, RelayClient, RelayError, RelayResponse};

use super::error::{BookingError, Result};
use super::lanes::{PendingPress, RelayLanes};
use super::locks::{ConsoleGuard, ConsoleLocks};
use crate::storage::{ColumnInfo, KioskDatabase, NewPayment, PaymentRecord};

/// Default wait for a relay side effect before answering.
pub const DEFAULT_RELAY_DEADLINE: Duration = Duration::from_secs(5);

/// One console as shown on the kiosk dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleStatus {
    pub name: String,
    pub booked: bool,
    /// Milliseconds left, `null` when free, `0` once expired.
    pub remaining_time: Option<i64>,
}

/// A successful `book`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub console: String,
    pub end_time: i64,
}

/// A payment as submitted at the counter.
#[derive(Debug, Clone, Copy)]
pub struct PaymentRequest<'a> {
    pub console: &'a str,
    pub minutes: u32,
    pub method: &'a str,
    pub photo: Option<&'a str>,
}

/// A recorded payment and the power-on that followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub payment_id: i64,
    pub console: String,
    pub end_time: i64,
    pub photo_saved: bool,
    pub power_on: PowerOutcome,
}

/// A single-console reset and its power-off.
#[derive(Debug, Clone, PartialEq)]
pub struct Reset {
    pub console: String,
    pub power_off: PowerOutcome,
}

/// A reset of every console.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetAll {
    /// Rows cleared.
    pub reset: u64,
    /// Power-off results for wired consoles, in relay configuration order.
    pub power_off: Vec<PowerOutcome>,
}

/// Result of a best-effort relay side effect, reported alongside an
/// otherwise successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerOutcome {
    pub console: String,
    pub action: RelayAction,
    pub success: bool,
    pub simulated: bool,
    /// Still running when the response was sent.
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<RelayResponse>,
}

impl PowerOutcome {
    fn from_result(
        console: &str,
        action: RelayAction,
        result: std::result::Result<RelayResponse, RelayError>,
    ) -> Self {
        match result {
            Ok(relay) => Self {
                console: console.to_string(),
                action,
                success: true,
                simulated: relay.simulated,
                pending: false,
                error: None,
                relay: Some(relay),
            },
            Err(e) => Self::failed(console, action, e.to_string()),
        }
    }

    fn failed(console: &str, action: RelayAction, error: String) -> Self {
        Self {
            console: console.to_string(),
            action,
            success: false,
            simulated: false,
            pending: false,
            error: Some(error),
            relay: None,
        }
    }

    fn pending(console: &str, action: RelayAction) -> Self {
        Self {
            console: console.to_string(),
            action,
            success: false,
            simulated: false,
            pending: true,
            error: None,
            relay: None,
        }
    }
}

/// Owns the store handle, the relay client, the per-console locks and the
/// relay lanes. Cheap to clone.
#[derive(Clone)]
pub struct BookingEngine {
    db: KioskDatabase,
    relay: RelayClient,
    locks: Arc<ConsoleLocks>,
    lanes: Arc<RelayLanes>,
    default_user: Arc<str>,
    relay_deadline: Duration,
}

impl BookingEngine {
    pub fn new(
        db: KioskDatabase,
        relay: RelayClient,
        default_user: &str,
        relay_deadline: Duration,
    ) -> Self {
        Self {
            db,
            lanes: Arc::new(RelayLanes::new(relay.clone())),
            relay,
            locks: Arc::new(ConsoleLocks::new()),
            default_user: Arc::from(default_user),
            relay_deadline,
        }
    }

    /// Whether every relay action is simulated.
    pub const fn test_mode(&self) -> bool {
        self.relay.test_mode()
    }

    pub async fn status(&self) -> Result<Vec<ConsoleStatus>> {
        let now = unix_millis();
        let consoles = self.db.list_consoles().await?;
        Ok(consoles
            .into_iter()
            .map(|c| ConsoleStatus {
                booked: c.booked(),
                remaining_time: c.remaining_time(now),
                name: c.name,
            })
            .collect())
    }

    /// Book a free console. No relay action.
    pub async fn book(&self, console: &str, minutes: u32) -> Result<Booking> {
        ensure_minutes(minutes)?;
        let _guard = self.lock_known(console).await?;

        match self.db.try_book(console, minutes, unix_millis()).await? {
            Some(end_time) => {
                info!(console, minutes, end_time, "Console booked");
                Ok(Booking {
                    console: console.to_string(),
                    end_time,
                })
            }
            None => {
                info!(console, "Booking rejected, console already booked");
                Err(BookingError::AlreadyBooked(console.to_string()))
            }
        }
    }

    /// Record a payment, book the console regardless of its state, then
    /// power it on. Relay failure never undoes the payment.
    pub async fn pay(&self, request: PaymentRequest<'_>) -> Result<Payment> {
        ensure_minutes(request.minutes)?;
        if request.method.trim().is_empty() {
            return Err(BookingError::Validation("method is required".into()));
        }
        let guard = self.lock_known(request.console).await?;

        let paid = self
            .db
            .record_paid_session(
                NewPayment {
                    console: request.console,
                    minutes: request.minutes,
                    method: request.method,
                    user: &self.default_user,
                    photo: request.photo,
                },
                unix_millis(),
            )
            .await?;
        info!(
            console = request.console,
            minutes = request.minutes,
            method = request.method,
            payment_id = paid.payment_id,
            photo_saved = paid.photo_saved,
            "Payment recorded"
        );

        let press = self.dispatch(request.console, RelayAction::On);
        drop(guard);
        let power_on = self.settle(request.console, RelayAction::On, press).await;
        Ok(Payment {
            payment_id: paid.payment_id,
            console: request.console.to_string(),
            end_time: paid.end_time,
            photo_saved: paid.photo_saved,
            power_on,
        })
    }

    /// Free one console, then power it off.
    pub async fn reset(&self, console: &str) -> Result<Reset> {
        let guard = self.lock_known(console).await?;
        self.db.reset_console(console).await?;
        info!(console, "Console reset");

        let press = self.dispatch(console, RelayAction::Off);
        drop(guard);
        let power_off = self.settle(console, RelayAction::Off, press).await;
        Ok(Reset {
            console: console.to_string(),
            power_off,
        })
    }

    /// Free every console, then power off every wired console concurrently.
    pub async fn reset_all(&self) -> Result<ResetAll> {
        let consoles = self.db.list_consoles().await?;

        // Always taken in roster order, so concurrent resets cannot deadlock.
        let mut guards = Vec::with_capacity(consoles.len());
        for console in &consoles {
            guards.push(self.locks.acquire(&console.name).await);
        }

        let reset = self.db.reset_all_consoles().await?;
        info!(reset, "All consoles reset");

        let wired: Vec<String> = self
            .relay
            .targets()
            .iter()
            .map(|t| t.console.clone())
            .collect();
        let presses: Vec<Option<PendingPress>> = wired
            .iter()
            .map(|console| self.dispatch(console, RelayAction::Off))
            .collect();
        drop(guards);

        let mut set = JoinSet::new();
        for (i, (console, press)) in wired.iter().cloned().zip(presses).enumerate() {
            let engine = self.clone();
            set.spawn(async move {
                let outcome = engine.settle(&console, RelayAction::Off, press).await;
                (i, outcome)
            });
        }

        let mut slots: Vec<Option<PowerOutcome>> = vec![None; wired.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, outcome)) => slots[i] = Some(outcome),
                Err(e) => warn!(error = %e, "Power-off task failed"),
            }
        }
        let power_off = slots
            .into_iter()
            .zip(&wired)
            .map(|(slot, console)| {
                slot.unwrap_or_else(|| {
                    PowerOutcome::failed(console, RelayAction::Off, "power-off task failed".into())
                })
            })
            .collect();

        Ok(ResetAll { reset, power_off })
    }

    /// Explicit power control. Unlike `pay` and `reset`, a relay failure is
    /// this operation's error.
    pub async fn power(&self, console: &str, action: RelayAction) -> Result<RelayResponse> {
        let guard = self.lock_known(console).await?;
        let press = self.dispatch(console, action);
        drop(guard);

        match press {
            Some(press) => {
                let result = press.await.map_err(|_| lane_closed(console))?;
                Ok(result?)
            }
            None => Ok(RelayResponse::simulated(console, action)),
        }
    }

    /// Payment ledger, newest first.
    pub async fn payments(&self) -> Result<Vec<PaymentRecord>> {
        Ok(self.db.list_payments().await?)
    }

    /// Reachability of every relay controller.
    pub async fn controllers(&self) -> Vec<ControllerStatus> {
        self.relay.snapshot().await
    }

    pub async fn table_info(&self) -> Result<BTreeMap<String, Vec<ColumnInfo>>> {
        Ok(self.db.table_info().await?)
    }

    /// Lock a console after checking it exists, so the lock map only ever
    /// holds roster names.
    async fn lock_known(&self, console: &str) -> Result<ConsoleGuard> {
        self.db.get_console(console).await?;
        Ok(self.locks.acquire(console).await)
    }

    /// Queue a press on the console's relay lane. Called under the console
    /// guard. `None` when the console is simulated.
    fn dispatch(&self, console: &str, action: RelayAction) -> Option<PendingPress> {
        self.relay
            .is_live(console)
            .then(|| self.lanes.submit(console, action))
    }

    /// Wait for a queued press up to the deadline.
    async fn settle(
        &self,
        console: &str,
        action: RelayAction,
        press: Option<PendingPress>,
    ) -> PowerOutcome {
        let Some(press) = press else {
            return PowerOutcome::from_result(
                console,
                action,
                Ok(RelayResponse::simulated(console, action)),
            );
        };

        // Dropping the reply slot on timeout leaves the press running.
        match tokio::time::timeout(self.relay_deadline, press).await {
            Ok(Ok(result)) => PowerOutcome::from_result(console, action, result),
            Ok(Err(_)) => {
                warn!(console, %action, "Relay lane closed before replying");
                PowerOutcome::failed(console, action, lane_closed(console).to_string())
            }
            Err(_) => {
                let deadline_ms =
                    u64::try_from(self.relay_deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    console,
                    %action,
                    deadline_ms,
                    "Relay still running past the response deadline"
                );
                PowerOutcome::pending(console, action)
            }
        }
    }
}

fn lane_closed(console: &str) -> RelayError {
    RelayError::Client(format!("relay lane for {console} closed"))
}

fn ensure_minutes(minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(BookingError::Validation(
            "minutes must be a positive integer".into(),
        ));
    }
    Ok(())
}
