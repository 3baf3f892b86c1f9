//! Per-console relay lanes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use gamespot_relay::{RelayAction, RelayClient, RelayError, RelayResponse};

pub type PressResult = Result<RelayResponse, RelayError>;

/// Reply slot for a queued press. Dropping it does not cancel the press.
pub type PendingPress = oneshot::Receiver<PressResult>;

struct Press {
    action: RelayAction,
    reply: oneshot::Sender<PressResult>,
}

/// One worker task per console, pressing its relay in submission order.
///
/// Submitting never waits, so a slow controller only delays later presses
/// for the same console, never the state transitions that queued them.
pub struct RelayLanes {
    relay: RelayClient,
    lanes: Mutex<HashMap<String, mpsc::UnboundedSender<Press>>>,
}

impl RelayLanes {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            relay,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Queue `action` behind any earlier press for `console`.
    pub fn submit(&self, console: &str, action: RelayAction) -> PendingPress {
        let (reply, pending) = oneshot::channel();
        let mut press = Press { action, reply };

        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lane) = lanes.get(console) {
            match lane.send(press) {
                Ok(()) => return pending,
                Err(mpsc::error::SendError(returned)) => {
                    warn!(console, "Relay lane worker gone, restarting it");
                    press = returned;
                }
            }
        }

        let lane = self.spawn_worker(console);
        // Fresh worker, receiver still alive.
        if lane.send(press).is_err() {
            warn!(console, %action, "Relay lane rejected a press");
        }
        lanes.insert(console.to_string(), lane);
        pending
    }

    fn spawn_worker(&self, console: &str) -> mpsc::UnboundedSender<Press> {
        let (lane, mut queue) = mpsc::unbounded_channel::<Press>();
        let relay = self.relay.clone();
        let console = console.to_string();
        tokio::spawn(async move {
            while let Some(Press { action, reply }) = queue.recv().await {
                let result = relay.power(&console, action).await;
                if reply.send(result).is_err() {
                    debug!(console, %action, "Relay press finished after its caller gave up");
                }
            }
        });
        lane
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use gamespot_core::RelayTiming;
    use gamespot_relay::PressPolicy;
    use gamespot_relay::testing::FakeRelay;

    use super::*;

    fn lanes(fake: &FakeRelay) -> RelayLanes {
        let target = fake.target("PS5 #4", PressPolicy::single(40), PressPolicy::single(60));
        let timing = RelayTiming {
            timeout_buffer_ms: 2_000,
            retry_delay_ms: 10,
            status_timeout_ms: 500,
        };
        RelayLanes::new(RelayClient::with_targets(vec![target], &timing, false).unwrap())
    }

    #[tokio::test]
    async fn presses_run_in_submission_order() {
        let fake = FakeRelay::spawn().await.unwrap();
        fake.set_delay(Duration::from_millis(100));
        let lanes = lanes(&fake);

        let on = lanes.submit("PS5 #4", RelayAction::On);
        let off = lanes.submit("PS5 #4", RelayAction::Off);
        // Only the first press has reached the controller.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fake.presses().len(), 1);

        assert_eq!(on.await.unwrap().unwrap().action, RelayAction::On);
        assert_eq!(off.await.unwrap().unwrap().action, RelayAction::Off);
        assert_eq!(
            fake.presses(),
            vec![("on".to_string(), 40), ("off".to_string(), 60)]
        );
    }

    #[tokio::test]
    async fn dropped_reply_does_not_cancel_press() {
        let fake = FakeRelay::spawn().await.unwrap();
        fake.set_delay(Duration::from_millis(50));
        let lanes = lanes(&fake);

        drop(lanes.submit("PS5 #4", RelayAction::On));
        let off = lanes.submit("PS5 #4", RelayAction::Off);
        off.await.unwrap().unwrap();
        assert_eq!(fake.presses().len(), 2);
    }
}
