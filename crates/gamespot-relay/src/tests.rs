//! Relay client tests against the in-process fake controller.

use std::time::Duration;

use gamespot_core::RelayTiming;

use crate::client::{RelayClient, RelayError};
use crate::policy::PressPolicy;
use crate::target::{RelayAction, RelayTarget};
use crate::testing::FakeRelay;

fn timing() -> RelayTiming {
    RelayTiming {
        timeout_buffer_ms: 500,
        retry_delay_ms: 10,
        status_timeout_ms: 500,
    }
}

fn on_policy() -> PressPolicy {
    PressPolicy::with_fallback(40, 20, Duration::from_millis(10))
}

fn off_policy() -> PressPolicy {
    PressPolicy::single(60)
}

fn live_client(targets: Vec<RelayTarget>) -> RelayClient {
    RelayClient::with_targets(targets, &timing(), false).unwrap()
}

/// A port nothing is listening on.
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// =============================================================================
// Simulated mode
// =============================================================================

#[tokio::test]
async fn test_mode_never_touches_the_network() {
    let fake = FakeRelay::spawn().await.unwrap();
    let client = RelayClient::with_targets(
        vec![fake.target("PS5 #4", on_policy(), off_policy())],
        &timing(),
        true,
    )
    .unwrap();

    let resp = client.power("PS5 #4", RelayAction::On).await.unwrap();
    assert!(resp.simulated);
    assert_eq!(resp.attempts, 0);
    assert!(fake.presses().is_empty());
    assert!(!client.is_live("PS5 #4"));
}

#[tokio::test]
async fn console_without_target_is_simulated_in_live_mode() {
    let client = live_client(Vec::new());
    let resp = client.power("PS5 #1", RelayAction::Off).await.unwrap();
    assert!(resp.simulated);
    assert_eq!(resp.console, "PS5 #1");
    assert_eq!(resp.action, RelayAction::Off);
}

#[tokio::test]
async fn simulated_and_live_responses_share_a_shape() {
    let fake = FakeRelay::spawn().await.unwrap();
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    let live = client.power("PS5 #4", RelayAction::On).await.unwrap();
    let sim = client.power("PS5 #1", RelayAction::On).await.unwrap();
    let live = serde_json::to_value(live).unwrap();
    let sim = serde_json::to_value(sim).unwrap();

    let keys = |v: &serde_json::Value| {
        let mut k: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        k.sort();
        k
    };
    assert_eq!(keys(&live), keys(&sim));
    assert_eq!(live["simulated"], false);
    assert_eq!(sim["simulated"], true);
}

// =============================================================================
// Press policy
// =============================================================================

#[tokio::test]
async fn on_succeeds_on_first_attempt() {
    let fake = FakeRelay::spawn().await.unwrap();
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    let resp = client.power("PS5 #4", RelayAction::On).await.unwrap();
    assert!(!resp.simulated);
    assert_eq!(resp.attempts, 1);
    assert_eq!(resp.pulse_ms, Some(40));
    assert_eq!(resp.device["success"], true);
    assert_eq!(fake.presses(), vec![("on".to_string(), 40)]);
}

#[tokio::test]
async fn on_retries_once_with_fallback_after_http_error() {
    let fake = FakeRelay::spawn().await.unwrap();
    fake.fail_next(1);
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    let resp = client.power("PS5 #4", RelayAction::On).await.unwrap();
    assert_eq!(resp.attempts, 2);
    assert_eq!(resp.pulse_ms, Some(20));
    assert_eq!(
        fake.presses(),
        vec![("on".to_string(), 40), ("on".to_string(), 20)]
    );
}

#[tokio::test]
async fn on_retries_after_controller_rejects() {
    let fake = FakeRelay::spawn().await.unwrap();
    fake.reject_next(1);
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    let resp = client.power("PS5 #4", RelayAction::On).await.unwrap();
    assert_eq!(resp.attempts, 2);
}

#[tokio::test]
async fn on_gives_up_after_two_attempts() {
    let fake = FakeRelay::spawn().await.unwrap();
    fake.fail_next(5);
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    let err = client.power("PS5 #4", RelayAction::On).await.unwrap_err();
    assert!(matches!(err, RelayError::Device { status: 500, .. }));
    assert_eq!(fake.presses().len(), 2);
}

#[tokio::test]
async fn off_is_never_retried() {
    let fake = FakeRelay::spawn().await.unwrap();
    fake.fail_next(1);
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    let err = client.power("PS5 #4", RelayAction::Off).await.unwrap_err();
    assert!(matches!(err, RelayError::Device { .. }));
    assert_eq!(fake.presses(), vec![("off".to_string(), 60)]);
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn slow_controller_times_out() {
    let fake = FakeRelay::spawn().await.unwrap();
    fake.set_delay(Duration::from_secs(2));
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);
    let target = client.target("PS5 #4").unwrap().clone();

    let err = client.press(&target, RelayAction::Off, 60).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err}");
    // 60 ms pulse + 500 ms buffer
    assert!(matches!(err, RelayError::Timeout { timeout_ms: 560, .. }));
}

#[tokio::test]
async fn delay_shorter_than_pulse_plus_buffer_is_not_a_timeout() {
    let fake = FakeRelay::spawn().await.unwrap();
    fake.set_delay(Duration::from_millis(300));
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);
    let target = client.target("PS5 #4").unwrap().clone();

    assert!(client.press(&target, RelayAction::Off, 60).await.is_ok());
}

#[tokio::test]
async fn unreachable_controller_is_a_network_error() {
    let port = closed_port().await;
    let target = RelayTarget {
        console: "PS5 #4".into(),
        host: "127.0.0.1".into(),
        port,
        on: on_policy(),
        off: off_policy(),
    };
    let client = live_client(vec![target.clone()]);

    let err = client.press(&target, RelayAction::On, 40).await.unwrap_err();
    assert!(matches!(err, RelayError::Network { .. }), "got {err}");
}

// =============================================================================
// Status snapshot
// =============================================================================

#[tokio::test]
async fn snapshot_reports_online_and_offline_in_config_order() {
    let fake = FakeRelay::spawn().await.unwrap();
    let port = closed_port().await;
    let dead = RelayTarget {
        console: "PS5 #1".into(),
        host: "127.0.0.1".into(),
        port,
        on: on_policy(),
        off: off_policy(),
    };
    let client = live_client(vec![dead, fake.target("PS5 #4", on_policy(), off_policy())]);

    let rows = client.snapshot().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].console, "PS5 #1");
    assert_eq!(rows[0].status, "offline");
    assert!(rows[0].error.is_some());
    assert_eq!(rows[1].console, "PS5 #4");
    assert_eq!(rows[1].status, "online");
    assert_eq!(rows[1].device.as_ref().unwrap()["relay"], "idle");
    assert_eq!(fake.status_calls(), 1);
}

#[tokio::test]
async fn snapshot_in_test_mode_is_simulated() {
    let fake = FakeRelay::spawn().await.unwrap();
    let client = RelayClient::with_targets(
        vec![fake.target("PS5 #4", on_policy(), off_policy())],
        &timing(),
        true,
    )
    .unwrap();

    let rows = client.snapshot().await;
    assert_eq!(rows[0].status, "simulated");
    assert_eq!(fake.status_calls(), 0);
}

#[tokio::test]
async fn slowest_press_covers_fallback_retry() {
    let fake = FakeRelay::spawn().await.unwrap();
    let client = live_client(vec![fake.target("PS5 #4", on_policy(), off_policy())]);

    // on: 40 + 500, 10 delay, 20 + 500. off: 60 + 500.
    let (console, worst) = client.slowest_press().unwrap();
    assert_eq!(console, "PS5 #4");
    assert_eq!(worst, Duration::from_millis(1_070));

    assert!(live_client(Vec::new()).slowest_press().is_none());
}
