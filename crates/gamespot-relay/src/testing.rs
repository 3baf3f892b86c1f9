//! In-process fake ESP32 controller for tests.
//!
//! Serves the same two endpoints as the firmware (`/relay/{action}` and
//! `/status`) on `127.0.0.1` with an ephemeral port, and records every
//! press it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::policy::PressPolicy;
use crate::target::RelayTarget;

#[derive(Default)]
struct FakeState {
    presses: Mutex<Vec<(String, u64)>>,
    status_calls: AtomicU32,
    fail_remaining: AtomicU32,
    reject_remaining: AtomicU32,
    delay_ms: AtomicU64,
}

#[derive(Deserialize)]
struct PressQuery {
    #[serde(default)]
    duration: u64,
}

/// A running fake controller. The server task stops when this is dropped.
pub struct FakeRelay {
    addr: SocketAddr,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeRelay {
    pub async fn spawn() -> std::io::Result<Self> {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/relay/{action}", get(press))
            .route("/status", get(status))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Target for `console` pointing at this fake, with the given policies.
    pub fn target(&self, console: &str, on: PressPolicy, off: PressPolicy) -> RelayTarget {
        RelayTarget {
            console: console.to_string(),
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            on,
            off,
        }
    }

    /// Answer the next `n` presses with HTTP 500.
    pub fn fail_next(&self, n: u32) {
        self.state.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Answer the next `n` presses with `{"success": false}`.
    pub fn reject_next(&self, n: u32) {
        self.state.reject_remaining.store(n, Ordering::SeqCst);
    }

    /// Hold every reply for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// `(action, duration_ms)` of every press received so far.
    pub fn presses(&self) -> Vec<(String, u64)> {
        self.state
            .presses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status_calls(&self) -> u32 {
        self.state.status_calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakeRelay {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

async fn hold(state: &FakeState) {
    let ms = state.delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

async fn press(
    State(state): State<Arc<FakeState>>,
    Path(action): Path<String>,
    Query(query): Query<PressQuery>,
) -> Response {
    state
        .presses
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((action.clone(), query.duration));
    hold(&state).await;

    if take_one(&state.fail_remaining) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "relay busy").into_response();
    }
    if take_one(&state.reject_remaining) {
        return Json(json!({ "success": false, "error": "gpio busy" })).into_response();
    }
    Json(json!({ "success": true, "action": action, "duration": query.duration })).into_response()
}

async fn status(State(state): State<Arc<FakeState>>) -> Response {
    state.status_calls.fetch_add(1, Ordering::SeqCst);
    hold(&state).await;
    Json(json!({ "relay": "idle", "gpio": 5 })).into_response()
}
