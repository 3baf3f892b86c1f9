//! `GameSpot` relay client.
//!
//! Drives ESP32 relay controllers that hold a console's power-button contact
//! closed for a given pulse duration:
//! - `RelayTarget` / `PressPolicy`: static per-console wiring and retry policy
//! - `RelayClient`: bounded-timeout HTTP calls, simulated mode, status fan-out

mod client;
mod policy;
mod target;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests;

pub use client::{
    ControllerStatus, DeviceReply, RelayClient, RelayError, RelayResponse, RelayStatus,
};
pub use policy::PressPolicy;
pub use target::{ParseActionError, RelayAction, RelayTarget};
