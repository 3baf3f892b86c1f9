//! `GameSpot` kiosk server.
//!
//! - `storage`: `SQLite` session store and payment ledger
//! - `booking`: console state machine and relay side effects
//! - `api`: axum routes over the booking engine

pub mod api;
pub mod booking;
pub mod storage;
