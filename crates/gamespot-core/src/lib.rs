//! `GameSpot` Core Library
//!
//! Shared functionality for `GameSpot` kiosk components:
//! - `SQLite` pool helpers and the shared `DatabaseError`
//! - Site configuration (console roster, relay table, relay timing)
//! - Wall-clock helpers
//! - Tracing initialisation

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod tracing_init;

pub use config::{RelayTargetConfig, RelayTiming, SiteConfig};
pub use error::{Error, Result};
