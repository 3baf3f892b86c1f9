//! `SQLite` storage for the kiosk.
//!
//! Holds the console roster with its booking state (the session store) and
//! the append-only payment ledger, plus schema versioning.

mod consoles;
mod db;
mod introspect;
mod migrations;
mod models;
mod payments;
pub mod photo;


pub use db::{DatabaseError, KioskDatabase};
pub use introspect::{ColumnInfo, INTROSPECTED_TABLES};
pub use migrations::SCHEMA_VERSION;
pub use models::*;
pub use payments::NewPayment;
