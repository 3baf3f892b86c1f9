//! Data models for kiosk storage.

use serde::Serialize;

use gamespot_core::time::remaining_millis;

/// Raw `ps5_consoles` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConsoleRow {
    pub name: String,
    pub booked: i64,
    pub end_time: Option<i64>,
}

/// A console and its current session.
///
/// `session_end` is `Some` exactly when the console is booked, so the two
/// halves of the stored pair can never disagree once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Console {
    pub name: String,
    pub session_end: Option<i64>,
}

impl Console {
    pub const fn booked(&self) -> bool {
        self.session_end.is_some()
    }

    /// Milliseconds left in the session, clamped at zero; `None` when free.
    ///
    /// Zero means the session expired and the console is waiting for a reset.
    pub fn remaining_time(&self, now_ms: i64) -> Option<i64> {
        self.session_end.map(|end| remaining_millis(end, now_ms))
    }
}

impl From<ConsoleRow> for Console {
    fn from(row: ConsoleRow) -> Self {
        Self {
            name: row.name,
            session_end: if row.booked != 0 { row.end_time } else { None },
        }
    }
}

/// Raw `payments` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub console: String,
    pub minutes: i64,
    pub method: String,
    pub user: String,
    pub paid_at: String,
    pub photo_data: Option<String>,
}

/// A ledger entry as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: i64,
    pub console: String,
    pub minutes: i64,
    pub method: String,
    pub user: String,
    pub paid_at: String,
    /// Photo receipt as an image data URL.
    pub photo_url: Option<String>,
    pub photo_saved: bool,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        let photo_url = super::photo::normalize(row.photo_data.as_deref());
        Self {
            id: row.id,
            console: row.console,
            minutes: row.minutes,
            method: row.method,
            user: row.user,
            paid_at: row.paid_at,
            photo_saved: photo_url.is_some(),
            photo_url,
        }
    }
}

/// Result of the atomic pay-and-book transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaidSession {
    pub payment_id: i64,
    pub end_time: i64,
    pub photo_saved: bool,
}
