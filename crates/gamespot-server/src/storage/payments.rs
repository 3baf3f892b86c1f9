//! Payment ledger queries.

use gamespot_core::time::session_end;
use sqlx::SqliteConnection;

use super::consoles::book_unconditionally;
use super::db::{DatabaseError, KioskDatabase};
use super::models::{PaidSession, PaymentRecord, PaymentRow};
use super::photo;

/// A payment about to be written.
#[derive(Debug, Clone, Copy)]
pub struct NewPayment<'a> {
    pub console: &'a str,
    pub minutes: u32,
    pub method: &'a str,
    pub user: &'a str,
    /// Raw photo from the client; normalised before storage.
    pub photo: Option<&'a str>,
}

impl KioskDatabase {
    /// Append a payment without touching console state.
    pub async fn record_payment(&self, payment: NewPayment<'_>) -> Result<i64, DatabaseError> {
        let photo_data = photo::normalize(payment.photo);
        let mut conn = self.pool().acquire().await?;
        insert_payment(&mut conn, &payment, photo_data.as_deref()).await
    }

    /// Record a payment and book its console in one transaction.
    ///
    /// The console is booked unconditionally, overwriting any running
    /// session. If the console does not exist nothing is written.
    pub async fn record_paid_session(
        &self,
        payment: NewPayment<'_>,
        now_ms: i64,
    ) -> Result<PaidSession, DatabaseError> {
        let photo_data = photo::normalize(payment.photo);
        let end_time = session_end(now_ms, payment.minutes);

        let mut tx = self.pool().begin().await?;
        let payment_id = insert_payment(&mut tx, &payment, photo_data.as_deref()).await?;
        if let Err(e) = book_unconditionally(&mut tx, payment.console, end_time).await {
            tx.rollback().await?;
            return Err(e);
        }
        tx.commit().await?;

        Ok(PaidSession {
            payment_id,
            end_time,
            photo_saved: photo_data.is_some(),
        })
    }

    /// Every payment, most recent first.
    pub async fn list_payments(&self) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT id,
                    COALESCE(console, '') AS console,
                    COALESCE(minutes, 0) AS minutes,
                    COALESCE(method, '') AS method,
                    COALESCE(user, '') AS user,
                    CAST(paid_at AS TEXT) AS paid_at,
                    photo_data
             FROM payments
             ORDER BY paid_at DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(PaymentRecord::from).collect())
    }
}

async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &NewPayment<'_>,
    photo_data: Option<&str>,
) -> Result<i64, DatabaseError> {
    let id = sqlx::query(
        "INSERT INTO payments (console, minutes, method, user, photo_data) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(payment.console)
    .bind(i64::from(payment.minutes))
    .bind(payment.method)
    .bind(payment.user)
    .bind(photo_data)
    .execute(conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}
