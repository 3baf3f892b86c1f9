//! Console roster and session state queries.

use gamespot_core::time::session_end;
use sqlx::SqliteConnection;
use tracing::debug;

use super::db::{DatabaseError, KioskDatabase};
use super::models::{Console, ConsoleRow};

const SELECT_CONSOLE: &str =
    "SELECT name, COALESCE(booked, 0) AS booked, end_time FROM ps5_consoles";

impl KioskDatabase {
    /// Insert any roster names that are missing. Existing rows are left
    /// untouched, so seeding on every start is safe.
    pub async fn seed_roster(&self, names: &[String]) -> Result<u64, DatabaseError> {
        let mut inserted = 0;
        for name in names {
            inserted += sqlx::query(
                "INSERT OR IGNORE INTO ps5_consoles (name, booked, end_time) VALUES (?, 0, NULL)",
            )
            .bind(name)
            .execute(self.pool())
            .await?
            .rows_affected();
        }
        debug!(inserted, total = names.len(), "Seeded console roster");
        Ok(inserted)
    }

    /// All consoles in roster order.
    pub async fn list_consoles(&self) -> Result<Vec<Console>, DatabaseError> {
        let rows = sqlx::query_as::<_, ConsoleRow>(&format!(
            "{SELECT_CONSOLE} WHERE name IS NOT NULL ORDER BY id"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Console::from).collect())
    }

    pub async fn get_console(&self, name: &str) -> Result<Console, DatabaseError> {
        sqlx::query_as::<_, ConsoleRow>(&format!("{SELECT_CONSOLE} WHERE name = ?"))
            .bind(name)
            .fetch_optional(self.pool())
            .await?
            .map(Console::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("Console {name}")))
    }

    /// Book a free console for `minutes` starting at `now_ms`.
    ///
    /// A single conditional update: of any number of concurrent callers,
    /// exactly one sees `Some(end_time)`. `None` means the console was
    /// already booked.
    pub async fn try_book(
        &self,
        name: &str,
        minutes: u32,
        now_ms: i64,
    ) -> Result<Option<i64>, DatabaseError> {
        let end_time = session_end(now_ms, minutes);
        let affected = sqlx::query(
            "UPDATE ps5_consoles SET booked = 1, end_time = ? WHERE name = ? AND booked = 0",
        )
        .bind(end_time)
        .bind(name)
        .execute(self.pool())
        .await?
        .rows_affected();

        if affected == 1 {
            return Ok(Some(end_time));
        }
        // Nothing matched: either the name is unknown or the console is taken.
        self.get_console(name).await?;
        Ok(None)
    }

    /// Book a console regardless of its current state.
    pub async fn force_book(
        &self,
        name: &str,
        minutes: u32,
        now_ms: i64,
    ) -> Result<i64, DatabaseError> {
        let end_time = session_end(now_ms, minutes);
        let mut conn = self.pool().acquire().await?;
        book_unconditionally(&mut conn, name, end_time).await?;
        Ok(end_time)
    }

    /// Free one console.
    pub async fn reset_console(&self, name: &str) -> Result<(), DatabaseError> {
        let affected =
            sqlx::query("UPDATE ps5_consoles SET booked = 0, end_time = NULL WHERE name = ?")
                .bind(name)
                .execute(self.pool())
                .await?
                .rows_affected();
        if affected == 0 {
            return Err(DatabaseError::NotFound(format!("Console {name}")));
        }
        Ok(())
    }

    /// Free every console. Returns the number of rows touched.
    pub async fn reset_all_consoles(&self) -> Result<u64, DatabaseError> {
        let affected = sqlx::query("UPDATE ps5_consoles SET booked = 0, end_time = NULL")
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(affected)
    }
}

/// Mark `name` booked until `end_time`, overwriting any running session.
pub(super) async fn book_unconditionally(
    conn: &mut SqliteConnection,
    name: &str,
    end_time: i64,
) -> Result<(), DatabaseError> {
    let affected = sqlx::query("UPDATE ps5_consoles SET booked = 1, end_time = ? WHERE name = ?")
        .bind(end_time)
        .bind(name)
        .execute(conn)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(DatabaseError::NotFound(format!("Console {name}")));
    }
    Ok(())
}
