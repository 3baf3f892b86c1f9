//! Versioned schema migrations.
//!
//! Applied versions are recorded in `schema_version`; each pending step
//! runs in its own transaction together with its version row. Databases
//! created by earlier kiosk builds have the tables but no version rows, so
//! every step must tolerate finding its table already present.

use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::info;

use super::db::DatabaseError;

/// Latest schema version.
pub const SCHEMA_VERSION: i64 = 3;

const STEPS: [(i64, &str); 3] = [
    (1, "console roster"),
    (2, "payment ledger with photo column"),
    (3, "repair booked/end_time pairing"),
];

/// Apply pending migrations. Returns how many were applied.
pub(super) async fn run(pool: &Pool<Sqlite>) -> Result<usize, DatabaseError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .map_err(migration_error)?;

    let (current,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(migration_error)?;

    let mut applied = 0;
    for (version, description) in STEPS.into_iter().filter(|(v, _)| *v > current) {
        let mut tx = pool.begin().await.map_err(migration_error)?;
        apply(&mut *tx, version).await?;
        sqlx::query("INSERT INTO schema_version (version, description) VALUES (?, ?)")
            .bind(version)
            .bind(description)
            .execute(&mut *tx)
            .await
            .map_err(migration_error)?;
        tx.commit().await.map_err(migration_error)?;

        info!(version, description, "Applied schema migration");
        applied += 1;
    }
    Ok(applied)
}

async fn apply(conn: &mut SqliteConnection, version: i64) -> Result<(), DatabaseError> {
    let result = match version {
        1 => create_consoles(conn).await,
        2 => payments_with_photo(conn).await,
        3 => repair_booking_pairs(conn).await,
        other => {
            return Err(DatabaseError::Migration(format!(
                "no migration step for version {other}"
            )));
        }
    };
    result.map_err(migration_error)
}

async fn create_consoles(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ps5_consoles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE,
            booked INTEGER DEFAULT 0,
            end_time INTEGER
        )",
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_payments(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            console TEXT,
            minutes INTEGER,
            method TEXT,
            user TEXT,
            paid_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            photo_data TEXT
        )",
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Create `payments`, or rebuild a legacy table that predates `photo_data`.
async fn payments_with_photo(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'payments'",
    )
    .fetch_optional(&mut *conn)
    .await?;

    if existing.is_none() {
        return create_payments(conn).await;
    }

    let columns: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info('payments')")
        .fetch_all(&mut *conn)
        .await?;
    if columns.iter().any(|(name,)| name == "photo_data") {
        return Ok(());
    }

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
        .fetch_one(&mut *conn)
        .await?;
    info!(rows, "Legacy payments table has no photo column, rebuilding");

    sqlx::query(
        "CREATE TEMP TABLE payments_backup AS
         SELECT id, console, minutes, method, user, paid_at FROM payments",
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query("DROP TABLE payments").execute(&mut *conn).await?;
    create_payments(conn).await?;
    sqlx::query(
        "INSERT INTO payments (id, console, minutes, method, user, paid_at)
         SELECT id, console, minutes, method, user, COALESCE(paid_at, CURRENT_TIMESTAMP)
         FROM payments_backup",
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query("DROP TABLE payments_backup")
        .execute(&mut *conn)
        .await?;

    info!(rows, "Legacy payments restored");
    Ok(())
}

/// `end_time` is set exactly when `booked` is; older builds could leave
/// either half behind.
async fn repair_booking_pairs(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ps5_consoles SET booked = 0 WHERE booked IS NULL")
        .execute(&mut *conn)
        .await?;

    let cleared = sqlx::query(
        "UPDATE ps5_consoles SET end_time = NULL WHERE booked = 0 AND end_time IS NOT NULL",
    )
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let unbooked = sqlx::query(
        "UPDATE ps5_consoles SET booked = 0 WHERE booked <> 0 AND end_time IS NULL",
    )
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let normalised = sqlx::query("UPDATE ps5_consoles SET booked = 1 WHERE booked NOT IN (0, 1)")
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if cleared + unbooked + normalised > 0 {
        info!(cleared, unbooked, normalised, "Repaired console booking rows");
    }
    Ok(())
}

fn migration_error(e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Migration(e.to_string())
}
