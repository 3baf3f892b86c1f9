//! Database handle for the kiosk.

use std::path::Path;

use sqlx::{Pool, Sqlite};
use tracing::info;

pub use gamespot_core::db::DatabaseError;

use super::migrations;

/// Shared handle to the kiosk database. Cheap to clone.
#[derive(Clone)]
pub struct KioskDatabase {
    pool: Pool<Sqlite>,
}

impl KioskDatabase {
    /// Open or create a database at the given path and bring its schema
    /// up to date.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = gamespot_core::db::open_pool(path).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let pool = gamespot_core::db::open_pool_in_memory().await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let applied = migrations::run(&self.pool).await?;
        info!(applied, "Kiosk database migrations complete");
        Ok(())
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
