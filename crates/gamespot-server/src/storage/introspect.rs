//! Read-only schema introspection for the debug endpoint.

use std::collections::BTreeMap;

use serde::Serialize;

use super::db::{DatabaseError, KioskDatabase};

/// Tables reported by [`KioskDatabase::table_info`].
pub const INTROSPECTED_TABLES: [&str; 3] = ["ps5_consoles", "payments", "schema_version"];

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub column_type: String,
    pub notnull: bool,
    pub dflt_value: Option<String>,
    pub pk: i64,
}

impl KioskDatabase {
    /// Column layout of every introspected table, fetched concurrently.
    pub async fn table_info(&self) -> Result<BTreeMap<String, Vec<ColumnInfo>>, DatabaseError> {
        let [consoles, payments, versions] = INTROSPECTED_TABLES;
        let (a, b, c) = tokio::try_join!(
            self.columns(consoles),
            self.columns(payments),
            self.columns(versions),
        )?;
        Ok(BTreeMap::from([
            (consoles.to_string(), a),
            (payments.to_string(), b),
            (versions.to_string(), c),
        ]))
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let cols = sqlx::query_as::<_, ColumnInfo>(
            "SELECT cid, name, \"type\", \"notnull\", dflt_value, pk
             FROM pragma_table_info(?) ORDER BY cid",
        )
        .bind(table)
        .fetch_all(self.pool())
        .await?;
        Ok(cols)
    }
}
