//! Live-database introspection.
//!
//! Reads the table list from `sqlite_master` and per-table column
//! metadata from `PRAGMA table_info`. Every query is read-only and
//! fully materialized before returning, so no read cursor is held open
//! while DDL runs against the same table — SQLite refuses to drop or
//! alter a table that still has an open statement on it.

use conform_schema::ColumnMeta;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

use crate::ddl::quote_identifier;
use crate::error::{ConformError, Result};

/// Reads the current structure of a live database.
#[derive(Debug, Clone)]
pub struct Introspector {
    pool: SqlitePool,
}

impl Introspector {
    /// Creates a new introspector over the given pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns every table name in the catalog, including
    /// engine-internal `sqlite_*` tables. Callers filter those before
    /// any destructive operation.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Probes whether a table exists. Absence is the expected,
    /// non-error case — it signals that the table must be created.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Returns column metadata in the table's physical column order.
    ///
    /// Fails with [`ConformError::Introspection`] if the table does not
    /// exist — typically a table that vanished between calls, a benign
    /// race the caller resolves by re-checking [`Self::table_exists`].
    pub async fn columns_of(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        if rows.is_empty() && !self.table_exists(table).await? {
            return Err(ConformError::Introspection {
                table: table.to_string(),
                message: "table does not exist".to_string(),
            });
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let column = ColumnMeta {
                name: row.try_get::<String, _>("name")?,
                type_name: row.try_get::<String, _>("type")?,
                nullable: row.try_get::<i64, _>("notnull")? == 0,
                default: row.try_get::<Option<String>, _>("dflt_value")?,
                primary_key: row.try_get::<i64, _>("pk")? > 0,
            };
            debug!(
                table = %table,
                column = %column.name,
                key = %column.canonical_key(),
                "Introspected column"
            );
            columns.push(column);
        }
        Ok(columns)
    }
}
