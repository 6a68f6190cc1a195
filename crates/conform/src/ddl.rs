//! DDL statement construction and execution.
//!
//! SQLite only supports `ADD COLUMN`, `RENAME COLUMN` and `RENAME TO`
//! through `ALTER TABLE`. Dropping a column, changing its type, or
//! changing a constraint requires the table recreation strategy:
//! create a replacement table, copy the rows, drop the original, and
//! rename the replacement into place — all inside one transaction so a
//! failure at any step leaves the original table untouched.
//!
//! All SQL text is produced by [`StatementBuilder`]; identifier quoting
//! and escaping live there and nowhere else.

use conform_schema::{ColumnSpec, SchemaDefinition};
use sqlx::sqlite::SqlitePool;
use tracing::{debug, error, warn};

use crate::error::{ConformError, Result};

/// Quotes an identifier for SQLite: double quotes, embedded double
/// quotes doubled.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds the SQL text for every DDL statement the engine issues.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementBuilder;

impl StatementBuilder {
    /// Creates a new statement builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// `CREATE TABLE <table> (<col> <rawspec>, …)` in the order the
    /// columns are given. The raw declared constraint text is appended
    /// verbatim after each quoted column name.
    #[must_use]
    pub fn create_table(&self, table: &str, columns: &[&ColumnSpec]) -> String {
        let col_defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.raw))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(table),
            col_defs.join(", ")
        )
    }

    /// `ALTER TABLE <table> ADD COLUMN <col> <rawspec>`.
    #[must_use]
    pub fn add_column(&self, table: &str, column: &ColumnSpec) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_identifier(table),
            quote_identifier(&column.name),
            column.raw
        )
    }

    /// `DROP TABLE <table>`.
    #[must_use]
    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", quote_identifier(table))
    }

    /// `ALTER TABLE <old> RENAME TO <new>`.
    #[must_use]
    pub fn rename_table(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_identifier(old_name),
            quote_identifier(new_name)
        )
    }

    /// `INSERT INTO <to> (<cols>) SELECT <cols> FROM <from>` — the
    /// copy step of a rebuild. Values are copied as-is; no casting.
    #[must_use]
    pub fn copy_rows(&self, from: &str, to: &str, columns: &[String]) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        let cols = quoted.join(", ");
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quote_identifier(to),
            cols,
            cols,
            quote_identifier(from)
        )
    }
}

/// Executes DDL remediations against a live database.
#[derive(Debug, Clone)]
pub struct DdlExecutor {
    pool: SqlitePool,
    builder: StatementBuilder,
}

impl DdlExecutor {
    /// Creates a new executor over the given pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            builder: StatementBuilder::new(),
        }
    }

    /// Creates a missing table with the full declared schema, columns
    /// in declaration order.
    pub async fn create_table(&self, schema: &SchemaDefinition) -> Result<()> {
        let columns: Vec<&ColumnSpec> = schema.columns().iter().collect();
        let sql = self.builder.create_table(&schema.table_name, &columns);
        debug!(sql = %sql, "Executing CREATE TABLE");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| ConformError::CreateFailed {
                table: schema.table_name.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Adds columns one statement at a time, in the order given. Each
    /// `ADD COLUMN` is independent: a rejected statement is recorded
    /// and the remaining columns are still attempted. Returns the
    /// per-column failures (column name, engine error text).
    pub async fn add_columns(
        &self,
        table: &str,
        columns: &[&ColumnSpec],
    ) -> Vec<(String, String)> {
        let mut failures = Vec::new();
        for column in columns {
            let sql = self.builder.add_column(table, column);
            debug!(sql = %sql, "Executing ADD COLUMN");
            match sqlx::query(&sql).execute(&self.pool).await {
                Ok(_) => debug!(table = %table, column = %column.name, "Added column"),
                Err(e) => {
                    let failure = ConformError::AlterFailed {
                        table: table.to_string(),
                        column: column.name.clone(),
                        message: e.to_string(),
                    };
                    error!(error = %failure, "Add column rejected");
                    failures.push((column.name.clone(), failure.reason()));
                }
            }
        }
        failures
    }

    /// Rebuilds a table via the copy-move strategy.
    ///
    /// Inside a single transaction: create `<table>_tmp` with the
    /// declared specs of the kept columns, copy the kept columns' rows
    /// across, drop the original, and rename the replacement. Any step
    /// failing rolls the transaction back, leaving the original table
    /// byte-identical to its pre-attempt state.
    ///
    /// `kept` names the columns carried through (declared columns that
    /// already exist in the live table); columns being dropped are
    /// excluded, and newly added columns are left for a follow-up
    /// `ADD COLUMN` pass after the rebuild commits.
    pub async fn rebuild_table(&self, schema: &SchemaDefinition, kept: &[String]) -> Result<()> {
        let table = schema.table_name.as_str();
        let tmp_table = format!("{table}_tmp");
        let kept_specs: Vec<&ColumnSpec> = kept
            .iter()
            .filter_map(|name| schema.get_column(name))
            .collect();

        let statements = [
            self.builder.create_table(&tmp_table, &kept_specs),
            self.builder.copy_rows(table, &tmp_table, kept),
            self.builder.drop_table(table),
            self.builder.rename_table(&tmp_table, table),
        ];

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ConformError::RebuildFailed {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        for sql in &statements {
            debug!(sql = %sql, "Executing rebuild step");
            if let Err(step_error) = sqlx::query(sql.as_str()).execute(&mut *tx).await {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(
                        table = %table,
                        error = %rollback_error,
                        "Rollback after failed rebuild step also failed"
                    );
                }
                return Err(ConformError::RebuildFailed {
                    table: table.to_string(),
                    message: step_error.to_string(),
                });
            }
        }

        tx.commit().await.map_err(|e| ConformError::RebuildFailed {
            table: table.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Drops an orphan table.
    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = self.builder.drop_table(table);
        debug!(sql = %sql, "Executing DROP TABLE");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| ConformError::DropFailed {
                table: table.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
