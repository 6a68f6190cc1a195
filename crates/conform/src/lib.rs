//! Schema reconciliation for SQLite databases.
//!
//! `conform` brings a live SQLite database into conformance with a
//! declared set of table schemas, issuing the minimal DDL needed:
//!
//! - **Introspector** — reads live structure from `sqlite_master` and
//!   `PRAGMA table_info`.
//! - **Differ** (in `conform-schema`) — classifies each column as
//!   added, removed, changed, or unchanged under a canonical
//!   comparison form.
//! - **DDL executor** — additive `ALTER TABLE ADD COLUMN` where SQLite
//!   allows it; a transactional table rebuild (copy-move) where it
//!   does not; raw `CREATE TABLE` for missing tables; `DROP TABLE` for
//!   orphans on request.
//! - **Reconciler** — drives the run table-by-table and aggregates a
//!   per-table report with an overall pass/fail status.
//!
//! SQLite cannot drop a column, change its type, or change its
//! constraints through `ALTER TABLE`, so those changes are applied by
//! creating a replacement table, copying the rows across, dropping the
//! original, and renaming the replacement — all inside one transaction
//! that rolls back on any failure, leaving the original table intact.
//!
//! # Example
//!
//! ```rust,ignore
//! use conform::prelude::*;
//! use sqlx::sqlite::SqlitePoolOptions;
//!
//! let pool = SqlitePoolOptions::new()
//!     .max_connections(1)
//!     .connect("sqlite:app.db")
//!     .await?;
//!
//! let schemas = load_manifest(Path::new("schema.json"))?;
//! let report = Reconciler::new(pool).run(&schemas).await?;
//! assert!(report.ok());
//! ```
//!
//! The database itself is the only durable state: its catalog is read
//! fresh on every run and no history table, lock file, or side file is
//! ever written.

pub mod ddl;
pub mod error;
pub mod introspect;
pub mod manifest;
pub mod reconcile;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::ddl::{DdlExecutor, StatementBuilder};
    pub use crate::error::{ConformError, Result};
    pub use crate::introspect::Introspector;
    pub use crate::manifest::{load_manifest, parse_manifest};
    pub use crate::reconcile::{
        OrphanAction, OrphanReport, ReconcileOptions, Reconciler, RunReport, TableOutcome,
        TableReport,
    };
    pub use conform_schema::{
        canonical_key, diff_table, table_name, ColumnMeta, ColumnSpec, SchemaDefinition, TableDiff,
    };
}
