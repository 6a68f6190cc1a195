//! # conform-schema
//!
//! Declared-schema model and diff engine for the `conform`
//! reconciliation tool.
//!
//! This crate is driver-agnostic: it knows nothing about connections
//! or SQL execution. It models the two sides of a reconciliation run —
//! columns as *declared* ([`ColumnSpec`], [`SchemaDefinition`]) and
//! columns as *introspected* from a live database ([`ColumnMeta`]) —
//! and reduces both to a canonical comparison form so the differ can
//! classify every discrepancy ([`diff_table`], [`TableDiff`]).
//!
//! Declared columns arrive as free-form definition strings, exactly as
//! they would appear in a `CREATE TABLE` statement:
//!
//! ```rust
//! use conform_schema::{diff_table, ColumnSpec, SchemaDefinition};
//!
//! let schema = SchemaDefinition::new("book")
//!     .column(ColumnSpec::parse("id", "INTEGER PRIMARY KEY AUTOINCREMENT"))
//!     .column(ColumnSpec::parse("title", "TEXT NOT NULL"))
//!     .column(ColumnSpec::parse("author", "TEXT"));
//!
//! let diff = diff_table(&schema, &[]);
//! assert_eq!(diff.added, vec!["id", "title", "author"]);
//! ```

mod column;
mod diff;
mod naming;
mod schema;

pub use column::{canonical_key, ColumnSpec};
pub use diff::{diff_table, TableDiff};
pub use naming::table_name;
pub use schema::{ColumnMeta, SchemaDefinition};
