//! Table diff engine.
//!
//! Compares one declared [`SchemaDefinition`] against the column
//! metadata introspected from the live table and classifies every
//! column into exactly one of four buckets.

use crate::schema::{ColumnMeta, SchemaDefinition};

/// Classified differences between a declared schema and a live table.
///
/// The four lists partition `columns(schema) ∪ columns(db)` with no
/// overlap. `added`, `changed` and `unchanged` follow declaration
/// order; `removed` follows the live table's physical column order.
/// The ordering is deterministic for reports and tests, nothing more.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDiff {
    /// Declared but absent from the live table.
    pub added: Vec<String>,
    /// Present in the live table but not declared.
    pub removed: Vec<String>,
    /// Present on both sides with differing canonical forms.
    pub changed: Vec<String>,
    /// Present on both sides with identical canonical forms.
    pub unchanged: Vec<String>,
}

impl TableDiff {
    /// Returns `true` if applying this diff requires the table
    /// recreation strategy. SQLite can add a column through
    /// `ALTER TABLE`, but cannot drop one or change its definition.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        !self.removed.is_empty() || !self.changed.is_empty()
    }

    /// Returns `true` if the live table already conforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Diffs a declared schema against introspected column metadata.
///
/// Declared columns missing from the live set are `added`; declared
/// columns whose canonical form (see [`crate::canonical_key`]) differs
/// from the live column's are `changed`; live columns not declared are
/// `removed`.
#[must_use]
pub fn diff_table(schema: &SchemaDefinition, live: &[ColumnMeta]) -> TableDiff {
    let mut diff = TableDiff::default();

    for spec in schema.columns() {
        match live.iter().find(|meta| meta.name == spec.name) {
            None => diff.added.push(spec.name.clone()),
            Some(meta) => {
                if spec.canonical_key() == meta.canonical_key() {
                    diff.unchanged.push(spec.name.clone());
                } else {
                    diff.changed.push(spec.name.clone());
                }
            }
        }
    }

    for meta in live {
        if schema.get_column(&meta.name).is_none() {
            diff.removed.push(meta.name.clone());
        }
    }

    diff
}
