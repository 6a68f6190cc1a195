//! Declared table schemas and introspected column metadata.

use serde::{Deserialize, Serialize};

use crate::column::{canonical_key, ColumnSpec};

/// A declared table schema: an ordered, name-unique set of column
/// specifications.
///
/// Declaration order is significant — it drives the column order of
/// generated `CREATE TABLE` statements. Definitions are built once per
/// reconciliation run from the loader's output and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Table name (already resolved from the entity name).
    pub table_name: String,
    /// Column specifications in declaration order.
    columns: Vec<ColumnSpec>,
}

impl SchemaDefinition {
    /// Creates an empty schema definition for the given table.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column. A column with the same name replaces the earlier
    /// entry in place, keeping names unique and order stable.
    #[must_use]
    pub fn column(mut self, spec: ColumnSpec) -> Self {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == spec.name) {
            *existing = spec;
        } else {
            self.columns.push(spec);
        }
        self
    }

    /// Convenience: parses and adds a column from its raw definition.
    #[must_use]
    pub fn parse_column(self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.column(ColumnSpec::parse(name, raw))
    }

    /// Columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of declared columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if no columns are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A column as introspected from the live database.
///
/// Re-fetched fresh at the start of processing each table and discarded
/// once the table's diff is computed; the catalog is the only durable
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Declared type as stored in the catalog.
    pub type_name: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default value text as the catalog reports it.
    pub default: Option<String>,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl ColumnMeta {
    /// Returns the canonical comparison key for this column.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        canonical_key(
            &self.type_name,
            self.nullable,
            self.default.as_deref(),
            self.primary_key,
        )
    }
}
