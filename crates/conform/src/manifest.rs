//! Schema manifest loading.
//!
//! The manifest is a JSON document mapping entity names to ordered
//! column definitions:
//!
//! ```json
//! {
//!     "Book": {
//!         "id": "INTEGER PRIMARY KEY AUTOINCREMENT",
//!         "title": "TEXT NOT NULL",
//!         "author": "TEXT"
//!     }
//! }
//! ```
//!
//! Column order follows document order and each value is an
//! engine-native type keyword plus free-form constraint text. Entity
//! names are resolved to table names (`BookList` → `book_list`) before
//! the definitions reach the engine.

use std::path::Path;

use conform_schema::{table_name, ColumnSpec, SchemaDefinition};
use serde_json::Value;
use tracing::debug;

use crate::error::{ConformError, Result};

/// Loads schema definitions from a JSON manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<SchemaDefinition>> {
    let text = std::fs::read_to_string(path)?;
    parse_manifest(&text)
}

/// Parses manifest text into schema definitions, preserving the
/// document's entity and column order.
pub fn parse_manifest(text: &str) -> Result<Vec<SchemaDefinition>> {
    let root: serde_json::Map<String, Value> = serde_json::from_str(text)?;

    let mut schemas = Vec::with_capacity(root.len());
    for (entity, value) in root {
        let Value::Object(columns) = value else {
            return Err(ConformError::Manifest(format!(
                "entity '{entity}' must map column names to definition strings"
            )));
        };
        let table = table_name(&entity);
        debug!(entity = %entity, table = %table, columns = columns.len(), "Loaded entity");

        let mut schema = SchemaDefinition::new(table);
        for (column, definition) in columns {
            let Value::String(raw) = definition else {
                return Err(ConformError::Manifest(format!(
                    "column '{entity}.{column}' must be a definition string"
                )));
            };
            schema = schema.column(ColumnSpec::parse(column, raw));
        }
        schemas.push(schema);
    }
    Ok(schemas)
}
