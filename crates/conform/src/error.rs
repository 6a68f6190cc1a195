//! Error types for the reconciliation engine.

/// Errors that can occur while reconciling a database.
#[derive(Debug, thiserror::Error)]
pub enum ConformError {
    /// Database error from the underlying driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A metadata query failed (e.g. the table vanished mid-run).
    #[error("Introspection failed for table '{table}': {message}")]
    Introspection {
        /// The table being introspected.
        table: String,
        /// Underlying engine error text.
        message: String,
    },

    /// Table creation statement rejected by the engine.
    #[error("Failed to create table '{table}': {message}")]
    CreateFailed {
        /// The table being created.
        table: String,
        /// Underlying engine error text.
        message: String,
    },

    /// A single add-column statement was rejected. Non-fatal: other
    /// columns of the same table are still processed.
    #[error("Failed to add column '{column}' to table '{table}': {message}")]
    AlterFailed {
        /// The table being altered.
        table: String,
        /// The column that could not be added.
        column: String,
        /// Underlying engine error text.
        message: String,
    },

    /// A step of the transactional rebuild failed. The transaction was
    /// rolled back and the original table is preserved.
    #[error("Failed to rebuild table '{table}': {message}")]
    RebuildFailed {
        /// The table being rebuilt.
        table: String,
        /// Underlying engine error text.
        message: String,
    },

    /// Orphan table removal rejected by the engine.
    #[error("Failed to drop table '{table}': {message}")]
    DropFailed {
        /// The table being dropped.
        table: String,
        /// Underlying engine error text.
        message: String,
    },

    /// IO error reading the schema manifest.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The schema manifest is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The schema manifest parsed but has the wrong shape.
    #[error("Invalid schema manifest: {0}")]
    Manifest(String),

    /// The orphan exclusion pattern is not a valid regex.
    #[error("Invalid exclusion pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ConformError {
    /// Returns the underlying engine error text for failure variants,
    /// or the full display form otherwise. Used when folding errors
    /// into per-table report reasons.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Introspection { message, .. }
            | Self::CreateFailed { message, .. }
            | Self::AlterFailed { message, .. }
            | Self::RebuildFailed { message, .. }
            | Self::DropFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ConformError>;
