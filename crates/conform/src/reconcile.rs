//! Reconciliation orchestrator.
//!
//! Drives a full run: one pass over the declared schemas, dispatching
//! each table to the DDL executor, then one pass over the live tables
//! that no declared schema produced (the orphans). Failures on one
//! table never abort processing of the others; they are folded into
//! the per-table report and surface in the aggregate [`RunReport::ok`].

use std::collections::HashSet;

use conform_schema::{diff_table, ColumnSpec, SchemaDefinition};
use regex::Regex;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, error, info};

use crate::ddl::DdlExecutor;
use crate::error::{ConformError, Result};
use crate::introspect::Introspector;

/// Orphan tables matching this pattern are engine-internal and never
/// eligible for removal.
pub const SYSTEM_TABLE_PATTERN: &str = "^sqlite_";

/// Options for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Drop live tables that no declared schema produces.
    pub drop_orphans: bool,
    /// Orphans matching this pattern are reported but never dropped.
    pub exclude_pattern: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            drop_orphans: false,
            exclude_pattern: SYSTEM_TABLE_PATTERN.to_string(),
        }
    }
}

/// Outcome of reconciling one declared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    /// The table did not exist and was created.
    Created,
    /// The live table already matches the declared schema.
    UpToDate,
    /// Missing columns were added in place.
    Altered {
        /// Columns that were added (declared order).
        added: Vec<String>,
    },
    /// The table was rebuilt via the copy-move strategy.
    Rebuilt,
    /// Table creation was rejected by the engine.
    CreateFailed {
        /// Underlying engine error text.
        reason: String,
    },
    /// The rebuild failed and was rolled back; the original table is
    /// intact.
    RebuildFailed {
        /// Underlying engine error text.
        reason: String,
    },
    /// Metadata could not be read for this table.
    IntrospectionFailed {
        /// Underlying engine error text.
        reason: String,
    },
}

impl TableOutcome {
    /// Returns `true` for the failure outcomes.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed { .. }
                | Self::RebuildFailed { .. }
                | Self::IntrospectionFailed { .. }
        )
    }
}

/// Report for one declared table.
#[derive(Debug, Clone)]
pub struct TableReport {
    /// Table name.
    pub table: String,
    /// What the run did to it.
    pub outcome: TableOutcome,
    /// Add-column statements that failed: (column, engine error text).
    /// Non-fatal for the table, but fails the aggregate.
    pub add_failures: Vec<(String, String)>,
}

/// What happened to an orphan table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrphanAction {
    /// Reported and left intact (drop not requested).
    Kept,
    /// Matched the system-table exclusion pattern; never dropped.
    Excluded,
    /// Dropped on request.
    Dropped,
    /// Drop was requested but rejected by the engine.
    DropFailed {
        /// Underlying engine error text.
        reason: String,
    },
}

/// Report for one orphan table.
#[derive(Debug, Clone)]
pub struct OrphanReport {
    /// Table name.
    pub table: String,
    /// What the run did with it.
    pub action: OrphanAction,
}

/// Aggregate result of a reconciliation run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One report per declared table, in declaration order.
    pub tables: Vec<TableReport>,
    /// One report per orphan table, in catalog order.
    pub orphans: Vec<OrphanReport>,
}

impl RunReport {
    /// Returns `true` iff no table entered a failed state, no
    /// add-column statement failed, and no requested drop failed.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.tables
            .iter()
            .all(|t| !t.outcome.is_failure() && t.add_failures.is_empty())
            && self
                .orphans
                .iter()
                .all(|o| !matches!(o.action, OrphanAction::DropFailed { .. }))
    }

    /// Orphan table names, regardless of what was done with them.
    #[must_use]
    pub fn orphan_tables(&self) -> Vec<&str> {
        self.orphans.iter().map(|o| o.table.as_str()).collect()
    }
}

/// Reconciles a live database with a set of declared schemas.
///
/// One connection pool, one table at a time: introspection for a table
/// is fully materialized before any DDL runs against it, and the
/// engine assumes exclusive access to the database for the duration of
/// the run (no inter-process locking is attempted).
#[derive(Debug)]
pub struct Reconciler {
    introspector: Introspector,
    executor: DdlExecutor,
    options: ReconcileOptions,
}

impl Reconciler {
    /// Creates a reconciler with default options.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            introspector: Introspector::new(pool.clone()),
            executor: DdlExecutor::new(pool),
            options: ReconcileOptions::default(),
        }
    }

    /// Replaces the run options.
    #[must_use]
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs a full reconciliation pass over the declared schemas.
    ///
    /// Only a failure to read the table list (or an invalid exclusion
    /// pattern) aborts the run; everything else is folded into the
    /// returned [`RunReport`].
    pub async fn run(&self, schemas: &[SchemaDefinition]) -> Result<RunReport> {
        let exclude = Regex::new(&self.options.exclude_pattern)?;
        let live_tables = self.introspector.list_tables().await?;

        let mut report = RunReport::default();
        for schema in schemas {
            report.tables.push(self.reconcile_table(schema).await);
        }

        let declared: HashSet<&str> = schemas.iter().map(|s| s.table_name.as_str()).collect();
        for table in &live_tables {
            if declared.contains(table.as_str()) {
                continue;
            }
            let action = self.handle_orphan(table, &exclude).await;
            report.orphans.push(OrphanReport {
                table: table.clone(),
                action,
            });
        }

        Ok(report)
    }

    /// Reconciles one declared table, folding any error into the
    /// report so the remaining tables are still processed.
    async fn reconcile_table(&self, schema: &SchemaDefinition) -> TableReport {
        let mut add_failures = Vec::new();
        let outcome = match self.apply_schema(schema, &mut add_failures).await {
            Ok(outcome) => outcome,
            Err(error) => {
                error!(table = %schema.table_name, error = %error, "Reconciliation failed");
                TableOutcome::IntrospectionFailed {
                    reason: error.reason(),
                }
            }
        };
        TableReport {
            table: schema.table_name.clone(),
            outcome,
            add_failures,
        }
    }

    /// The per-table state machine: create when missing, add columns
    /// in place when possible, rebuild otherwise.
    async fn apply_schema(
        &self,
        schema: &SchemaDefinition,
        add_failures: &mut Vec<(String, String)>,
    ) -> Result<TableOutcome> {
        let table = schema.table_name.as_str();

        if !self.introspector.table_exists(table).await? {
            return Ok(self.create(schema).await);
        }

        let live = match self.introspector.columns_of(table).await {
            Ok(live) => live,
            Err(error @ ConformError::Introspection { .. }) => {
                // The table vanished between the probe and the
                // metadata query; re-check and treat it as missing.
                if self.introspector.table_exists(table).await? {
                    return Err(error);
                }
                return Ok(self.create(schema).await);
            }
            Err(error) => return Err(error),
        };

        let diff = diff_table(schema, &live);
        for column in &diff.changed {
            debug!(table = %table, column = %column, "Column definition changed");
        }
        for column in &diff.removed {
            debug!(table = %table, column = %column, "Column no longer declared");
        }

        if diff.is_empty() {
            info!(table = %table, "Table is up to date");
            return Ok(TableOutcome::UpToDate);
        }

        if diff.needs_rebuild() {
            // Kept columns: every declared column that already exists
            // in the live table, in declared order.
            let kept: Vec<String> = schema
                .columns()
                .iter()
                .filter(|c| !diff.added.contains(&c.name))
                .map(|c| c.name.clone())
                .collect();
            info!(
                table = %table,
                removed = diff.removed.len(),
                changed = diff.changed.len(),
                "Rebuilding table"
            );
            if let Err(error) = self.executor.rebuild_table(schema, &kept).await {
                error!(table = %table, error = %error, "Rebuild failed, rolled back");
                return Ok(TableOutcome::RebuildFailed {
                    reason: error.reason(),
                });
            }
            // Added columns are appended only after the rebuild has
            // committed; each ADD is independent of the rebuild.
            add_failures.extend(self.add_columns(schema, &diff.added).await);
            info!(table = %table, "Table rebuilt");
            return Ok(TableOutcome::Rebuilt);
        }

        info!(table = %table, added = diff.added.len(), "Adding missing columns");
        add_failures.extend(self.add_columns(schema, &diff.added).await);
        Ok(TableOutcome::Altered {
            added: diff.added.clone(),
        })
    }

    async fn create(&self, schema: &SchemaDefinition) -> TableOutcome {
        info!(table = %schema.table_name, "Creating missing table");
        match self.executor.create_table(schema).await {
            Ok(()) => TableOutcome::Created,
            Err(error) => {
                error!(table = %schema.table_name, error = %error, "Create failed");
                TableOutcome::CreateFailed {
                    reason: error.reason(),
                }
            }
        }
    }

    async fn add_columns(
        &self,
        schema: &SchemaDefinition,
        added: &[String],
    ) -> Vec<(String, String)> {
        let specs: Vec<&ColumnSpec> = added
            .iter()
            .filter_map(|name| schema.get_column(name))
            .collect();
        self.executor.add_columns(&schema.table_name, &specs).await
    }

    async fn handle_orphan(&self, table: &str, exclude: &Regex) -> OrphanAction {
        if exclude.is_match(table) {
            debug!(table = %table, "Orphan table is engine-internal, never dropped");
            return OrphanAction::Excluded;
        }
        if !self.options.drop_orphans {
            info!(table = %table, "Orphan table left intact");
            return OrphanAction::Kept;
        }
        match self.executor.drop_table(table).await {
            Ok(()) => {
                info!(table = %table, "Dropped orphan table");
                OrphanAction::Dropped
            }
            Err(error) => {
                error!(table = %table, error = %error, "Failed to drop orphan table");
                OrphanAction::DropFailed {
                    reason: error.reason(),
                }
            }
        }
    }
}
