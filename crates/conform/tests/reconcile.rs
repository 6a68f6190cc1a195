//! End-to-end reconciliation scenarios against in-memory databases.
//!
//! Each test drives the full engine — introspection, diff, DDL — and
//! verifies the resulting table structure and row contents through a
//! fresh introspection pass.

use conform::introspect::Introspector;
use conform::reconcile::{OrphanAction, ReconcileOptions, Reconciler, TableOutcome};
use conform_schema::SchemaDefinition;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

fn book_schema() -> SchemaDefinition {
    SchemaDefinition::new("book")
        .parse_column("id", "INTEGER PRIMARY KEY")
        .parse_column("title", "TEXT NOT NULL")
        .parse_column("author", "TEXT")
}

async fn column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
    Introspector::new(pool.clone())
        .columns_of(table)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect()
}

// =============================================================================
// Missing table → CREATE
// =============================================================================

#[tokio::test]
async fn missing_table_is_created_with_declared_column_order() {
    let pool = create_test_pool().await;
    let report = Reconciler::new(pool.clone())
        .run(&[book_schema()])
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].outcome, TableOutcome::Created);
    assert_eq!(column_names(&pool, "book").await, ["id", "title", "author"]);
}

// =============================================================================
// Matching table → no DDL
// =============================================================================

#[tokio::test]
async fn matching_table_is_up_to_date() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    let report = Reconciler::new(pool.clone())
        .run(&[book_schema()])
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.tables[0].outcome, TableOutcome::UpToDate);
}

#[tokio::test]
async fn reconciliation_is_idempotent() {
    let pool = create_test_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    let first = reconciler.run(&[book_schema()]).await.unwrap();
    assert_eq!(first.tables[0].outcome, TableOutcome::Created);

    let second = reconciler.run(&[book_schema()]).await.unwrap();
    assert_eq!(second.tables[0].outcome, TableOutcome::UpToDate);
}

// =============================================================================
// Added columns → in-place ALTER, no rebuild
// =============================================================================

#[tokio::test]
async fn new_column_is_added_without_rebuild() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO book VALUES (1, 'Dune', 'Herbert')")
        .execute(&pool)
        .await
        .unwrap();

    let schema = book_schema().parse_column("year", "INTEGER");
    let report = Reconciler::new(pool.clone()).run(&[schema]).await.unwrap();

    assert!(report.ok());
    assert_eq!(
        report.tables[0].outcome,
        TableOutcome::Altered {
            added: vec!["year".to_string()]
        }
    );
    assert_eq!(
        column_names(&pool, "book").await,
        ["id", "title", "author", "year"]
    );

    // Existing rows survive; the new column takes its default.
    let row: (String, Option<i64>) = sqlx::query_as("SELECT title, year FROM book")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, "Dune");
    assert_eq!(row.1, None);
}

#[tokio::test]
async fn rejected_add_column_fails_aggregate_but_not_table() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    // SQLite cannot add a PRIMARY KEY column through ALTER TABLE.
    let schema = book_schema().parse_column("extra_id", "INTEGER PRIMARY KEY");
    let report = Reconciler::new(pool).run(&[schema]).await.unwrap();

    assert!(!report.ok());
    assert!(matches!(
        report.tables[0].outcome,
        TableOutcome::Altered { .. }
    ));
    assert_eq!(report.tables[0].add_failures.len(), 1);
    assert_eq!(report.tables[0].add_failures[0].0, "extra_id");
}

// =============================================================================
// Removed / changed columns → transactional rebuild
// =============================================================================

#[tokio::test]
async fn undeclared_column_triggers_rebuild_preserving_rows() {
    let pool = create_test_pool().await;
    sqlx::query(
        "CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, \
         author TEXT, isbn TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO book VALUES (1, 'Dune', 'Herbert', '0441172717')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO book VALUES (2, 'Hyperion', 'Simmons', '0553283685')")
        .execute(&pool)
        .await
        .unwrap();

    let report = Reconciler::new(pool.clone())
        .run(&[book_schema()])
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.tables[0].outcome, TableOutcome::Rebuilt);
    assert_eq!(column_names(&pool, "book").await, ["id", "title", "author"]);

    let rows: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, title, author FROM book ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].1, "Dune");
    assert_eq!(rows[1].2, "Simmons");
}

#[tokio::test]
async fn type_change_triggers_rebuild() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    let report = Reconciler::new(pool.clone())
        .run(&[book_schema()])
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.tables[0].outcome, TableOutcome::Rebuilt);

    let columns = Introspector::new(pool.clone())
        .columns_of("book")
        .await
        .unwrap();
    assert_eq!(columns[2].type_name, "TEXT");
}

#[tokio::test]
async fn rebuild_appends_added_columns_after_commit() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, isbn TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO book VALUES (1, 'Dune', '0441172717')")
        .execute(&pool)
        .await
        .unwrap();

    // isbn is dropped (rebuild) and year is added (post-rebuild ALTER).
    let schema = SchemaDefinition::new("book")
        .parse_column("id", "INTEGER PRIMARY KEY")
        .parse_column("title", "TEXT NOT NULL")
        .parse_column("year", "INTEGER");
    let report = Reconciler::new(pool.clone()).run(&[schema]).await.unwrap();

    assert!(report.ok());
    assert_eq!(report.tables[0].outcome, TableOutcome::Rebuilt);
    assert_eq!(column_names(&pool, "book").await, ["id", "title", "year"]);

    let row: (String, Option<i64>) = sqlx::query_as("SELECT title, year FROM book")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, "Dune");
    assert_eq!(row.1, None);
}

#[tokio::test]
async fn failed_rebuild_leaves_original_table_untouched() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL, isbn TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO book VALUES (1, 'Dune', '0441172717')")
        .execute(&pool)
        .await
        .unwrap();
    // A leftover tmp table makes the rebuild's CREATE step fail.
    sqlx::query("CREATE TABLE book_tmp (x INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    let schema = SchemaDefinition::new("book")
        .parse_column("id", "INTEGER PRIMARY KEY")
        .parse_column("title", "TEXT NOT NULL");
    let report = Reconciler::new(pool.clone()).run(&[schema]).await.unwrap();

    assert!(!report.ok());
    assert!(matches!(
        report.tables[0].outcome,
        TableOutcome::RebuildFailed { .. }
    ));

    // Column set and row contents are exactly as before the attempt.
    assert_eq!(column_names(&pool, "book").await, ["id", "title", "isbn"]);
    let row: (i64, String, String) = sqlx::query_as("SELECT id, title, isbn FROM book")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row, (1, "Dune".to_string(), "0441172717".to_string()));
}

// =============================================================================
// Orphan tables
// =============================================================================

#[tokio::test]
async fn orphan_is_reported_and_kept_by_default() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE legacy_log (id INTEGER PRIMARY KEY)")
        .execute(&pool)
        .await
        .unwrap();

    let report = Reconciler::new(pool.clone())
        .run(&[book_schema()])
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.orphan_tables(), ["legacy_log"]);
    assert_eq!(report.orphans[0].action, OrphanAction::Kept);
    assert!(Introspector::new(pool)
        .table_exists("legacy_log")
        .await
        .unwrap());
}

#[tokio::test]
async fn orphan_is_dropped_when_requested() {
    let pool = create_test_pool().await;
    sqlx::query("CREATE TABLE legacy_log (id INTEGER PRIMARY KEY)")
        .execute(&pool)
        .await
        .unwrap();

    let options = ReconcileOptions {
        drop_orphans: true,
        ..ReconcileOptions::default()
    };
    let report = Reconciler::new(pool.clone())
        .with_options(options)
        .run(&[book_schema()])
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.orphans[0].action, OrphanAction::Dropped);
    assert!(!Introspector::new(pool)
        .table_exists("legacy_log")
        .await
        .unwrap());
}

#[tokio::test]
async fn system_tables_are_never_dropped() {
    let pool = create_test_pool().await;
    // AUTOINCREMENT forces SQLite to create its sqlite_sequence table.
    sqlx::query("CREATE TABLE counter (id INTEGER PRIMARY KEY AUTOINCREMENT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO counter DEFAULT VALUES")
        .execute(&pool)
        .await
        .unwrap();

    let options = ReconcileOptions {
        drop_orphans: true,
        ..ReconcileOptions::default()
    };
    let report = Reconciler::new(pool.clone())
        .with_options(options)
        .run(&[book_schema()])
        .await
        .unwrap();

    let sequence = report
        .orphans
        .iter()
        .find(|o| o.table == "sqlite_sequence")
        .expect("sqlite_sequence should be reported as an orphan");
    assert_eq!(sequence.action, OrphanAction::Excluded);
    assert!(Introspector::new(pool)
        .table_exists("sqlite_sequence")
        .await
        .unwrap());
}

// =============================================================================
// Failure isolation across tables
// =============================================================================

#[tokio::test]
async fn failure_on_one_table_does_not_abort_the_rest() {
    let pool = create_test_pool().await;
    // First schema fails to create: a table cannot have two PRIMARY KEYs.
    let broken = SchemaDefinition::new("broken")
        .parse_column("a", "INTEGER PRIMARY KEY")
        .parse_column("b", "INTEGER PRIMARY KEY");

    let report = Reconciler::new(pool.clone())
        .run(&[broken, book_schema()])
        .await
        .unwrap();

    assert!(!report.ok());
    assert!(matches!(
        report.tables[0].outcome,
        TableOutcome::CreateFailed { .. }
    ));
    assert_eq!(report.tables[1].outcome, TableOutcome::Created);
}
