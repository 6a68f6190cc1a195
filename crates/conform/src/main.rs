//! conform CLI
//!
//! Command-line tool that reconciles a SQLite database with a declared
//! schema manifest.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use conform::manifest::load_manifest;
use conform::reconcile::{OrphanAction, ReconcileOptions, Reconciler, TableOutcome};

/// Reconciles a SQLite database with a declared schema manifest.
#[derive(Parser)]
#[command(name = "conform")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Schema manifest (JSON mapping entity names to column definitions).
    #[arg(short, long, default_value = "schema.json")]
    schema: PathBuf,

    /// Database URL (SQLite path or connection string).
    #[arg(short = 'D', long, env = "DATABASE_URL", default_value = "sqlite:app.db")]
    database: String,

    /// Drop live tables that no declared schema produces.
    #[arg(short, long)]
    drop: bool,

    /// Only show errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Include per-column diagnostic output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let schemas = load_manifest(&cli.schema)?;
    info!(
        manifest = %cli.schema.display(),
        tables = schemas.len(),
        "Loaded schema manifest"
    );

    // Connect to database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&cli.database)
        .await?;

    let options = ReconcileOptions {
        drop_orphans: cli.drop,
        ..ReconcileOptions::default()
    };
    let report = Reconciler::new(pool).with_options(options).run(&schemas).await?;

    for table in &report.tables {
        match &table.outcome {
            TableOutcome::Created => info!(table = %table.table, "created"),
            TableOutcome::UpToDate => info!(table = %table.table, "up to date"),
            TableOutcome::Altered { added } => {
                info!(table = %table.table, added = added.len(), "altered");
            }
            TableOutcome::Rebuilt => info!(table = %table.table, "rebuilt"),
            TableOutcome::CreateFailed { reason } => {
                error!(table = %table.table, reason = %reason, "create failed");
            }
            TableOutcome::RebuildFailed { reason } => {
                error!(table = %table.table, reason = %reason, "rebuild failed");
            }
            TableOutcome::IntrospectionFailed { reason } => {
                error!(table = %table.table, reason = %reason, "introspection failed");
            }
        }
        for (column, reason) in &table.add_failures {
            error!(
                table = %table.table,
                column = %column,
                reason = %reason,
                "add column failed"
            );
        }
    }
    for orphan in &report.orphans {
        match &orphan.action {
            OrphanAction::Kept => info!(table = %orphan.table, "orphan left intact"),
            OrphanAction::Excluded => {}
            OrphanAction::Dropped => info!(table = %orphan.table, "orphan dropped"),
            OrphanAction::DropFailed { reason } => {
                error!(table = %orphan.table, reason = %reason, "orphan drop failed");
            }
        }
    }

    if report.ok() {
        info!("Done.");
        Ok(ExitCode::SUCCESS)
    } else {
        error!("Reconciliation finished with failures.");
        Ok(ExitCode::FAILURE)
    }
}
