//! Tideline migration CLI
//!
//! The binary in this crate bundles the sample migrations under `migrations/`.
//! Applications embed the same front end with their own catalog:
//!
//! ```rust,no_run
//! use clap::Parser;
//! use tideline::migration::MigrationCatalog;
//! use tideline_cli::{init_logging, run, Cli};
//!
//! let cli = Cli::parse();
//! init_logging(cli.verbose, cli.quiet);
//! let catalog = MigrationCatalog::new();
//! let ok = run(&cli, &catalog).unwrap_or(false);
//! std::process::exit(if ok { 0 } else { 1 });
//! ```

pub mod stub;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use tideline::migration::{
    LedgerStatements, MigrationCatalog, MigrationError, Migrator, PostgresLedger,
};
use tideline::{connect, MayPostgresExecutor, TidelineConfig};

pub use stub::{CliError, FileWriter, FsFileWriter};

#[derive(Debug, Parser)]
#[command(name = "tideline")]
#[command(about = "Run, revert and inspect Tideline migrations")]
#[command(version)]
pub struct Cli {
    /// Database connection URL (overrides config and environment)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Ledger table name (overrides config)
    #[arg(long)]
    pub ledger_table: Option<String>,

    /// Directory new migration stubs are written to
    #[arg(long)]
    pub migrations_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply every pending migration
    Run {
        /// List what would run without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Reverse the most recently applied migration
    Revert,

    /// List pending migrations in run order
    Pending,

    /// Show ledger rows and pending migrations
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a new migration stub
    Create {
        /// Migration name, e.g. `CreateUsersTable`
        name: String,
    },
}

/// Initialize `env_logger` with a colored level prefix.
///
/// `RUST_LOG` still wins over the flags when set.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| {
            let level = match record.level() {
                log::Level::Error => "error".red().bold(),
                log::Level::Warn => "warn".yellow().bold(),
                log::Level::Info => "info".green(),
                log::Level::Debug => "debug".blue(),
                log::Level::Trace => "trace".dimmed(),
            };
            writeln!(buf, "{level}: {}", record.args())
        })
        .try_init();
}

/// Execute `cli` against `catalog`.
///
/// Returns `Ok(false)` when the command ran but reported failure (a failed
/// migration, an unrecorded result, a revert that did not happen).
///
/// # Errors
///
/// Configuration, connection and ledger-read failures.
pub fn run(cli: &Cli, catalog: &MigrationCatalog) -> anyhow::Result<bool> {
    dotenv::dotenv().ok();
    let mut config = TidelineConfig::load().context("failed to load configuration")?;
    if let Some(url) = &cli.database_url {
        config.database.url.clone_from(url);
    }
    if let Some(table) = &cli.ledger_table {
        config.ledger.table.clone_from(table);
    }
    if let Some(dir) = &cli.migrations_dir {
        config.migrations.dir.clone_from(dir);
    }

    let mut out = io::stdout().lock();

    if let Commands::Create { name } = &cli.command {
        let path = stub::create_stub(
            &FsFileWriter,
            &config.migrations.dir,
            name,
            stub::current_version(),
        )?;
        writeln!(out, "{} {}", "created".green().bold(), path.display())?;
        writeln!(out, "   Register the new type in your migration catalog to run it")?;
        return Ok(true);
    }

    let statements = LedgerStatements::from_config(&config.ledger)?;
    let client = connect(&config.database.url).context("failed to connect to database")?;
    let executor = MayPostgresExecutor::new(client);
    let ledger = PostgresLedger::new(&executor, statements);
    let migrator = Migrator::new(catalog, &ledger, &executor);
    migrator.initialize()?;

    dispatch(&cli.command, &migrator, &mut out)
}

/// Run one engine command and print its result to `out`.
///
/// # Errors
///
/// Ledger-read failures and write errors on `out`.
pub fn dispatch(
    command: &Commands,
    migrator: &Migrator<'_>,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    match command {
        Commands::Run { dry_run: true } | Commands::Pending => print_pending(migrator, out),
        Commands::Run { dry_run: false } => handle_run(migrator, out),
        Commands::Revert => handle_revert(migrator, out),
        Commands::Status { json } => handle_status(migrator, *json, out),
        Commands::Create { .. } => Ok(true),
    }
}

fn print_pending(migrator: &Migrator<'_>, out: &mut dyn Write) -> anyhow::Result<bool> {
    let pending = migrator.list_pending()?;
    if pending.is_empty() {
        writeln!(out, "No pending migrations")?;
        return Ok(true);
    }
    writeln!(out, "Pending migrations ({}):", pending.len())?;
    for (i, migration) in pending.iter().enumerate() {
        writeln!(out, "  {}. {} ({})", i + 1, migration.name(), migration.version())?;
    }
    Ok(true)
}

fn handle_run(migrator: &Migrator<'_>, out: &mut dyn Write) -> anyhow::Result<bool> {
    let outcome = migrator.run()?;
    if outcome.results.is_empty() {
        writeln!(out, "No migrations to apply")?;
        return Ok(outcome.success);
    }

    for result in &outcome.results {
        let mark = if result.is_completed() { "✓".green() } else { "✗".red() };
        match result.error_message() {
            None => writeln!(out, "  {mark} {} ({}ms)", result.name(), result.duration_ms())?,
            Some(err) => writeln!(out, "  {mark} {} ({}ms): {err}", result.name(), result.duration_ms())?,
        }
    }
    for name in &outcome.unrecorded {
        writeln!(out, "  {} {name}: result not recorded in ledger", "!".yellow())?;
    }

    if outcome.success {
        writeln!(out, "Applied {} migration(s)", outcome.completed_count())?;
    } else {
        let err = MigrationError::RunFailed {
            failed: outcome.failed_names(),
        };
        writeln!(out, "{}", err.to_string().red())?;
    }
    Ok(outcome.success)
}

fn handle_revert(migrator: &Migrator<'_>, out: &mut dyn Write) -> anyhow::Result<bool> {
    let outcome = migrator.revert();
    match (&outcome.target_label, outcome.success) {
        (None, _) => writeln!(out, "Nothing to revert")?,
        (Some(label), true) => writeln!(out, "Reverted {label}")?,
        (Some(label), false) => writeln!(out, "{} {label}", "Revert failed:".red())?,
    }
    Ok(outcome.success)
}

fn handle_status(migrator: &Migrator<'_>, json: bool, out: &mut dyn Write) -> anyhow::Result<bool> {
    let status = migrator.status()?;

    if json {
        let pending: Vec<_> = status
            .pending
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name(),
                    "version": m.version(),
                    "label": m.label(),
                })
            })
            .collect();
        let doc = serde_json::json!({
            "applied": status.applied,
            "pending": pending,
            "up_to_date": status.is_up_to_date(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        return Ok(true);
    }

    writeln!(out, "Ledger ({} row(s)):", status.applied.len())?;
    for entry in &status.applied {
        let status_text = match entry.status {
            tideline::migration::LedgerStatus::Completed => entry.status.as_str().green(),
            tideline::migration::LedgerStatus::Failed => entry.status.as_str().red(),
        };
        writeln!(
            out,
            "  {} {} ({}, {}ms, {})",
            status_text,
            entry.name,
            entry.version,
            entry.duration_ms,
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        if let Some(err) = &entry.error_text {
            writeln!(out, "      {err}")?;
        }
    }

    writeln!(out, "Pending ({}):", status.pending_count())?;
    for migration in &status.pending {
        writeln!(out, "  {} ({})", migration.name(), migration.version())?;
    }
    writeln!(
        out,
        "Summary: {} completed, {} failed, {} pending",
        status.applied_count(),
        status.failed_count(),
        status.pending_count()
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use may_postgres::types::ToSql;
    use may_postgres::Row;
    use tideline::migration::{MemoryLedger, Migration, RunStatus, SchemaManager};
    use tideline::{TideError, TideExecutor};

    struct NullExecutor;

    impl TideExecutor for NullExecutor {
        fn execute(&self, _query: &str, _params: &[&dyn ToSql]) -> Result<u64, TideError> {
            Ok(0)
        }

        fn query_one(&self, _query: &str, _params: &[&dyn ToSql]) -> Result<Row, TideError> {
            Err(TideError::Other("no rows".to_string()))
        }

        fn query_all(&self, _query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, TideError> {
            Ok(Vec::new())
        }
    }

    struct Migration1700000000001CreateUsers;

    impl Migration for Migration1700000000001CreateUsers {
        fn up(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }

        fn down(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }
    }

    struct Migration1700000000002Broken;

    impl Migration for Migration1700000000002Broken {
        fn up(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Err(TideError::QueryError("column already exists".to_string()))
        }

        fn down(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }
    }

    fn output(command: &Commands, migrator: &Migrator<'_>) -> (bool, String) {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        let ok = dispatch(command, migrator, &mut buf).expect("dispatch");
        (ok, String::from_utf8(buf).expect("utf8"))
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["tideline", "--ledger-table", "ops.ledger", "status", "--json"])
            .expect("parses");
        assert_eq!(cli.ledger_table.as_deref(), Some("ops.ledger"));
        assert!(matches!(cli.command, Commands::Status { json: true }));

        let cli = Cli::try_parse_from(["tideline", "create", "CreateUsers"]).expect("parses");
        assert!(matches!(cli.command, Commands::Create { ref name } if name == "CreateUsers"));
    }

    #[test]
    fn test_run_then_status() {
        let catalog = MigrationCatalog::new()
            .with(Migration1700000000001CreateUsers)
            .with(Migration1700000000002Broken);
        let ledger = MemoryLedger::new();
        let migrator = Migrator::new(&catalog, &ledger, &NullExecutor);

        let (ok, text) = output(&Commands::Pending, &migrator);
        assert!(ok);
        assert!(text.contains("1. CreateUsers (1700000000001)"));

        let (ok, text) = output(&Commands::Run { dry_run: false }, &migrator);
        assert!(!ok);
        assert!(text.contains("column already exists"));
        assert!(text.contains("Broken"));

        let (_, text) = output(&Commands::Status { json: false }, &migrator);
        assert!(text.contains("Summary: 1 completed, 1 failed, 1 pending"));

        let (_, text) = output(&Commands::Status { json: true }, &migrator);
        let doc: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(doc["up_to_date"], serde_json::Value::Bool(false));
        assert_eq!(doc["applied"][0]["status"], "COMPLETED");
        assert_eq!(doc["pending"][0]["name"], "Broken");
    }

    #[test]
    fn test_revert_output() {
        let catalog = MigrationCatalog::new().with(Migration1700000000001CreateUsers);
        let ledger = MemoryLedger::new();
        let migrator = Migrator::new(&catalog, &ledger, &NullExecutor);

        let (ok, text) = output(&Commands::Revert, &migrator);
        assert!(!ok);
        assert!(text.contains("Nothing to revert"));

        migrator.run().expect("run");
        let (ok, text) = output(&Commands::Revert, &migrator);
        assert!(ok);
        assert!(text.contains("Migration1700000000001CreateUsers"));
    }
}
