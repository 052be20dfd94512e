//! opsboard engine binary.
//!
//! `serve` runs the HTTP API plus the hourly sweep scheduler; the other
//! subcommands run a single generation pass and print its result as JSON.

use anyhow::Result;
use clap::{Parser, Subcommand};
use opsboard::clock::{Clock, SystemClock};
use opsboard::config::Config;
use opsboard::db::Database;
use opsboard::server;
use opsboard::types::RuleScope;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// opsboard recurring-entry engine and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API and the scheduled sweep (default)
    Serve,

    /// Expand active daily block rules over a date range
    Daily {
        /// Inclusive range start (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Inclusive range end (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Restrict to rules assigned to this profile
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Reconcile weekly reminder instances over a date range
    Weekly {
        /// Inclusive range start (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Inclusive range end (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Restrict to rules assigned to this profile
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Run one sweep pass over all due events
    Sweep,
}

fn scope_for(assignee: Option<String>) -> RuleScope {
    RuleScope {
        assignee_id: assignee,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::load_or_default(),
    };
    if let Some(db_path) = cli.database {
        config.server.db_path = db_path.into();
    }
    config.ensure_db_dir()?;

    let db = Database::open(&config.server.db_path)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            server::run(&config, db, clock).await?;
        }
        Command::Daily {
            start,
            end,
            assignee,
        } => {
            let result =
                db.generate_daily_instances(&scope_for(assignee), &start, &end, &config.engine)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Weekly {
            start,
            end,
            assignee,
        } => {
            let result =
                db.generate_weekly_instances(&scope_for(assignee), &start, &end, &config.engine)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Sweep => {
            let result = db.sweep_due_events(clock.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
