#![forbid(unsafe_code)]

mod commands;
mod json;

use anyhow::Context;
use clap::Parser;
use commands::Command;
use recon_storage::{Location, Session, SessionConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Record reconciliation over a SQLite database.
#[derive(Debug, Parser)]
#[command(name = "recon", version, about, long_about = None)]
struct Cli {
    /// Database file
    #[arg(global = true, short, long, env = "RECON_DATABASE")]
    database: Option<PathBuf>,

    /// How long to wait on a locked database, in milliseconds
    #[arg(global = true, long, env = "RECON_BUSY_TIMEOUT_MS", default_value_t = 5_000)]
    busy_timeout_ms: u64,

    /// Per-call statement budget in milliseconds
    #[arg(global = true, long, env = "RECON_STATEMENT_TIMEOUT_MS")]
    statement_timeout_ms: Option<u64>,

    /// Fail instead of creating a missing database file
    #[arg(global = true, long)]
    no_create: bool,

    /// Debug logging on stderr
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let location = match (&self.database, &self.command) {
            (Some(path), _) => Location::File(path.clone()),
            (None, Command::Version) => Location::Memory,
            (None, _) => anyhow::bail!("database path required (--database or RECON_DATABASE)"),
        };
        Ok(SessionConfig::new(location)
            .create_if_missing(!self.no_create)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .statement_timeout(self.statement_timeout_ms.map(Duration::from_millis)))
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.session_config()?;
    let location = config.location.clone();
    debug!(%location, command = ?cli.command, "starting");
    let mut session =
        Session::connect(config).with_context(|| format!("open database {location}"))?;

    let mut stdout = std::io::stdout().lock();
    let result = commands::run(&mut session, cli.command, &mut stdout);
    if let Err(err) = &result {
        warn!(%location, error = %err, "command failed");
    }
    session.close()?;
    result
}
