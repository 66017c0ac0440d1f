use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tally_kernel::operations::Operation;
use tally_kernel::{Calculator, CalculatorConfig};

mod repl;

use repl::Repl;

/// Tally Calculator CLI
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Interactive calculator with undoable history", long_about = None)]
struct Cli {
    /// Dotenv file read before configuration; set variables win
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Path to the history CSV (overrides CALCULATOR_HISTORY_FILE)
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Path to the calculation log (overrides CALCULATOR_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Fractional digits kept on results (overrides CALCULATOR_PRECISION)
    #[arg(long)]
    precision: Option<u32>,

    /// Do not rewrite the history file after every calculation
    #[arg(long)]
    no_auto_save: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

/// Wrapper for JSON output
#[derive(Debug, Serialize)]
struct ConfigOutput<'a> {
    config: &'a CalculatorConfig,
    operations: Vec<&'static str>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_loaded = load_env_file(&cli.env_file)?;
    init_tracing();
    if env_loaded {
        tracing::debug!(path = %cli.env_file.display(), "environment file loaded");
    }

    // ----------------------------
    // Load configuration
    // ----------------------------
    let mut config = CalculatorConfig::from_env().context("invalid calculator configuration")?;
    if let Some(path) = cli.history_file {
        config.history_file = path;
    }
    if let Some(path) = cli.log_file {
        config.log_file = path;
    }
    if let Some(precision) = cli.precision {
        config.precision = precision;
    }
    if cli.no_auto_save {
        config.auto_save = false;
    }
    config.validate().context("invalid calculator configuration")?;

    if cli.print_config {
        let output = ConfigOutput {
            config: &config,
            operations: Operation::ALL.iter().map(|op| op.name()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    config.prepare_directories()?;
    tracing::debug!(%config, "configuration loaded");

    // ----------------------------
    // Run the REPL
    // ----------------------------
    let calculator = Calculator::with_default_observers(config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    Repl::new(calculator).run(stdin.lock(), stdout.lock())?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Export variables from a dotenv file without overriding ones already
/// set. Returns `false` when the file does not exist.
fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(err).with_context(|| format!("cannot read {}", path.display())),
    }
}
