//! mdb-migrate CLI - copy Access tables into PostgreSQL, MySQL or SQLite.

use clap::Parser;
use mdb_migrate::encoding;
use mdb_migrate::{Config, CopyOptions, MigrateError, Orchestrator, ShutdownSignal, TransactionScope};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mdb-migrate")]
#[command(about = "Copy Microsoft Access tables into PostgreSQL, MySQL or SQLite")]
#[command(version)]
struct Cli {
    /// Destination URI (postgres://, mysql://, sqlite3://...)
    destination: Option<String>,

    /// Access files to copy, in order
    files: Vec<PathBuf>,

    /// Path to YAML configuration file; command-line values take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transaction scope: full, file or table [default: full]
    #[arg(long)]
    transaction: Option<TransactionScope>,

    /// Re-encode Text/LongText values from this encoding
    #[arg(long)]
    text_encoding: Option<String>,

    /// Re-encode Binary/LongBinary values from this encoding
    #[arg(long)]
    blob_encoding: Option<String>,

    /// List supported encodings and exit
    #[arg(long)]
    encodings: bool,

    /// Create tables with IF NOT EXISTS
    #[arg(long)]
    check: bool,

    /// Log every generated statement
    #[arg(long)]
    log_query: bool,

    /// Directory holding mdb-tables, mdb-schema and mdb-json (default: PATH)
    #[arg(long)]
    mdbtools_dir: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", value_parser = ["debug", "info", "warn", "error"])]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version arrive here too, rendered for stdout
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.to_string();
            eprintln!("{}", rendered.lines().next().unwrap_or("error: invalid arguments"));
            return ExitCode::from(1);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            info!("Copy cancelled; open transaction rolled back");
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), MigrateError> {
    if cli.encodings {
        for enc in encoding::available() {
            println!("{}", enc.name());
        }
        return Ok(());
    }

    setup_logging(&cli.verbosity, &cli.log_format)?;

    let config = build_config(&cli)?;
    let options = CopyOptions::from_config(&config)?;

    // SIGINT and SIGTERM cancel the run; repeated signals are absorbed
    let shutdown = ShutdownSignal::new();
    shutdown.install()?;
    let cancel = shutdown.token();

    let mut orchestrator = Orchestrator::connect(options, &cancel).await?;
    let result = orchestrator.run(&cancel).await;
    orchestrator.close().await;
    let stats = result?;

    if cli.output_json {
        println!("{}", stats.to_json()?);
    }
    Ok(())
}

/// Merge the optional YAML file with command-line values.
fn build_config(cli: &Cli) -> Result<Config, MigrateError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    if let Some(destination) = &cli.destination {
        config.destination = destination.clone();
    }
    if !cli.files.is_empty() {
        config.files = cli.files.clone();
    }
    if let Some(scope) = cli.transaction {
        config.transaction = scope;
    }
    if cli.text_encoding.is_some() {
        config.text_encoding = cli.text_encoding.clone();
    }
    if cli.blob_encoding.is_some() {
        config.blob_encoding = cli.blob_encoding.clone();
    }
    if cli.mdbtools_dir.is_some() {
        config.tools_dir = cli.mdbtools_dir.clone();
    }
    config.check_table |= cli.check;
    config.log_query |= cli.log_query;

    Ok(config)
}

/// Log to stderr so stdout stays free for `--encodings` and `--output-json`.
fn setup_logging(verbosity: &str, format: &str) -> Result<(), MigrateError> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| MigrateError::Config(format!("logging setup failed: {}", e)))
}
