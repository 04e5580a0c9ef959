mod config;
mod server;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ingest_core::BatchRequest;
use ingest_engine::Ingestor;
use ingest_logging::{ingest_error, ingest_info, LogDestination};
use log::LevelFilter;
use serde_json::json;

use crate::config::AppConfig;

/// Download documents and web pages into per-batch directories.
#[derive(Parser)]
#[command(name = "ingest", version, about)]
struct Cli {
    /// RON settings file; missing means defaults.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON MIME-to-extension table replacing the built-in one.
    #[arg(long, global = true, value_name = "FILE")]
    extensions: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one batch and print its records as JSON.
    Run {
        /// Batch name; also the output directory name.
        #[arg(long)]
        name: String,
        #[arg(long, num_args = 1.., required = true)]
        urls: Vec<String>,
    },
    /// Serve the HTTP API.
    Serve {
        /// Listen address, overriding the config.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            ingest_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // `run` prints JSON on stdout, so its log goes to the file only.
    let destination = match cli.command {
        Command::Run { .. } => LogDestination::File(config.log_file.clone()),
        Command::Serve { .. } => LogDestination::Both(config.log_file.clone()),
    };
    ingest_logging::initialize(destination, level);

    let table = config.mime_table(cli.extensions.as_deref())?;
    ingest_info!("Loaded MIME table with {} entries", table.len());
    let ingestor = Ingestor::new(config.ingest_settings(), table);

    match cli.command {
        Command::Run { name, urls } => run_batch(&ingestor, &name, urls).await,
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            server::serve(Arc::new(ingestor), &bind).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_batch(ingestor: &Ingestor, name: &str, urls: Vec<String>) -> anyhow::Result<ExitCode> {
    if name.trim().is_empty() {
        eprintln!("Error: --name cannot be empty or just spaces.");
        return Ok(ExitCode::FAILURE);
    }
    let urls: Vec<String> = urls.into_iter().filter(|url| !url.trim().is_empty()).collect();
    if urls.is_empty() {
        eprintln!("Error: --urls must contain at least one non-empty URL.");
        return Ok(ExitCode::FAILURE);
    }

    let batch = BatchRequest::new(name, &urls)?;
    let result = ingestor.run_batch(&batch).await?;
    let slots = serde_json::to_value(&result.slots).context("serializing batch records")?;
    let report = json!({
        "batch_id": result.batch_id,
        "directory": result.directory.display().to_string(),
        "documents_downloaded": slots,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}
