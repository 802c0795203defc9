//! Operator-facing entry point: one binary, one subcommand per pipeline
//! stage, plus `process` to run all three worker loops in a cycle.
//!
//! Exit codes follow the command surface: `0` success, `1` runtime/DB/HTTP
//! failure, `2` argument or payload validation failure.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const EXIT_RUNTIME_ERROR: u8 = 1;
const EXIT_VALIDATION_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "scoop", version, about = "News ingestion pipeline operator CLI")]
struct Cli {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Max pool connections.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Per-request timeout in seconds, used for the embedding HTTP client.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Path to a `.env` file to load before reading other flags/env vars.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and record one scraper payload.
    Ingest {
        /// Path to a JSON file holding one canonical v1 payload.
        #[arg(long)]
        payload_file: PathBuf,

        /// Optional label identifying the topic/job that triggered this run.
        #[arg(long)]
        triggered_by_topic: Option<String>,
    },

    /// Turn pending raw arrivals into articles.
    Normalize {
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// Embed pending articles via the configured embedding service.
    Embed {
        #[arg(long, default_value_t = 100)]
        limit: u32,

        #[arg(long, default_value_t = 16)]
        batch_size: i64,

        #[arg(long)]
        endpoint: String,

        #[arg(long)]
        model_name: String,

        #[arg(long)]
        model_version: String,

        /// Passed through as `max_length` on the native wire format; ignored
        /// by the OpenAI-compatible endpoint.
        #[arg(long)]
        max_length: Option<u32>,
    },

    /// Run the decision cascade for pending embedded articles.
    Dedup {
        #[arg(long, default_value_t = 100)]
        limit: u32,

        #[arg(long, default_value_t = 30)]
        lookback_days: i64,

        #[arg(long)]
        model_name: String,

        #[arg(long)]
        model_version: String,
    },

    /// Run normalize, embed, and dedup in a cycle.
    Process {
        /// Keep cycling until one full cycle processes nothing.
        #[arg(long)]
        until_empty: bool,

        /// Stop after this many cycles regardless of `--until-empty`.
        #[arg(long)]
        max_cycles: Option<u32>,

        #[arg(long, default_value_t = 100)]
        limit: u32,

        #[arg(long, default_value_t = 16)]
        batch_size: i64,

        #[arg(long)]
        endpoint: String,

        #[arg(long)]
        model_name: String,

        #[arg(long)]
        model_version: String,

        #[arg(long, default_value_t = 30)]
        lookback_days: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // `--env-file` has to be loaded before `Cli::parse` so that `env = "..."`
    // defaults (like `DATABASE_URL`) see file-provided values; clap itself
    // can't tell us that path without parsing first. A cheap manual scan of
    // argv breaks the chicken-and-egg problem.
    if let Err(err) = dotenvy::from_filename(env_file_from_args()) {
        if env_file_was_explicit() {
            eprintln!("warning: failed to load .env file: {err}");
        }
    }
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pool = match store::connect(&cli.database_url, cli.max_connections).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let timeout = Duration::from_secs(cli.timeout);

    let outcome = match cli.command {
        Commands::Ingest {
            payload_file,
            triggered_by_topic,
        } => commands::ingest::run(&pool, &payload_file, triggered_by_topic.as_deref()).await,
        Commands::Normalize { limit } => commands::normalize::run(&pool, limit).await,
        Commands::Embed {
            limit,
            batch_size,
            endpoint,
            model_name,
            model_version,
            max_length,
        } => {
            commands::embed::run(
                &pool,
                &commands::embed::Args {
                    limit,
                    batch_size,
                    endpoint: &endpoint,
                    model_name: &model_name,
                    model_version: &model_version,
                    max_length,
                    request_timeout: timeout,
                },
            )
            .await
        }
        Commands::Dedup {
            limit,
            lookback_days,
            model_name,
            model_version,
        } => {
            commands::dedup::run(
                &pool,
                limit,
                &dedup::DedupParams {
                    model_name: &model_name,
                    model_version: &model_version,
                    lookback_days,
                },
            )
            .await
        }
        Commands::Process {
            until_empty,
            max_cycles,
            limit,
            batch_size,
            endpoint,
            model_name,
            model_version,
            lookback_days,
        } => {
            commands::process::run(
                &pool,
                &commands::process::Args {
                    until_empty,
                    max_cycles,
                    limit,
                    batch_size,
                    endpoint: &endpoint,
                    model_name: &model_name,
                    model_version: &model_version,
                    lookback_days,
                    request_timeout: timeout,
                },
            )
            .await
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(commands::CliError::Validation(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_VALIDATION_ERROR)
        }
        Err(commands::CliError::Runtime(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

/// Pulls the value of `--env-file` out of argv without going through clap,
/// since we need it before `Cli::parse` runs. Falls back to `.env`.
fn env_file_from_args() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    for (i, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix("--env-file=") {
            return PathBuf::from(value);
        }
        if arg == "--env-file" {
            if let Some(value) = args.get(i + 1) {
                return PathBuf::from(value);
            }
        }
    }
    PathBuf::from(".env")
}

fn env_file_was_explicit() -> bool {
    std::env::args().any(|a| a == "--env-file" || a.starts_with("--env-file="))
}
