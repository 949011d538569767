mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gabarito")]
#[command(about = "Gabarito CLI - Grade candidate programs against JSON fixtures", long_about = None)]
struct Cli {
    /// Grader config file (defaults to config/grader.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a source file and print the verdict as JSON
    ///
    /// Exits 0 when the verdict is accepted and 2 otherwise.
    Grade {
        /// Candidate source file
        #[arg(short, long)]
        source: PathBuf,

        /// JSON array of {"input", "expected_output"} objects
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Callable to grade
        #[arg(short, long, default_value = gabarito_common::DEFAULT_ENTRY_POINT)]
        entry_point: String,

        /// Override the time limit for this call
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Only grade fixtures flagged with "is_sample"
        #[arg(long, default_value = "false")]
        samples_only: bool,
    },

    /// Write a default config/grader.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the verdict
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Grade {
            source,
            fixtures,
            entry_point,
            timeout_ms,
            samples_only,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let verdict = commands::grade(
                &config,
                &source,
                &fixtures,
                &entry_point,
                timeout_ms,
                samples_only,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(if verdict.is_accepted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Init { path, force } => {
            commands::init_project(&path, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
