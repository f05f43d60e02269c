use std::sync::Arc;

use clap::Parser;
use config::ProgramConfig;
use error::AppError;
use indicatif::MultiProgress;
use mimalloc::MiMalloc;
use segmux_engine::{Pipeline, RunOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod config;
mod error;
mod input;
mod utils;

use cli::CliArgs;
use utils::progress::ProgressManager;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) -> Result<(), AppError> {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&args.log_file)?;

    let multi_writer = MakeWriterExt::and(std::io::stdout, Arc::new(log_file));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(multi_writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();
    init_logging(&args)?;

    info!("Segmux {} - record playlist downloader", env!("CARGO_PKG_VERSION"));
    info!("==================================================================");

    let program_config = ProgramConfig::from_args(&args)?;
    info!("{}", program_config.pipeline_config);
    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, read={}s",
        args.timeout, args.connect_timeout, args.read_timeout
    );

    let job = input::collect_job(
        args.url.as_deref(),
        args.name.as_deref(),
        program_config.allow_prompt,
    )?;

    let multi = MultiProgress::new();
    let progress_manager = if program_config.show_progress {
        ProgressManager::new(multi)
    } else {
        ProgressManager::new_disabled(multi)
    };

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            ctrl_c_token.cancel();
        }
    });

    let events = progress_manager.clone();
    let mut pipeline = Pipeline::with_defaults(
        &program_config.downloader_config,
        program_config.pipeline_config,
    )?
    .with_progress(Arc::new(move |event| events.handle_event(event)))
    .with_cancellation(cancel);

    match pipeline.run(&job).await {
        Ok(outcome) => {
            let message = outcome_message(&outcome);
            info!(outcome = ?outcome, "{message}");
            // printed as well so a restrictive RUST_LOG cannot hide it
            println!("{message}");
            Ok(())
        }
        Err(e) => {
            progress_manager.abandon();
            Err(e.into())
        }
    }
}

/// Operator-facing summary of a finished run.
fn outcome_message(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed { output, .. } => {
            format!("Combined segments into {}", output.display())
        }
        RunOutcome::NoSegments => "No segment URLs found in the playlist.".to_string(),
    }
}
