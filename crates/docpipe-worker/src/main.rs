#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use docpipe_core::{Extractor, PdfExtractor, Serialized};
use server::config::{CliArgs, WorkerConfig};
use server::telemetry::init_telemetry;
use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::sync::Arc;

// Using mimalloc for better performance under contention from many worker
// threads allocating page text concurrently.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = WorkerConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let extractor: Arc<dyn Extractor> = if config.serialize_extraction {
        Arc::new(Serialized::new(PdfExtractor))
    } else {
        Arc::new(PdfExtractor)
    };

    let report = server::run(
        &config,
        extractor,
        io::stdin(),
        BufWriter::new(io::stdout()),
    )?;

    tracing::info!(
        "Worker exiting ({:?}) after {} jobs",
        report.end,
        report.dispatch.accepted
    );
    Ok(report.exit_code())
}

fn log_startup_info(config: &WorkerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting docpipe worker with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting docpipe worker with {} workers (queue depth: {})",
            config.num_workers,
            config
                .max_queue_depth
                .map_or_else(|| String::from("unbounded"), |n| n.to_string())
        );
    }
}
