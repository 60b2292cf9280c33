//! # Operator logging
//!
//! Stdout carries result frames, so every log line goes to stderr.
//!
//! - The filter is taken from `RUST_LOG` and defaults to `info`.
//! - `pretty` output is multi-line and human oriented, with thread names, file
//!   and line, and local RFC 3339 timestamps.
//! - `json` output is one object per line for log shippers.
//!
//! Channel-level events (startup, shutdown, truncated or malformed input,
//! output failures) are logged at `info` and above; per-job progress is
//! `debug`/`trace`.

use crate::server::config::LogFormat;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(fmt::time::ChronoLocal::rfc_3339())
                    .with_file(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .with_timer(fmt::time::ChronoLocal::rfc_3339())
                    .json(),
            )
            .try_init()?,
    }

    Ok(())
}
