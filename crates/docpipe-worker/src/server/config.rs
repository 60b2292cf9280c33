use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::num::NonZeroUsize;
use docpipe_core::DEFAULT_MAX_FRAME_BYTES;

/// Runtime configuration for the `docpipe-worker` binary.
///
/// These settings control the concurrency, buffering, and framing limits of
/// the worker. All values are parsed from CLI arguments or environment
/// variables (a `.env` file is honoured), with defaults suitable for running
/// as a child process of the job producer.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "docpipe-worker",
    version,
    about = "Extracts document text for framed job requests on stdin, streaming results to stdout"
)]
pub struct CliArgs {
    /// Number of worker threads extracting documents concurrently.
    ///
    /// `0` selects the number of available hardware threads, falling back to
    /// a single worker when that cannot be determined.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 0)]
    pub num_workers: usize,

    /// Maximum number of accepted jobs waiting for a worker.
    ///
    /// When the limit is reached the reader stops pulling frames from stdin
    /// until a worker frees a slot, which pushes backpressure onto the
    /// producer. `0` leaves the queue unbounded.
    ///
    /// Environment variable: `MAX_QUEUE_DEPTH`
    #[arg(long, env = "MAX_QUEUE_DEPTH", default_value_t = 0)]
    pub max_queue_depth: usize,

    /// Largest inbound payload accepted, in bytes.
    ///
    /// Larger frames are skipped and logged, like malformed payloads.
    ///
    /// Environment variable: `MAX_FRAME_BYTES`
    #[arg(long, env = "MAX_FRAME_BYTES", default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,

    /// Run extractions one at a time even with several workers.
    ///
    /// Only needed for extraction backends that are not safe to call from
    /// several threads at once.
    ///
    /// Environment variable: `SERIALIZE_EXTRACTION`
    #[arg(long, env = "SERIALIZE_EXTRACTION", default_value_t = false)]
    pub serialize_extraction: bool,

    /// Format of the operator log written to stderr.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub num_workers: usize,
    pub max_queue_depth: Option<NonZeroUsize>,
    pub max_frame_bytes: usize,
    pub serialize_extraction: bool,
    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            max_queue_depth: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            serialize_extraction: false,
            log_format: LogFormat::Pretty,
        }
    }
}

impl TryFrom<CliArgs> for WorkerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_frame_bytes == 0 {
            bail!("MAX_FRAME_BYTES must be greater than 0");
        }

        if u32::try_from(args.max_frame_bytes).is_err() {
            bail!(
                "MAX_FRAME_BYTES ({}) exceeds the 32-bit frame length limit ({})",
                args.max_frame_bytes,
                u32::MAX
            );
        }

        let num_workers = match args.num_workers {
            0 => default_num_workers(),
            n => n,
        };

        Ok(Self {
            num_workers,
            max_queue_depth: NonZeroUsize::new(args.max_queue_depth),
            max_frame_bytes: args.max_frame_bytes,
            serialize_extraction: args.serialize_extraction,
            log_format: args.log_format,
        })
    }
}

/// Available hardware parallelism, never less than one.
pub fn default_num_workers() -> usize {
    num_cpus::get().max(1)
}
