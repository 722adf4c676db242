//! Internal library for the xferbench tools
//!
//! Holds the pieces shared by the remote channel layer and the benchmark itself:
//!
//! - [`walk`]: ordered listing of the regular files under a local root
//! - [`archive`]: packing a local file or tree into a single `.tar.gz`
//! - [`outcome`]: per-strategy outcomes and the final benchmark report
//! - [`error`]: the error kinds a strategy can record
//! - [`run`]: logging and runtime bootstrap used by the binaries

pub mod archive;
pub mod config;
pub mod error;
pub mod outcome;
pub mod walk;

pub use config::{OutputConfig, RuntimeConfig};
pub use error::{Error, ErrorKind};
pub use outcome::{
    BenchmarkReport, FileFailure, Phase, Schedule, Strategy, TransferOutcome, Winner,
};
pub use walk::{FileEntry, TreeStats};

fn setup_logging(output: &OutputConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))
}

/// Set up logging and a tokio runtime, then drive `func` to completion
///
/// Logs go to stderr so that reports printed on stdout stay machine readable. Returns `None` if
/// the runtime could not be created or `func` failed; the error has been logged at that point.
pub fn run<Fut, T>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<T>
where
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    if let Err(error) = setup_logging(&output) {
        if !output.quiet {
            eprintln!("{error:#}");
        }
        return None;
    }
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to create tokio runtime: {:#}", error);
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(result) => Some(result),
        Err(error) => {
            tracing::error!("{:#}", error);
            None
        }
    }
}
