//! Structured logging setup.
//!
//! Two layers of diagnostics:
//!
//! - a process-wide stderr subscriber installed once at startup
//! - a per-job file subscriber, installed *scoped* around one job so that
//!   concurrently running workers (and consecutive jobs on one worker)
//!   never interleave or overwrite each other's diagnostic output
//!
//! `RUST_LOG` overrides the verbosity derived from the configuration.

use std::fs::{File, create_dir_all};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::domain::RunConfig;

fn default_directive(config: &RunConfig) -> &'static str {
    if config.verbose { "debug" } else { "info" }
}

/// Install the process-wide subscriber. Safe to call once per process;
/// repeated calls are ignored.
pub fn init_global(config: &RunConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build a subscriber writing to `<log_folder>/<dataset>.log`.
///
/// The file is truncated, so re-running a batch leaves one clean log per
/// dataset. The caller installs it with `tracing::subscriber::with_default`,
/// which releases the destination when the job scope ends regardless of the
/// job's outcome.
pub fn job_subscriber(
    config: &RunConfig,
    dataset: &str,
) -> std::io::Result<impl Subscriber + Send + Sync + use<>> {
    create_dir_all(&config.log_folder)?;
    let path: PathBuf = config.log_folder.join(format!("{dataset}.log"));
    let file = File::create(path)?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(default_directive(config)))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .finish())
}
