//! Fault isolation.
//!
//! [`run_job`] is the single chokepoint where job failures stop: every
//! failure path inside a job (loading, validation, model construction, the
//! fitting engine itself, result export, even an engine panic) is converted
//! into a recorded [`JobOutcome`]. No other component may swallow these;
//! everything below this boundary fails loudly with `?`.
//!
//! The whole value proposition of the batch is "one bad galaxy does not
//! kill the run", and this is the function that enforces it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::app::pipeline;
use crate::domain::{JobOutcome, JobStatus, JobUnit};
use crate::error::{EngineError, JobError};
use crate::fit::FittingEngine;
use crate::logging;

/// Execute one job end-to-end, trapping all failures.
///
/// Records wall-clock duration and final status regardless of the path
/// taken. The job-scoped diagnostic destination is acquired before the
/// pipeline runs and released when this function returns, success or not.
pub fn run_job(job: &JobUnit, engine: &dyn FittingEngine) -> JobOutcome {
    let started = Instant::now();

    let result = with_job_diagnostics(job, || {
        catch_unwind(AssertUnwindSafe(|| pipeline::execute(job, engine)))
            .unwrap_or_else(|payload| {
                Err(JobError::Engine(EngineError::Failed(panic_summary(payload))))
            })
    });

    let duration = started.elapsed();
    let status = match result {
        Ok(fit) => {
            info!(
                dataset = %job.dataset,
                elapsed_s = duration.as_secs_f64(),
                "job finished"
            );
            JobStatus::Success(fit)
        }
        Err(err) => {
            error!(
                dataset = %job.dataset,
                kind = err.kind(),
                error = %err,
                elapsed_s = duration.as_secs_f64(),
                "job failed; batch continues"
            );
            JobStatus::Failure {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    };

    JobOutcome {
        dataset: job.dataset.clone(),
        duration,
        status,
    }
}

/// Run `f` with the job-scoped diagnostic destination installed.
///
/// When file logging is enabled, each dataset gets its own truncated log
/// file; if that file cannot be created we degrade to the ambient subscriber
/// rather than failing the job over diagnostics.
fn with_job_diagnostics<T>(job: &JobUnit, f: impl FnOnce() -> T) -> T {
    if !job.config.log_to_file {
        return f();
    }

    match logging::job_subscriber(&job.config, &job.dataset) {
        Ok(subscriber) => tracing::subscriber::with_default(subscriber, f),
        Err(e) => {
            warn!(
                dataset = %job.dataset,
                error = %e,
                "could not open the job log file; logging to the ambient destination"
            );
            f()
        }
    }
}

fn panic_summary(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("engine panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("engine panicked: {s}")
    } else {
        "engine panicked".to_string()
    }
}
