//! Batch orchestration.
//!
//! Responsibilities:
//!
//! - derive this worker's share of the job enumeration (`assign`)
//! - run each assigned job through the fault-isolation runner (`runner`)
//! - aggregate the per-worker outcome log
//!
//! Per worker the loop is a straight line:
//! `Idle -> Assigned -> (ProcessingJob -> JobDone)* -> Finished`.
//! `ProcessingJob` always reaches `JobDone` because the runner absorbs
//! faults; `Finished` is terminal: a batch invocation never accepts more
//! jobs. Jobs within a worker run strictly sequentially, and workers share
//! no mutable state: each derives the identical assignment independently.

pub mod assign;
pub mod runner;

pub use assign::*;
pub use runner::*;

use tracing::{info, info_span};

use crate::domain::{JobOutcome, JobUnit, RunConfig};
use crate::error::{AppError, EngineError};
use crate::fit::FittingEngine;

/// Factory producing the engine for one job's configuration snapshot.
pub type EngineFactory<'a> =
    &'a dyn Fn(&RunConfig) -> Result<Box<dyn FittingEngine>, EngineError>;

/// Run this worker's share of the batch and return its outcome log.
///
/// Worker identity is explicit; there is no ambient rank lookup. An
/// out-of-range worker index is a setup error, raised before any job runs.
pub fn run_batch(
    jobs: &[JobUnit],
    worker_index: usize,
    worker_count: usize,
    engine_factory: EngineFactory<'_>,
) -> Result<Vec<JobOutcome>, AppError> {
    if worker_count == 0 {
        return Err(AppError::new(2, "Worker count must be at least 1."));
    }
    if worker_index >= worker_count {
        return Err(AppError::new(
            2,
            format!("Worker index {worker_index} out of range for {worker_count} worker(s)."),
        ));
    }

    let span = info_span!("worker", index = worker_index);
    let _guard = span.enter();

    let assignment = assign(jobs.len(), worker_count);
    let share = assignment.share(worker_index);

    if share.is_empty() {
        info!("no targets assigned to this worker; going idle");
        return Ok(Vec::new());
    }

    info!(
        assigned = share.len(),
        total = jobs.len(),
        "assigned share of the batch"
    );

    let mut outcomes = Vec::with_capacity(share.len());
    for &ordinal in share {
        let job = &jobs[ordinal];
        let outcome = match engine_factory(&job.config) {
            Ok(engine) => runner::run_job(job, engine.as_ref()),
            // An engine that cannot even be constructed fails this job the
            // same way an engine that runs and fails does.
            Err(e) => crate::domain::JobOutcome {
                dataset: job.dataset.clone(),
                duration: std::time::Duration::ZERO,
                status: crate::domain::JobStatus::Failure {
                    kind: "engine",
                    message: e.to_string(),
                },
            },
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        EngineKind, FitOutput, JobStatus, ObservationBundle, RunConfig,
    };
    use crate::models::PhysicalModel;
    use std::path::PathBuf;

    /// Engine double that fails for one chosen dataset and panics for
    /// another, succeeding everywhere else.
    struct ScriptedEngine {
        fail_on: String,
        panic_on: String,
    }

    impl FittingEngine for ScriptedEngine {
        fn kind(&self) -> EngineKind {
            EngineKind::Optimize
        }

        fn fit(
            &self,
            bundle: &ObservationBundle,
            model: &PhysicalModel,
        ) -> Result<FitOutput, EngineError> {
            if bundle.dataset == self.fail_on {
                return Err(EngineError::Failed("scripted failure".to_string()));
            }
            if bundle.dataset == self.panic_on {
                panic!("scripted panic");
            }
            Ok(FitOutput {
                engine: EngineKind::Optimize,
                parameters: model.fitted_parameters(&model.theta_init()),
                ln_prob: -1.0,
                chi2: 2.0,
                n_valid: bundle.n_valid_total(),
                evaluations: 1,
                log_evidence: None,
            })
        }
    }

    fn write_dataset(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}.json"));
        std::fs::write(
            &path,
            r#"{
                "V1": {
                    "Metadata": {"redshift": 0.5},
                    "Photometry": {
                        "flux": [1.0, 2.0, 3.0],
                        "flux_err": [0.1, 0.1, 0.1],
                        "filters": ["f115w", "f200w", "f444w"]
                    }
                }
            }"#,
        )
        .unwrap();
        path
    }

    fn jobs_in(dir: &tempfile::TempDir, names: &[&str]) -> Vec<JobUnit> {
        let mut config = RunConfig::default();
        config.use_spectroscopy = false;
        config.out_folder = dir.path().join("out");
        config.log_folder = dir.path().join("log");

        names
            .iter()
            .map(|name| JobUnit {
                dataset: name.to_string(),
                path: write_dataset(dir.path(), name),
                config: config.clone(),
            })
            .collect()
    }

    #[test]
    fn failures_are_isolated_and_subsequent_jobs_still_run() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = jobs_in(&dir, &["gal_a", "gal_b", "gal_c", "gal_d"]);

        let factory: EngineFactory<'_> = &|_config| {
            Ok(Box::new(ScriptedEngine {
                fail_on: "gal_b".to_string(),
                panic_on: "gal_c".to_string(),
            }) as Box<dyn FittingEngine>)
        };

        let outcomes = run_batch(&jobs, 0, 1, factory).unwrap();
        assert_eq!(outcomes.len(), 4);

        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(!outcomes[2].is_success());
        assert!(outcomes[3].is_success(), "job after failures did not run");

        match &outcomes[1].status {
            JobStatus::Failure { kind, message } => {
                assert_eq!(*kind, "engine");
                assert!(message.contains("scripted failure"));
            }
            JobStatus::Success(_) => unreachable!(),
        }
        match &outcomes[2].status {
            JobStatus::Failure { message, .. } => assert!(message.contains("panicked")),
            JobStatus::Success(_) => unreachable!(),
        }
    }

    #[test]
    fn bad_dataset_fails_that_job_only() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = jobs_in(&dir, &["gal_good", "gal_bad"]);
        // Point the second job at a file whose version label is wrong.
        std::fs::write(&jobs[1].path, r#"{"V9": {}}"#).unwrap();

        let factory: EngineFactory<'_> = &|_config| {
            Ok(Box::new(ScriptedEngine {
                fail_on: String::new(),
                panic_on: String::new(),
            }) as Box<dyn FittingEngine>)
        };

        let outcomes = run_batch(&jobs, 0, 1, factory).unwrap();
        assert!(outcomes[0].is_success());
        match &outcomes[1].status {
            JobStatus::Failure { kind, .. } => assert_eq!(*kind, "source-access"),
            JobStatus::Success(_) => panic!("expected the bad dataset to fail"),
        }
    }

    #[test]
    fn each_worker_processes_only_its_share() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = jobs_in(&dir, &["g0", "g1", "g2", "g3", "g4"]);

        let factory: EngineFactory<'_> = &|_config| {
            Ok(Box::new(ScriptedEngine {
                fail_on: String::new(),
                panic_on: String::new(),
            }) as Box<dyn FittingEngine>)
        };

        let w0 = run_batch(&jobs, 0, 2, factory).unwrap();
        let w1 = run_batch(&jobs, 1, 2, factory).unwrap();

        let names = |outcomes: &[JobOutcome]| {
            outcomes.iter().map(|o| o.dataset.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&w0), vec!["g0", "g2", "g4"]);
        assert_eq!(names(&w1), vec!["g1", "g3"]);
    }

    #[test]
    fn surplus_worker_finishes_with_zero_work() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = jobs_in(&dir, &["g0"]);

        let factory: EngineFactory<'_> = &|_config| {
            Ok(Box::new(ScriptedEngine {
                fail_on: String::new(),
                panic_on: String::new(),
            }) as Box<dyn FittingEngine>)
        };

        let outcomes = run_batch(&jobs, 3, 4, factory).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn invalid_worker_identity_is_a_setup_error() {
        let factory: EngineFactory<'_> = &|config| crate::fit::build_engine(config);
        assert_eq!(run_batch(&[], 0, 0, factory).unwrap_err().exit_code(), 2);
        assert_eq!(run_batch(&[], 2, 2, factory).unwrap_err().exit_code(), 2);
    }
}
