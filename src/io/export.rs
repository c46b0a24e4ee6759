//! Per-dataset result exports.
//!
//! Each successful fit writes one pretty-printed JSON file under the output
//! folder, named after the dataset identifier. Destinations are partitioned
//! per dataset, so concurrent workers never contend on the same file.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{FitOutput, JobUnit};
use crate::error::JobError;

/// Schema of a result file.
#[derive(Debug, Serialize)]
pub struct ResultFile<'a> {
    pub tool: &'static str,
    pub dataset: &'a str,
    pub generated: String,
    pub model_type: &'static str,
    pub version: &'a str,
    pub z_continuous: u8,
    pub fit: &'a FitOutput,
}

/// Write the result JSON for one job. Any I/O problem here is job-fatal,
/// not batch-fatal.
pub fn write_result_json(job: &JobUnit, fit: &FitOutput) -> Result<PathBuf, JobError> {
    let dir = &job.config.out_folder;
    create_dir_all(dir).map_err(|e| export_error(dir, e))?;

    let path = dir.join(format!("{}.json", job.dataset));
    let file = File::create(&path).map_err(|e| export_error(&path, e))?;

    let result = ResultFile {
        tool: "sedfit",
        dataset: &job.dataset,
        generated: chrono::Local::now().to_rfc3339(),
        model_type: job.config.model_type.display_name(),
        version: &job.config.version,
        z_continuous: job.config.z_continuous,
        fit,
    };

    serde_json::to_writer_pretty(file, &result).map_err(|e| JobError::Export {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(path)
}

fn export_error(path: &Path, e: std::io::Error) -> JobError {
    JobError::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EngineKind, FittedParameter, RunConfig};

    fn sample_fit() -> FitOutput {
        FitOutput {
            engine: EngineKind::Optimize,
            parameters: vec![FittedParameter {
                name: "logmass".to_string(),
                values: vec![10.2],
            }],
            ln_prob: -12.5,
            chi2: 25.0,
            n_valid: 30,
            evaluations: 400,
            log_evidence: None,
        }
    }

    #[test]
    fn writes_result_named_after_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::default();
        config.out_folder = dir.path().join("out");

        let job = JobUnit {
            dataset: "gal_0001".to_string(),
            path: PathBuf::from("gal_0001.json"),
            config,
        };

        let path = write_result_json(&job, &sample_fit()).unwrap();
        assert!(path.ends_with("gal_0001.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"logmass\""));
        assert!(text.contains("\"sedfit\""));
    }

    #[test]
    fn unwritable_destination_is_a_job_error() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the output directory should be.
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, b"x").unwrap();

        let mut config = RunConfig::default();
        config.out_folder = blocker;

        let job = JobUnit {
            dataset: "gal_0001".to_string(),
            path: PathBuf::from("gal_0001.json"),
            config,
        };

        let err = write_result_json(&job, &sample_fit()).unwrap_err();
        assert_eq!(err.kind(), "export");
    }
}
