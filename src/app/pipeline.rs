//! Single-job fit pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> validate -> (optional LSF) -> build model -> fit -> export
//!
//! Everything here fails loudly with `?`; the fault-isolation runner is the
//! only caller and the only place these failures are converted into
//! recorded outcomes.

use tracing::{debug, info};

use crate::data;
use crate::domain::{FitOutput, JobUnit, ObservationBundle};
use crate::error::JobError;
use crate::fit::FittingEngine;
use crate::io::dispersion::{DispersionTable, library_delta_v};
use crate::io::export;
use crate::models::build_model;
use crate::report;

/// Execute the whole pipeline for one job.
pub fn execute(job: &JobUnit, engine: &dyn FittingEngine) -> Result<FitOutput, JobError> {
    info!(dataset = %job.dataset, "starting job");

    let record = data::loader::load_record(job)?;
    let bundle = data::validate::validate(&job.dataset, &record, &job.config)?;
    let lsf_delta_v = resolve_lsf(job, &bundle)?;
    let model = build_model(&job.config, bundle.redshift, lsf_delta_v);

    if job.config.verbose {
        info!("model summary:\n{}", report::format_model_table(&model));
    }

    let fit = engine.fit(&bundle, &model)?;

    let path = export::write_result_json(job, &fit)?;
    info!(
        dataset = %job.dataset,
        chi2 = fit.chi2,
        result = %path.display(),
        "fit complete"
    );

    if job.config.interactive {
        println!("{}", report::format_fit_summary(&job.dataset, &fit));
    }

    Ok(fit)
}

/// Extra instrumental broadening for the spectroscopy pixels, if smoothing
/// is enabled and a dispersion file is configured. A configured-but-missing
/// dispersion file is job-fatal, like any other source problem.
fn resolve_lsf(job: &JobUnit, bundle: &ObservationBundle) -> Result<Option<Vec<f64>>, JobError> {
    if !job.config.add_sigmav {
        return Ok(None);
    }
    let Some(path) = &job.config.dispersion_file else {
        debug!("smoothing enabled but no dispersion file configured; skipping LSF");
        return Ok(None);
    };
    let Some(spec) = &bundle.spectroscopy else {
        return Ok(None);
    };

    let table = DispersionTable::from_csv(path)?;
    let sigma_v = table.sigma_v_at(&spec.wavelength);
    let delta_v = library_delta_v(&spec.wavelength, &sigma_v, bundle.redshift.unwrap_or(0.0));
    info!(path = %path.display(), "instrumental LSF applied");
    Ok(Some(delta_v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunConfig;
    use crate::fit::OptimizeEngine;
    use std::path::PathBuf;

    fn write_phot_record(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("gal_0001.json");
        std::fs::write(
            &path,
            r#"{
                "V1": {
                    "Metadata": {"redshift": 0.8},
                    "Photometry": {
                        "flux": [2.1, 3.3, 4.0, 3.1],
                        "flux_err": [0.1, 0.1, 0.2, 0.2],
                        "filters": ["f115w", "f200w", "f356w", "f444w"]
                    }
                }
            }"#,
        )
        .unwrap();
        path
    }

    fn quick_config(dir: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::default();
        config.use_spectroscopy = false;
        config.add_nebular = false;
        config.add_duste = false;
        config.add_dust1 = false;
        config.out_folder = dir.join("out");
        config.log_folder = dir.join("log");
        config.optimizer.sweeps = 2;
        config.optimizer.grid_steps = 5;
        config
    }

    #[test]
    fn happy_path_fits_and_writes_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobUnit {
            dataset: "gal_0001".to_string(),
            path: write_phot_record(dir.path()),
            config: quick_config(dir.path()),
        };

        let engine = OptimizeEngine::new(job.config.optimizer.clone());
        let fit = execute(&job, &engine).unwrap();

        assert!(fit.chi2.is_finite());
        assert!(dir.path().join("out/gal_0001.json").exists());
    }

    #[test]
    fn missing_dispersion_file_is_job_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gal.json");
        std::fs::write(
            &path,
            r#"{
                "V1": {
                    "Spectroscopy": {
                        "wavelength": [4000.0, 5000.0, 6000.0],
                        "flux": [1.0, 1.1, 1.2],
                        "flux_err": [0.1, 0.1, 0.1]
                    }
                }
            }"#,
        )
        .unwrap();

        let mut config = quick_config(dir.path());
        config.use_photometry = false;
        config.use_spectroscopy = true;
        config.dispersion_file = Some(dir.path().join("no_such_lsf.csv"));

        let job = JobUnit {
            dataset: "gal".to_string(),
            path,
            config,
        };

        let engine = OptimizeEngine::new(job.config.optimizer.clone());
        let err = execute(&job, &engine).unwrap_err();
        assert_eq!(err.kind(), "source-access");
    }
}
