//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves the run configuration
//! - enumerates the batch (manifest or single file)
//! - runs this worker's share through the batch orchestrator
//! - prints the per-worker outcome summary
//!
//! Everything that can go wrong in here is process-fatal and happens before
//! any job starts; per-job failures never reach this level.

use std::path::PathBuf;

use clap::Parser;

use crate::cli::Cli;
use crate::domain::{JobUnit, RunConfig};
use crate::error::AppError;
use crate::io::manifest;

pub mod pipeline;

/// Entry point for the `sedfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = run_config_from_args(&cli)?;
    crate::logging::init_global(&config);

    let targets = resolve_targets(&config)?;
    let jobs = enumerate_jobs(&config, &targets);

    let outcomes = crate::batch::run_batch(
        &jobs,
        config.worker_index,
        config.worker_count,
        &crate::fit::build_engine,
    )?;

    // Per-job failures are already recorded in the outcomes; the process
    // itself exits cleanly once every assigned job has one.
    println!(
        "{}",
        crate::report::format_batch_summary(config.worker_index, &outcomes)
    );
    Ok(())
}

/// Fold the CLI flags over the built-in defaults into the immutable run
/// configuration.
pub fn run_config_from_args(args: &Cli) -> Result<RunConfig, AppError> {
    let d = RunConfig::default();

    let config = RunConfig {
        file: args.file.clone(),
        file_list: args.file_list.clone(),
        out: args.out.clone(),
        out_folder: args.out_folder.clone().unwrap_or(d.out_folder),
        log_to_file: tri(args.logging_file, args.no_logging_file, d.log_to_file),
        log_folder: args.log_folder.clone().unwrap_or(d.log_folder),
        version: args.version.clone().unwrap_or(d.version),
        use_mask: tri(args.use_mask, args.no_use_mask, d.use_mask),
        dispersion_file: args.dispersion_file.clone(),

        use_photometry: tri(args.photometry, args.no_photometry, d.use_photometry),
        use_spectroscopy: tri(args.spectroscopy, args.no_spectroscopy, d.use_spectroscopy),
        filter_photo: tri(args.filter_photo, args.no_filter_photo, d.filter_photo),
        filter_spec: tri(args.filter_spec, args.no_filter_spec, d.filter_spec),
        fit_outliers_photo: tri(
            args.fit_outliers_photo,
            args.no_fit_outliers_photo,
            d.fit_outliers_photo,
        ),
        fit_outliers_spec: tri(
            args.fit_outliers_spec,
            args.no_fit_outliers_spec,
            d.fit_outliers_spec,
        ),

        model_type: args.model_type.unwrap_or(d.model_type),
        redshift: args.redshift,
        fixed_z: tri(args.fixed_z, args.no_fixed_z, d.fixed_z),
        nbins: args.nbins.unwrap_or(d.nbins),
        z_continuous: args.z_continuous.unwrap_or(d.z_continuous),
        add_nebular: tri(args.nebular, args.no_nebular, d.add_nebular),
        add_duste: tri(args.duste, args.no_duste, d.add_duste),
        add_dust1: tri(args.dust1, args.no_dust1, d.add_dust1),
        add_agn: tri(args.agn, args.no_agn, d.add_agn),
        add_sigmav: tri(args.sigmav, args.no_sigmav, d.add_sigmav),

        optimize: tri(args.optimize, args.no_optimize, d.optimize),
        emcee: tri(args.emcee, args.no_emcee, d.emcee),
        dynesty: tri(args.dynesty, args.no_dynesty, d.dynesty),
        nested: d.nested,
        mcmc: d.mcmc,
        optimizer: d.optimizer,
        seed: args.seed.unwrap_or(d.seed),

        verbose: tri(args.verbose, args.no_verbose, d.verbose),
        interactive: tri(args.interactive, args.no_interactive, d.interactive),

        worker_index: args.worker_index,
        worker_count: args.workers,
    };

    validate_config(&config)?;
    Ok(config)
}

/// Tri-state resolution: `--flag` wins, then `--no-flag`, then the default.
fn tri(on: bool, off: bool, default: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        default
    }
}

/// Malformed configurations are rejected here, before any job begins.
fn validate_config(config: &RunConfig) -> Result<(), AppError> {
    if config.worker_count == 0 {
        return Err(AppError::new(2, "Worker count must be at least 1."));
    }
    if config.worker_index >= config.worker_count {
        return Err(AppError::new(
            2,
            format!(
                "Worker index {} out of range for {} worker(s).",
                config.worker_index, config.worker_count
            ),
        ));
    }
    if config.engine_kind().is_none() {
        return Err(AppError::new(
            2,
            "No fitting engine enabled; pass --optimize, --emcee, or --dynesty.",
        ));
    }
    if !config.use_photometry && !config.use_spectroscopy {
        return Err(AppError::new(
            2,
            "No data selected; enable --photometry and/or --spectroscopy.",
        ));
    }
    if config.nbins < 2 {
        return Err(AppError::new(2, "--nbins must be at least 2."));
    }
    Ok(())
}

/// The batch enumeration: the manifest order when a file list is given,
/// else the single `--file` target.
fn resolve_targets(config: &RunConfig) -> Result<Vec<PathBuf>, AppError> {
    if let Some(list) = &config.file_list {
        let targets = manifest::read_manifest(list)?;
        if targets.is_empty() {
            return Err(AppError::new(
                2,
                format!("Manifest '{}' contains no targets.", list.display()),
            ));
        }
        return Ok(targets);
    }

    if let Some(file) = &config.file {
        return Ok(vec![file.clone()]);
    }

    Err(AppError::new(
        2,
        "No targets found. Provide --file or --file-list.",
    ))
}

/// Build one immutable job unit per target. The `--out` name override only
/// applies to single-target runs; batch targets keep their file stems.
fn enumerate_jobs(config: &RunConfig, targets: &[PathBuf]) -> Vec<JobUnit> {
    let single = targets.len() == 1;

    targets
        .iter()
        .map(|path| {
            let dataset = match (&config.out, single) {
                (Some(name), true) => name.clone(),
                _ => manifest::dataset_name(path),
            };
            JobUnit {
                dataset,
                path: path.clone(),
                config: config.clone(),
            }
        })
        .collect()
}
