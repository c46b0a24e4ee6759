//! Command-line parsing for the batch SED fitter.
//!
//! Argument parsing stays separate from configuration resolution: this
//! module only mirrors the flags, `app::run_config_from_args` folds them
//! over the built-in defaults.
//!
//! Boolean options are tri-state: `--flag` forces true, `--no-flag` forces
//! false, and leaving both out keeps the component's built-in default.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::ModelType;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "sedfit",
    about = "Batch SED fitting over versioned record files"
)]
pub struct Cli {
    // --- I/O ---
    /// Single record file to fit.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Manifest listing one record file per line (batch mode).
    #[arg(long = "file-list", value_name = "PATH")]
    pub file_list: Option<PathBuf>,

    /// Result-name override (single-target runs).
    #[arg(long)]
    pub out: Option<String>,

    /// Folder for result JSON files.
    #[arg(long = "out-folder", value_name = "DIR")]
    pub out_folder: Option<PathBuf>,

    /// Version/partition label inside each record file.
    #[arg(long)]
    pub version: Option<String>,

    /// Instrumental dispersion (LSF) table, CSV with wavelength/R columns.
    #[arg(long = "dispersion-file", value_name = "PATH")]
    pub dispersion_file: Option<PathBuf>,

    /// Folder for per-dataset log files (with --logging-file).
    #[arg(long = "log-folder", value_name = "DIR")]
    pub log_folder: Option<PathBuf>,

    #[arg(long = "logging-file")]
    pub logging_file: bool,
    #[arg(long = "no-logging-file")]
    pub no_logging_file: bool,

    /// Honor the mask stored in each record file.
    #[arg(long = "use-mask")]
    pub use_mask: bool,
    #[arg(long = "no-use-mask")]
    pub no_use_mask: bool,

    // --- Data selection ---
    /// Include photometry in the fit.
    #[arg(long)]
    pub photometry: bool,
    #[arg(long = "no-photometry")]
    pub no_photometry: bool,

    /// Include spectroscopy in the fit.
    #[arg(long)]
    pub spectroscopy: bool,
    #[arg(long = "no-spectroscopy")]
    pub no_spectroscopy: bool,

    /// Filter non-finite/non-positive photometric entries.
    #[arg(long = "filter-photo")]
    pub filter_photo: bool,
    #[arg(long = "no-filter-photo")]
    pub no_filter_photo: bool,

    /// Filter non-finite/non-positive spectroscopic entries.
    #[arg(long = "filter-spec")]
    pub filter_spec: bool,
    #[arg(long = "no-filter-spec")]
    pub no_filter_spec: bool,

    /// Model photometric outliers with a wide mixture component.
    #[arg(long = "fit-outliers-photo")]
    pub fit_outliers_photo: bool,
    #[arg(long = "no-fit-outliers-photo")]
    pub no_fit_outliers_photo: bool,

    /// Model spectroscopic outliers with a wide mixture component.
    #[arg(long = "fit-outliers-spec")]
    pub fit_outliers_spec: bool,
    #[arg(long = "no-fit-outliers-spec")]
    pub no_fit_outliers_spec: bool,

    // --- Physics ---
    /// Model variant to build.
    #[arg(long = "model-type", value_enum)]
    pub model_type: Option<ModelType>,

    /// Redshift override; takes precedence over record metadata.
    #[arg(long)]
    pub redshift: Option<f64>,

    /// Pin the redshift instead of fitting it.
    #[arg(long = "fixed-z")]
    pub fixed_z: bool,
    #[arg(long = "no-fixed-z")]
    pub no_fixed_z: bool,

    /// Number of SFH age bins (continuity model).
    #[arg(long)]
    pub nbins: Option<usize>,

    /// Metallicity-interpolation mode.
    #[arg(long = "z-continuous")]
    pub z_continuous: Option<u8>,

    /// Include nebular emission.
    #[arg(long)]
    pub nebular: bool,
    #[arg(long = "no-nebular")]
    pub no_nebular: bool,

    /// Include dust emission.
    #[arg(long)]
    pub duste: bool,
    #[arg(long = "no-duste")]
    pub no_duste: bool,

    /// Include birth-cloud attenuation.
    #[arg(long)]
    pub dust1: bool,
    #[arg(long = "no-dust1")]
    pub no_dust1: bool,

    /// Include an AGN component.
    #[arg(long)]
    pub agn: bool,
    #[arg(long = "no-agn")]
    pub no_agn: bool,

    /// Apply instrumental smoothing (enables the dispersion file).
    #[arg(long)]
    pub sigmav: bool,
    #[arg(long = "no-sigmav")]
    pub no_sigmav: bool,

    // --- Engine selection ---
    /// Deterministic optimization engine.
    #[arg(long)]
    pub optimize: bool,
    #[arg(long = "no-optimize")]
    pub no_optimize: bool,

    /// Random-walk MCMC engine.
    #[arg(long)]
    pub emcee: bool,
    #[arg(long = "no-emcee")]
    pub no_emcee: bool,

    /// Nested-sampling engine (default).
    #[arg(long)]
    pub dynesty: bool,
    #[arg(long = "no-dynesty")]
    pub no_dynesty: bool,

    /// Seed for the sampling engines.
    #[arg(long)]
    pub seed: Option<u64>,

    // --- Presentation ---
    /// Debug-level diagnostics.
    #[arg(long)]
    pub verbose: bool,
    #[arg(long = "no-verbose")]
    pub no_verbose: bool,

    /// Print per-job fit summaries to stdout.
    #[arg(long)]
    pub interactive: bool,
    #[arg(long = "no-interactive")]
    pub no_interactive: bool,

    // --- Worker identity ---
    /// This worker's 0-based ordinal within the pool.
    #[arg(long = "worker-index", default_value_t = 0)]
    pub worker_index: usize,

    /// Total number of worker processes sharing the batch.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}
