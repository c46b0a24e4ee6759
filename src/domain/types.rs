//! Shared domain types.
//!
//! These types are intentionally lightweight and (where useful) serializable
//! so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON result files
//! - printed in worker summaries

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A category of observational data, validated and fit independently but
/// combined into one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Photometry,
    Spectroscopy,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Photometry => write!(f, "photometry"),
            Modality::Spectroscopy => write!(f, "spectroscopy"),
        }
    }
}

/// Which physical model variant to build.
///
/// A closed set: adding a variant extends this enum (and the builder match),
/// not the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    /// Non-parametric star-formation history in `nbins` age bins.
    ContinuitySfh,
    /// Delayed-tau parametric star-formation history.
    ParametricSfh,
}

impl ModelType {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelType::ContinuitySfh => "ContinuitySFH",
            ModelType::ParametricSfh => "ParametricSFH",
        }
    }
}

/// Which engine runs the fit, resolved from the engine-selection flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Optimize,
    Mcmc,
    Nested,
}

impl EngineKind {
    pub fn display_name(self) -> &'static str {
        match self {
            EngineKind::Optimize => "optimize",
            EngineKind::Mcmc => "mcmc",
            EngineKind::Nested => "nested",
        }
    }
}

/// Nested-sampling tuning knobs.
#[derive(Debug, Clone, Serialize)]
pub struct NestedOptions {
    /// Number of live points.
    pub nlive: usize,
    /// Evidence tolerance: stop once the remaining contribution drops below it.
    pub dlogz: f64,
    /// Target effective sample size for the posterior estimate.
    pub target_n_effective: usize,
    /// Hard iteration cap.
    pub max_iter: usize,
    /// Random-walk steps per live-point replacement.
    pub walk_steps: usize,
}

impl Default for NestedOptions {
    fn default() -> Self {
        Self {
            nlive: 300,
            dlogz: 0.01,
            target_n_effective: 300,
            max_iter: 10_000,
            walk_steps: 25,
        }
    }
}

/// Random-walk MCMC tuning knobs.
#[derive(Debug, Clone, Serialize)]
pub struct McmcOptions {
    /// Total Metropolis steps.
    pub steps: usize,
    /// Steps discarded before acceptance statistics are accumulated.
    pub burn: usize,
    /// Proposal sigma as a fraction of each parameter's prior width.
    pub step_scale: f64,
}

impl Default for McmcOptions {
    fn default() -> Self {
        Self {
            steps: 2_000,
            burn: 500,
            step_scale: 0.05,
        }
    }
}

/// Coordinate-descent optimizer tuning knobs.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeOptions {
    /// Full sweeps over the free parameters.
    pub sweeps: usize,
    /// Grid evaluations per axis per sweep.
    pub grid_steps: usize,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            sweeps: 6,
            grid_steps: 16,
        }
    }
}

/// A full run's resolved configuration.
///
/// Built once from CLI flags plus built-in defaults, before any job starts;
/// passed by reference (or snapshot clone) into every component and never
/// mutated mid-batch.
#[derive(Debug, Clone)]
pub struct RunConfig {
    // --- I/O ---
    pub file: Option<PathBuf>,
    pub file_list: Option<PathBuf>,
    /// Result-name override (single-target runs only).
    pub out: Option<String>,
    pub out_folder: PathBuf,
    pub log_to_file: bool,
    pub log_folder: PathBuf,
    /// Version/partition label inside each record file.
    pub version: String,
    /// Honor the mask stored in the record file.
    pub use_mask: bool,
    pub dispersion_file: Option<PathBuf>,

    // --- Data selection ---
    pub use_photometry: bool,
    pub use_spectroscopy: bool,
    pub filter_photo: bool,
    pub filter_spec: bool,
    pub fit_outliers_photo: bool,
    pub fit_outliers_spec: bool,

    // --- Physics ---
    pub model_type: ModelType,
    /// Explicit redshift override; takes precedence over record metadata.
    pub redshift: Option<f64>,
    pub fixed_z: bool,
    /// Number of SFH age bins (continuity model).
    pub nbins: usize,
    /// Metallicity-interpolation mode, recorded in exports.
    pub z_continuous: u8,
    pub add_nebular: bool,
    pub add_duste: bool,
    pub add_dust1: bool,
    pub add_agn: bool,
    pub add_sigmav: bool,

    // --- Engine selection ---
    pub optimize: bool,
    pub emcee: bool,
    pub dynesty: bool,
    pub nested: NestedOptions,
    pub mcmc: McmcOptions,
    pub optimizer: OptimizeOptions,
    /// Seed for the sampling engines (deterministic re-runs).
    pub seed: u64,

    // --- Presentation ---
    pub verbose: bool,
    pub interactive: bool,

    // --- Worker identity (explicit, replaces any implicit rank lookup) ---
    pub worker_index: usize,
    pub worker_count: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            file: None,
            file_list: None,
            out: None,
            out_folder: PathBuf::from("results/out"),
            log_to_file: false,
            log_folder: PathBuf::from("results/log"),
            version: "V1".to_string(),
            use_mask: true,
            dispersion_file: None,

            use_photometry: true,
            use_spectroscopy: true,
            filter_photo: true,
            filter_spec: true,
            fit_outliers_photo: false,
            fit_outliers_spec: false,

            model_type: ModelType::ContinuitySfh,
            redshift: None,
            fixed_z: false,
            nbins: 8,
            z_continuous: 1,
            add_nebular: true,
            add_duste: true,
            add_dust1: true,
            add_agn: false,
            add_sigmav: true,

            optimize: false,
            emcee: false,
            dynesty: true,
            nested: NestedOptions::default(),
            mcmc: McmcOptions::default(),
            optimizer: OptimizeOptions::default(),
            seed: 42,

            verbose: true,
            interactive: false,

            worker_index: 0,
            worker_count: 1,
        }
    }
}

impl RunConfig {
    /// Resolve the engine-selection flags to a concrete engine kind.
    ///
    /// Nested sampling is preferred, then MCMC, then plain optimization,
    /// mirroring the defaults of the original tool. `None` means no engine
    /// is enabled, which is a setup error.
    pub fn engine_kind(&self) -> Option<EngineKind> {
        if self.dynesty {
            Some(EngineKind::Nested)
        } else if self.emcee {
            Some(EngineKind::Mcmc)
        } else if self.optimize {
            Some(EngineKind::Optimize)
        } else {
            None
        }
    }
}

/// The atomic piece of batch work: one dataset plus the configuration
/// snapshot it runs with. Created once per dataset at enumeration time,
/// never mutated.
#[derive(Debug, Clone)]
pub struct JobUnit {
    /// Dataset identifier (file stem, or the `--out` override).
    pub dataset: String,
    /// Path to the record file.
    pub path: PathBuf,
    /// Resolved configuration snapshot.
    pub config: RunConfig,
}

/// One fitted parameter in a result handle.
#[derive(Debug, Clone, Serialize)]
pub struct FittedParameter {
    pub name: String,
    pub values: Vec<f64>,
}

/// Result handle produced by a fitting engine for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct FitOutput {
    pub engine: EngineKind,
    /// Best-fit values for every free parameter.
    pub parameters: Vec<FittedParameter>,
    /// Best ln-posterior found.
    pub ln_prob: f64,
    /// Chi-square over the valid entries at the best position.
    pub chi2: f64,
    /// Number of valid data points used.
    pub n_valid: usize,
    /// Objective evaluations spent.
    pub evaluations: usize,
    /// Log-evidence estimate (nested sampling only).
    pub log_evidence: Option<f64>,
}

/// Final status of one job.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Success(FitOutput),
    Failure {
        kind: &'static str,
        message: String,
    },
}

/// Outcome of one job, recorded by the fault-isolation runner on every path.
/// Appended to the per-worker outcome log; never overwritten.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub dataset: String,
    pub duration: Duration,
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Success(_))
    }
}
