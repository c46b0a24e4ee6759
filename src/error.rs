//! Error types.
//!
//! Two disjoint families, matching the two failure scopes of the batch:
//!
//! - [`AppError`]: process-fatal. Raised only while setting the batch up
//!   (arguments, manifest, worker identity). Carries a CLI exit code.
//! - [`JobError`]: job-fatal. Anything that goes wrong while processing one
//!   dataset. These are converted into recorded outcomes by the
//!   fault-isolation runner and never abort the batch.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Modality;

/// Process-fatal error carrying the exit code for the `sedfit` binary.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure accessing a dataset record or an auxiliary input file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("dataset file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a valid record file: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("version '{version}' not found in '{path}'")]
    VersionNotFound { version: String, path: PathBuf },

    #[error("dispersion file not found: {0}")]
    DispersionNotFound(PathBuf),

    #[error("invalid dispersion table '{path}': {message}")]
    DispersionInvalid { path: PathBuf, message: String },
}

/// Failure turning a raw record into a fit-ready observation bundle.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{modality} requested but not present in the record")]
    MissingSection { modality: Modality },

    #[error("{modality}: required field '{field}' is missing")]
    MissingField {
        modality: Modality,
        field: &'static str,
    },

    #[error("{modality}: field '{field}' is not usable as {expected}")]
    WrongFieldType {
        modality: Modality,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{modality}: '{field}' has length {found}, expected {expected}")]
    LengthMismatch {
        modality: Modality,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{modality}: no valid entries remain after masking")]
    EmptyModality { modality: Modality },

    #[error("required metadata '{name}' is missing")]
    MissingMetadata { name: &'static str },

    #[error("unknown photometric band '{0}' and no 'wave_effective' field")]
    UnknownBand(String),
}

/// Opaque failure surfaced by a fitting engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Failed(String),

    #[error("model has no free parameters to fit")]
    NoFreeParameters,

    #[error("objective is not finite at the initial position")]
    NonFiniteObjective,
}

/// Any job-fatal failure.
///
/// The fault-isolation runner is the only place these are swallowed; every
/// other component propagates them with `?`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("fitting engine: {0}")]
    Engine(#[from] EngineError),

    #[error("failed to write result '{path}': {message}")]
    Export { path: PathBuf, message: String },
}

impl JobError {
    /// Short machine-readable kind, used in outcome logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Source(_) => "source-access",
            JobError::Validation(e) => match e {
                ValidationError::MissingSection { .. } => "missing-section",
                ValidationError::MissingField { .. } => "missing-field",
                ValidationError::WrongFieldType { .. } => "field-type",
                ValidationError::LengthMismatch { .. } => "length-mismatch",
                ValidationError::EmptyModality { .. } => "empty-modality",
                ValidationError::MissingMetadata { .. } => "missing-metadata",
                ValidationError::UnknownBand(_) => "unknown-band",
            },
            JobError::Engine(_) => "engine",
            JobError::Export { .. } => "export",
        }
    }
}
