//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums and the resolved run configuration (`RunConfig`)
//! - the validated observation bundle (`ObservationBundle`)
//! - batch value types (`JobUnit`, `JobOutcome`, `FitOutput`)

pub mod bundle;
pub mod types;

pub use bundle::*;
pub use types::*;
