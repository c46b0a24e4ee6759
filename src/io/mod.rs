//! Input/output helpers.
//!
//! - hierarchical record-file access (`source`)
//! - batch manifest parsing (`manifest`)
//! - instrumental dispersion (LSF) tables (`dispersion`)
//! - per-dataset result exports (`export`)

pub mod dispersion;
pub mod export;
pub mod manifest;
pub mod source;

pub use dispersion::*;
pub use export::*;
pub use manifest::*;
pub use source::*;
