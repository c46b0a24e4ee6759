//! Reporting utilities: model parameter tables, fit summaries, and the
//! per-worker batch summary.

pub mod format;

pub use format::*;
