//! Dataset loading and observation validation.
//!
//! - `loader`: read one raw record from a named source + version (I/O only)
//! - `validate`: turn a raw record into a clean, typed observation bundle
//! - `bands`: built-in effective wavelengths for common photometric bands

pub mod bands;
pub mod loader;
pub mod validate;

pub use loader::*;
pub use validate::*;
