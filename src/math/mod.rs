//! Mathematical utilities: weighted least squares, Chebyshev basis, and
//! velocity-space Gaussian smoothing.

pub mod ols;
pub mod poly;
pub mod smooth;

pub use ols::*;
pub use poly::*;
pub use smooth::*;
