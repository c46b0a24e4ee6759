//! Weighted least squares solver.
//!
//! The spectral calibration step repeatedly solves small linear problems of
//! the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T c)^2
//! ```
//!
//! Implementation choices:
//! - rows are scaled by `sqrt(w_i)` and the plain least-squares problem is
//!   solved by SVD, which stays robust for tall matrices and the nearly
//!   collinear columns a high-order calibration basis can produce
//! - progressively looser tolerances are tried before giving up

use nalgebra::{DMatrix, DVector};

/// Solve the weighted least-squares problem. Returns `None` if the system is
/// too ill-conditioned to solve robustly.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &DVector<f64>,
) -> Option<DVector<f64>> {
    debug_assert_eq!(x.nrows(), y.len());
    debug_assert_eq!(x.nrows(), w.len());

    let mut xs = x.clone();
    let mut ys = y.clone();
    for i in 0..xs.nrows() {
        let s = w[i].max(0.0).sqrt();
        ys[i] *= s;
        for j in 0..xs.ncols() {
            xs[(i, j)] *= s;
        }
    }

    let svd = xs.svd(true, true);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(c) = svd.solve(&ys, tol) {
            if c.iter().all(|v| v.is_finite()) {
                return Some(c);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_line_with_uniform_weights() {
        // y = 2 + 3x on x = [0, 1, 2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let w = DVector::from_element(3, 1.0);

        let c = solve_weighted_least_squares(&x, &y, &w).unwrap();
        assert!((c[0] - 2.0).abs() < 1e-10);
        assert!((c[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_weight_rows_do_not_influence_the_solution() {
        // Third row is wildly off but carries zero weight.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 1000.0, 11.0]);
        let w = DVector::from_row_slice(&[1.0, 1.0, 0.0, 1.0]);

        let c = solve_weighted_least_squares(&x, &y, &w).unwrap();
        assert!((c[0] - 2.0).abs() < 1e-8);
        assert!((c[1] - 3.0).abs() < 1e-8);
    }
}
