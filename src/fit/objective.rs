//! The fit objective: masked, weighted ln-posterior.
//!
//! Only entries whose validity mask is `true` contribute. This is the
//! mechanism that keeps masked-out values inert no matter what garbage they
//! hold. Spectroscopy predictions are put through the polynomial calibration
//! step (weighted OLS on a Chebyshev basis) before residuals are formed,
//! and per-modality outlier mixtures widen the tails when enabled.

use nalgebra::{DMatrix, DVector};

use crate::domain::{ModalityBlock, ObservationBundle};
use crate::math::{chebyshev_row, normalize_domain, solve_weighted_least_squares};
use crate::models::{PhysicalModel, Predicted};

/// Maximum calibration order we will ever solve, regardless of the model's
/// `polyorder` parameter.
const MAX_POLYORDER: usize = 20;

pub struct Objective<'a> {
    bundle: &'a ObservationBundle,
    model: &'a PhysicalModel,
    polyorder: usize,
}

impl<'a> Objective<'a> {
    pub fn new(bundle: &'a ObservationBundle, model: &'a PhysicalModel) -> Self {
        let polyorder = model
            .params
            .iter()
            .find(|p| p.name == "polyorder")
            .and_then(|p| p.init.first().copied())
            .map(|v| (v.max(0.0) as usize).min(MAX_POLYORDER))
            .unwrap_or(0);

        Self {
            bundle,
            model,
            polyorder,
        }
    }

    /// Total valid data points across the enabled modalities.
    pub fn n_valid(&self) -> usize {
        self.bundle.n_valid_total()
    }

    /// Log prior + log likelihood; `-inf` whenever the position is outside
    /// the prior support or produces unusable predictions.
    pub fn ln_posterior(&self, theta: &[f64]) -> f64 {
        let lp = self.model.ln_prior(theta);
        if !lp.is_finite() {
            return f64::NEG_INFINITY;
        }
        lp + self.ln_likelihood(theta)
    }

    /// Log likelihood over the valid entries.
    pub fn ln_likelihood(&self, theta: &[f64]) -> f64 {
        let predicted = self.predicted(theta);
        let view = self.model.view(theta);

        let mut total = 0.0;

        if let (Some(block), Some(pred)) =
            (self.bundle.photometry.as_ref(), predicted.photometry.as_ref())
        {
            let f_out = view.scalar("f_outlier_phot").unwrap_or(0.0);
            let nsigma = view.scalar("nsigma_outlier_phot").unwrap_or(50.0);
            total += ln_block(block, pred, f_out, nsigma, 1.0);
        }

        if let (Some(block), Some(pred)) = (
            self.bundle.spectroscopy.as_ref(),
            predicted.spectroscopy.as_ref(),
        ) {
            let f_out = view.scalar("f_outlier_spec").unwrap_or(0.0);
            let nsigma = view.scalar("nsigma_outlier_spec").unwrap_or(50.0);
            let jitter = view.scalar("spec_jitter").unwrap_or(1.0).max(1e-3);
            total += ln_block(block, pred, f_out, nsigma, jitter);
        }

        total
    }

    /// Plain chi-square over the valid entries (no priors, no mixtures).
    pub fn chi2(&self, theta: &[f64]) -> f64 {
        let predicted = self.predicted(theta);
        let mut total = 0.0;

        for (block, pred) in [
            (self.bundle.photometry.as_ref(), predicted.photometry),
            (self.bundle.spectroscopy.as_ref(), predicted.spectroscopy),
        ] {
            let (Some(block), Some(pred)) = (block, pred) else {
                continue;
            };
            for i in block.valid_indices() {
                let r = (block.values[i] - pred[i]) / block.uncertainties[i];
                if r.is_finite() {
                    total += r * r;
                }
            }
        }

        total
    }

    /// Model predictions with spectral calibration applied.
    fn predicted(&self, theta: &[f64]) -> Predicted {
        let mut predicted = self.model.predict(theta, self.bundle);

        if let (Some(block), Some(pred)) = (
            self.bundle.spectroscopy.as_ref(),
            predicted.spectroscopy.as_mut(),
        ) {
            self.calibrate_spectrum(block, pred);
        }

        predicted
    }

    /// Fit a Chebyshev scale polynomial to absorb smooth calibration
    /// mismatch between the model spectrum and the observed one.
    ///
    /// Skipped when disabled (order 0), underdetermined, or unsolvable; in
    /// those cases the raw prediction stands.
    fn calibrate_spectrum(&self, block: &ModalityBlock, pred: &mut [f64]) {
        let ncoef = self.polyorder + 1;
        if self.polyorder == 0 {
            return;
        }

        let valid: Vec<usize> = block
            .valid_indices()
            .filter(|&i| pred[i].is_finite())
            .collect();
        if valid.len() < 2 * ncoef {
            return;
        }

        let u = normalize_domain(&block.wavelength);
        let mut row = vec![0.0; ncoef];

        let mut x = DMatrix::zeros(valid.len(), ncoef);
        let mut y = DVector::zeros(valid.len());
        let mut w = DVector::zeros(valid.len());
        for (r, &i) in valid.iter().enumerate() {
            chebyshev_row(u[i], &mut row);
            for (c, &t) in row.iter().enumerate() {
                x[(r, c)] = pred[i] * t;
            }
            y[r] = block.values[i];
            let sigma = block.uncertainties[i];
            w[r] = 1.0 / (sigma * sigma);
        }

        let Some(coef) = solve_weighted_least_squares(&x, &y, &w) else {
            return;
        };

        for (i, p) in pred.iter_mut().enumerate() {
            if !p.is_finite() {
                continue;
            }
            chebyshev_row(u[i], &mut row);
            let scale: f64 = row.iter().zip(coef.iter()).map(|(t, c)| t * c).sum();
            *p *= scale;
        }
    }
}

/// Masked, weighted log likelihood of one modality, with an optional
/// outlier mixture (`f_out` of the points drawn from an `nsigma`-wider
/// Gaussian).
fn ln_block(block: &ModalityBlock, pred: &[f64], f_out: f64, nsigma: f64, jitter: f64) -> f64 {
    let f_out = f_out.clamp(0.0, 0.999);
    let mut total = 0.0;

    for i in block.valid_indices() {
        let sigma = block.uncertainties[i] * jitter;
        let r = (block.values[i] - pred[i]) / sigma;
        if !r.is_finite() {
            return f64::NEG_INFINITY;
        }

        let ln_core = -0.5 * r * r - sigma.ln();
        total += if f_out > 0.0 {
            let rn = r / nsigma;
            let ln_out = -0.5 * rn * rn - (sigma * nsigma).ln();
            let a = (1.0 - f_out).ln() + ln_core;
            let b = f_out.ln() + ln_out;
            let m = a.max(b);
            m + ((a - m).exp() + (b - m).exp()).ln()
        } else {
            ln_core
        };
    }

    total
}
