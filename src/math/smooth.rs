//! Velocity-space Gaussian smoothing.
//!
//! Spectra are broadened by a Gaussian kernel whose width is expressed as a
//! velocity sigma per output pixel, so the kernel width in wavelength grows
//! proportionally to wavelength. The kernel is truncated at 4 sigma.

use crate::io::dispersion::LIGHTSPEED_KMS;

const KERNEL_TRUNCATION_SIGMA: f64 = 4.0;

/// Smooth `flux` sampled at `wave` with a per-pixel velocity sigma (km/s).
///
/// Pixels with a non-positive or non-finite sigma pass through unchanged.
/// Input lengths must agree.
pub fn gaussian_smooth_velocity(wave: &[f64], flux: &[f64], sigma_v: &[f64]) -> Vec<f64> {
    debug_assert_eq!(wave.len(), flux.len());
    debug_assert_eq!(wave.len(), sigma_v.len());

    let n = wave.len();
    let mut out = vec![0.0; n];

    for i in 0..n {
        let sv = sigma_v[i];
        if !(sv.is_finite() && sv > 0.0) || !wave[i].is_finite() {
            out[i] = flux[i];
            continue;
        }

        let sigma_aa = wave[i] * sv / LIGHTSPEED_KMS;
        let window = KERNEL_TRUNCATION_SIGMA * sigma_aa;

        let mut acc = 0.0;
        let mut norm = 0.0;
        for j in 0..n {
            if !wave[j].is_finite() || !flux[j].is_finite() {
                continue;
            }
            let d = wave[j] - wave[i];
            if d.abs() > window {
                continue;
            }
            let arg = d / sigma_aa;
            let k = (-0.5 * arg * arg).exp();
            acc += k * flux[j];
            norm += k;
        }

        out[i] = if norm > 0.0 { acc / norm } else { flux[i] };
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sigma_is_identity() {
        let wave: Vec<f64> = (0..10).map(|i| 5000.0 + i as f64).collect();
        let flux: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let sigma = vec![0.0; 10];

        assert_eq!(gaussian_smooth_velocity(&wave, &flux, &sigma), flux);
    }

    #[test]
    fn smoothing_reduces_a_spike() {
        let wave: Vec<f64> = (0..41).map(|i| 5000.0 + i as f64).collect();
        let mut flux = vec![1.0; 41];
        flux[20] = 10.0;
        // sigma_v of 120 km/s at 5000 AA is a ~2 AA kernel.
        let sigma = vec![120.0; 41];

        let smoothed = gaussian_smooth_velocity(&wave, &flux, &sigma);
        assert!(smoothed[20] < flux[20]);
        assert!(smoothed[18] > 1.0);

        // Flux is roughly conserved away from the edges.
        let total_in: f64 = flux.iter().sum();
        let total_out: f64 = smoothed.iter().sum();
        assert!((total_in - total_out).abs() / total_in < 0.05);
    }
}
