//! Instrumental dispersion (LSF) tables.
//!
//! The dispersion file is a two-column CSV: wavelength in micron and
//! resolving power R. We convert R to a velocity sigma
//! (`sigma_v = c / (R * 2.355)`), interpolate it onto the observed
//! wavelength grid, and subtract the stellar-library resolution in
//! quadrature so the model is only broadened by what the library does not
//! already carry.

use std::path::Path;

use crate::error::SourceError;

pub const LIGHTSPEED_KMS: f64 = 2.998e5;
const FWHM_TO_SIGMA: f64 = 2.355;

/// Rest-frame resolution of the stellar library (FWHM, Angstrom).
const LIBRARY_FWHM_AA: f64 = 2.54;
/// Rest-frame validity window of the library resolution (Angstrom).
const LIBRARY_WAVE_MIN_AA: f64 = 3525.0;
const LIBRARY_WAVE_MAX_AA: f64 = 7500.0;

/// Instrumental resolution as a velocity sigma per wavelength.
#[derive(Debug, Clone)]
pub struct DispersionTable {
    /// Ascending wavelengths in micron.
    wavelength_um: Vec<f64>,
    /// Velocity sigma (km/s) at each table wavelength.
    sigma_v: Vec<f64>,
}

impl DispersionTable {
    /// Load a dispersion table from CSV with `wavelength` and `r` columns.
    pub fn from_csv(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::DispersionNotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| SourceError::DispersionInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| SourceError::DispersionInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .clone();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
        };
        let wave_idx = find("wavelength").ok_or_else(|| SourceError::DispersionInvalid {
            path: path.to_path_buf(),
            message: "missing 'wavelength' column".to_string(),
        })?;
        let r_idx = find("r").ok_or_else(|| SourceError::DispersionInvalid {
            path: path.to_path_buf(),
            message: "missing 'r' column".to_string(),
        })?;

        let mut rows: Vec<(f64, f64)> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SourceError::DispersionInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let parse = |idx: usize| record.get(idx).and_then(|s| s.parse::<f64>().ok());
            if let (Some(w), Some(r)) = (parse(wave_idx), parse(r_idx)) {
                // Rows with non-physical resolving power carry no information.
                if w.is_finite() && r.is_finite() && w > 0.0 && r > 0.0 {
                    rows.push((w, r));
                }
            }
        }

        if rows.len() < 2 {
            return Err(SourceError::DispersionInvalid {
                path: path.to_path_buf(),
                message: format!("need at least 2 usable rows, found {}", rows.len()),
            });
        }

        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let wavelength_um = rows.iter().map(|&(w, _)| w).collect();
        let sigma_v = rows
            .iter()
            .map(|&(_, r)| LIGHTSPEED_KMS / (r * FWHM_TO_SIGMA))
            .collect();

        Ok(Self {
            wavelength_um,
            sigma_v,
        })
    }

    /// Evaluate the instrumental velocity sigma at observed wavelengths
    /// (Angstrom). Linear interpolation, flat extrapolation at the edges.
    pub fn sigma_v_at(&self, wave_obs_aa: &[f64]) -> Vec<f64> {
        wave_obs_aa
            .iter()
            .map(|&w_aa| self.interp(w_aa / 1.0e4))
            .collect()
    }

    fn interp(&self, w_um: f64) -> f64 {
        let xs = &self.wavelength_um;
        let ys = &self.sigma_v;
        if !w_um.is_finite() || w_um <= xs[0] {
            return ys[0];
        }
        if w_um >= xs[xs.len() - 1] {
            return ys[ys.len() - 1];
        }
        let hi = xs.partition_point(|&x| x < w_um).max(1);
        let (x0, x1) = (xs[hi - 1], xs[hi]);
        let (y0, y1) = (ys[hi - 1], ys[hi]);
        let u = (w_um - x0) / (x1 - x0);
        y0 + u * (y1 - y0)
    }
}

/// Quadrature difference between instrument and library resolution.
///
/// Returns the per-pixel extra broadening (km/s) the model must apply on the
/// observed grid: zero where the library is already at least as broad as the
/// instrument, or where the rest-frame wavelength falls outside the library's
/// validity window.
pub fn library_delta_v(wave_obs_aa: &[f64], sigma_v: &[f64], redshift: f64) -> Vec<f64> {
    let zred = if redshift.is_finite() { redshift } else { 0.0 };

    wave_obs_aa
        .iter()
        .zip(sigma_v)
        .map(|(&w_obs, &sv)| {
            if !(sv > 0.0) {
                return 0.0;
            }
            let w_rest = w_obs / (1.0 + zred);
            if !(LIBRARY_WAVE_MIN_AA..=LIBRARY_WAVE_MAX_AA).contains(&w_rest) {
                return 0.0;
            }
            let sv_lib = LIGHTSPEED_KMS * LIBRARY_FWHM_AA / (FWHM_TO_SIGMA * w_rest);
            (sv * sv - sv_lib * sv_lib).max(0.0).sqrt()
        })
        .collect()
}
