//! The validated, fit-ready observation bundle.
//!
//! Invariants (enforced by the validator, relied on by the engines):
//!
//! - within a modality, values, uncertainties, mask (and the wavelength axis)
//!   all have the same length
//! - every uncertainty at a `true` mask position is finite and strictly
//!   positive when filtering is enabled for that modality
//! - masked-out entries never enter a weighted objective: consumers iterate
//!   [`ModalityBlock::valid_indices`] rather than the raw arrays

/// One modality's cleaned, parallel arrays.
#[derive(Debug, Clone)]
pub struct ModalityBlock {
    /// Wavelength axis in Angstrom. For photometry these are the bands'
    /// effective wavelengths.
    pub wavelength: Vec<f64>,
    pub values: Vec<f64>,
    pub uncertainties: Vec<f64>,
    pub mask: Vec<bool>,
    /// Band labels (photometry only).
    pub bands: Option<Vec<String>>,
}

impl ModalityBlock {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of entries marked usable.
    pub fn n_valid(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Indices of the usable entries, in order.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| if m { Some(i) } else { None })
    }
}

/// The validated output of the observation pipeline for one dataset.
#[derive(Debug, Clone)]
pub struct ObservationBundle {
    pub dataset: String,
    pub photometry: Option<ModalityBlock>,
    pub spectroscopy: Option<ModalityBlock>,
    /// Resolved redshift (override > metadata). `None` means the model fits
    /// it as a free parameter from a zero initial value.
    pub redshift: Option<f64>,
}

impl ObservationBundle {
    /// Total usable data points across the enabled modalities.
    pub fn n_valid_total(&self) -> usize {
        self.photometry.as_ref().map_or(0, ModalityBlock::n_valid)
            + self.spectroscopy.as_ref().map_or(0, ModalityBlock::n_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(mask: &[bool]) -> ModalityBlock {
        ModalityBlock {
            wavelength: vec![1.0; mask.len()],
            values: vec![1.0; mask.len()],
            uncertainties: vec![0.1; mask.len()],
            mask: mask.to_vec(),
            bands: None,
        }
    }

    #[test]
    fn valid_indices_skip_masked_entries() {
        let b = block(&[true, false, true, false]);
        assert_eq!(b.valid_indices().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(b.n_valid(), 2);
    }

    #[test]
    fn bundle_counts_both_modalities() {
        let bundle = ObservationBundle {
            dataset: "g1".to_string(),
            photometry: Some(block(&[true, true])),
            spectroscopy: Some(block(&[true, false, false])),
            redshift: Some(0.5),
        };
        assert_eq!(bundle.n_valid_total(), 3);
    }
}
