//! Observation validation and masking.
//!
//! This module turns a raw, untrusted record into a clean, typed
//! [`ObservationBundle`] that is safe to hand to a fitting engine.
//!
//! Mask policy: the derived validity mask is the logical AND of
//!
//! - the declared mask from the file (when `use_mask` is on and present)
//! - value is finite (when filtering is on for the modality)
//! - uncertainty is finite and strictly positive (when filtering is on)
//! - for spectroscopy: wavelength is finite and strictly positive
//!
//! so an externally supplied mask can narrow validity but never widen it
//! past physical plausibility. With filtering off, only the declared mask
//! applies, so deliberately flagged-but-fittable data stays in.
//!
//! Pure transformation: no side effects beyond log statements; every outcome
//! is the return value or the error.

use tracing::{debug, info, warn};

use crate::data::bands;
use crate::domain::{Modality, ModalityBlock, ObservationBundle, RunConfig};
use crate::error::ValidationError;
use crate::io::source::{FieldValue, RawRecord, Section};

/// Validate a raw record against the run configuration.
pub fn validate(
    dataset: &str,
    record: &RawRecord,
    config: &RunConfig,
) -> Result<ObservationBundle, ValidationError> {
    let photometry = if config.use_photometry {
        Some(validate_photometry(record, config)?)
    } else {
        None
    };

    let spectroscopy = if config.use_spectroscopy {
        Some(validate_spectroscopy(record, config)?)
    } else {
        None
    };

    let redshift = resolve_redshift(record, config)?;

    info!(
        dataset,
        phot_valid = photometry.as_ref().map(ModalityBlock::n_valid),
        spec_valid = spectroscopy.as_ref().map(ModalityBlock::n_valid),
        redshift,
        "validation complete"
    );

    Ok(ObservationBundle {
        dataset: dataset.to_string(),
        photometry,
        spectroscopy,
        redshift,
    })
}

fn validate_photometry(
    record: &RawRecord,
    config: &RunConfig,
) -> Result<ModalityBlock, ValidationError> {
    let modality = Modality::Photometry;
    let section = record
        .section(modality)
        .ok_or(ValidationError::MissingSection { modality })?;

    let flux = numeric_field(section, modality, "flux")?;
    let flux_err = numeric_field(section, modality, "flux_err")?;
    let n = flux.len();
    check_len(modality, "flux_err", n, flux_err.len())?;

    let band_names = string_field(section, modality, "filters")?;
    check_len(modality, "filters", n, band_names.len())?;

    // Effective wavelengths: an explicit field wins over the built-in table.
    let wavelength = match section.get("wave_effective") {
        Some(FieldValue::Numbers(w)) => {
            check_len(modality, "wave_effective", n, w.len())?;
            w.clone()
        }
        Some(_) => {
            return Err(ValidationError::WrongFieldType {
                modality,
                field: "wave_effective",
                expected: "a numeric array",
            });
        }
        None => band_names
            .iter()
            .map(|b| {
                bands::effective_wavelength(b).ok_or_else(|| ValidationError::UnknownBand(b.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    let mut mask = declared_mask(section, modality, config, n)?;
    if config.filter_photo {
        debug!("applying finiteness/positivity filters to photometry");
        for i in 0..n {
            mask[i] &= flux[i].is_finite() && flux_err[i].is_finite() && flux_err[i] > 0.0;
        }
    }

    finish_block(
        modality,
        ModalityBlock {
            wavelength,
            values: flux.to_vec(),
            uncertainties: flux_err.to_vec(),
            mask,
            bands: Some(band_names.to_vec()),
        },
    )
}

fn validate_spectroscopy(
    record: &RawRecord,
    config: &RunConfig,
) -> Result<ModalityBlock, ValidationError> {
    let modality = Modality::Spectroscopy;
    let section = record
        .section(modality)
        .ok_or(ValidationError::MissingSection { modality })?;

    let wavelength = numeric_field(section, modality, "wavelength")?;
    let flux = numeric_field(section, modality, "flux")?;
    let flux_err = numeric_field(section, modality, "flux_err")?;
    let n = flux.len();
    check_len(modality, "wavelength", n, wavelength.len())?;
    check_len(modality, "flux_err", n, flux_err.len())?;

    let mut mask = declared_mask(section, modality, config, n)?;
    if config.filter_spec {
        debug!("applying finiteness/positivity filters to spectroscopy");
        for i in 0..n {
            mask[i] &= flux[i].is_finite()
                && flux_err[i].is_finite()
                && flux_err[i] > 0.0
                && wavelength[i].is_finite()
                && wavelength[i] > 0.0;
        }
    }

    finish_block(
        modality,
        ModalityBlock {
            wavelength: wavelength.to_vec(),
            values: flux.to_vec(),
            uncertainties: flux_err.to_vec(),
            mask,
            bands: None,
        },
    )
}

/// Start from the declared mask when enabled and present, else all-true.
fn declared_mask(
    section: &Section,
    modality: Modality,
    config: &RunConfig,
    n: usize,
) -> Result<Vec<bool>, ValidationError> {
    if config.use_mask {
        if let Some(field) = section.get("mask") {
            let declared = field
                .as_numbers()
                .ok_or(ValidationError::WrongFieldType {
                    modality,
                    field: "mask",
                    expected: "a numeric or boolean array",
                })?;
            check_len(modality, "mask", n, declared.len())?;
            debug!(%modality, "using declared mask from the record");
            return Ok(declared.iter().map(|&v| v != 0.0).collect());
        }
    }
    Ok(vec![true; n])
}

/// A modality with no usable points is surfaced, never silently dropped.
fn finish_block(
    modality: Modality,
    block: ModalityBlock,
) -> Result<ModalityBlock, ValidationError> {
    let n_valid = block.n_valid();
    if n_valid == 0 {
        return Err(ValidationError::EmptyModality { modality });
    }
    debug!(%modality, n_valid, n_total = block.len(), "mask derived");
    Ok(block)
}

/// Redshift precedence: CLI override > record metadata > fail if the model
/// pins the redshift and none is available.
fn resolve_redshift(
    record: &RawRecord,
    config: &RunConfig,
) -> Result<Option<f64>, ValidationError> {
    if let Some(z) = config.redshift {
        if record
            .metadata
            .as_ref()
            .is_some_and(|m| m.contains("redshift"))
        {
            info!(z, "redshift override supplied; ignoring record metadata");
        }
        return Ok(Some(z));
    }

    if let Some(meta) = &record.metadata {
        if let Some(field) = meta.get("redshift") {
            match field.as_scalar() {
                Some(z) if z.is_finite() => {
                    info!(z, "redshift taken from record metadata");
                    return Ok(Some(z));
                }
                _ => warn!("record metadata carries an unusable redshift value"),
            }
        }
    }

    if config.fixed_z {
        return Err(ValidationError::MissingMetadata { name: "redshift" });
    }
    Ok(None)
}

fn numeric_field<'a>(
    section: &'a Section,
    modality: Modality,
    field: &'static str,
) -> Result<&'a [f64], ValidationError> {
    match section.get(field) {
        None => Err(ValidationError::MissingField { modality, field }),
        Some(FieldValue::Numbers(v)) => Ok(v),
        Some(_) => Err(ValidationError::WrongFieldType {
            modality,
            field,
            expected: "a numeric array",
        }),
    }
}

fn string_field<'a>(
    section: &'a Section,
    modality: Modality,
    field: &'static str,
) -> Result<&'a [String], ValidationError> {
    match section.get(field) {
        None => Err(ValidationError::MissingField { modality, field }),
        Some(FieldValue::Strings(v)) => Ok(v),
        Some(_) => Err(ValidationError::WrongFieldType {
            modality,
            field,
            expected: "a string array",
        }),
    }
}

fn check_len(
    modality: Modality,
    field: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), ValidationError> {
    if expected == found {
        Ok(())
    } else {
        Err(ValidationError::LengthMismatch {
            modality,
            field,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photometry_section(flux: &[f64], flux_err: &[f64]) -> Section {
        let mut s = Section::default();
        s.insert("flux", FieldValue::Numbers(flux.to_vec()));
        s.insert("flux_err", FieldValue::Numbers(flux_err.to_vec()));
        s.insert(
            "filters",
            FieldValue::Strings(
                ["f115w", "f200w", "f444w"][..flux.len()]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
        );
        s
    }

    fn spectroscopy_section(wave: &[f64], flux: &[f64], flux_err: &[f64]) -> Section {
        let mut s = Section::default();
        s.insert("wavelength", FieldValue::Numbers(wave.to_vec()));
        s.insert("flux", FieldValue::Numbers(flux.to_vec()));
        s.insert("flux_err", FieldValue::Numbers(flux_err.to_vec()));
        s
    }

    fn phot_only_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.use_spectroscopy = false;
        config
    }

    #[test]
    fn nan_flux_and_nonpositive_uncertainty_are_masked_out() {
        // The canonical scenario: flux=[1.0, NaN, 3.0], err=[0.1, 0.1, -0.2]
        // with filtering on yields mask [true, false, false].
        let record = RawRecord {
            photometry: Some(photometry_section(
                &[1.0, f64::NAN, 3.0],
                &[0.1, 0.1, -0.2],
            )),
            ..Default::default()
        };

        let bundle = validate("g", &record, &phot_only_config()).unwrap();
        let phot = bundle.photometry.unwrap();
        assert_eq!(phot.mask, vec![true, false, false]);
    }

    #[test]
    fn filtering_off_keeps_nonfinite_values_valid() {
        let record = RawRecord {
            photometry: Some(photometry_section(&[1.0, f64::NAN], &[0.1, 0.1])),
            ..Default::default()
        };

        let mut config = phot_only_config();
        config.filter_photo = false;

        let bundle = validate("g", &record, &config).unwrap();
        assert_eq!(bundle.photometry.unwrap().mask, vec![true, true]);
    }

    #[test]
    fn declared_mask_narrows_but_never_widens() {
        let mut section = photometry_section(&[1.0, 2.0, f64::INFINITY], &[0.1, 0.1, 0.1]);
        section.insert("mask", FieldValue::Numbers(vec![1.0, 0.0, 1.0]));
        let record = RawRecord {
            photometry: Some(section),
            ..Default::default()
        };

        // Filtering on: index 1 killed by the declared mask, index 2 by the
        // finiteness check despite the mask claiming it is fine.
        let bundle = validate("g", &record, &phot_only_config()).unwrap();
        assert_eq!(bundle.photometry.unwrap().mask, vec![true, false, false]);
    }

    #[test]
    fn declared_mask_alone_applies_when_filtering_off() {
        let mut section = photometry_section(&[1.0, 2.0, f64::INFINITY], &[0.1, 0.1, 0.1]);
        section.insert("mask", FieldValue::Numbers(vec![1.0, 0.0, 1.0]));
        let record = RawRecord {
            photometry: Some(section),
            ..Default::default()
        };

        let mut config = phot_only_config();
        config.filter_photo = false;

        let bundle = validate("g", &record, &config).unwrap();
        assert_eq!(bundle.photometry.unwrap().mask, vec![true, false, true]);
    }

    #[test]
    fn stored_mask_ignored_when_use_mask_off() {
        let mut section = photometry_section(&[1.0, 2.0], &[0.1, 0.1]);
        section.insert("mask", FieldValue::Numbers(vec![0.0, 0.0]));
        let record = RawRecord {
            photometry: Some(section),
            ..Default::default()
        };

        let mut config = phot_only_config();
        config.use_mask = false;

        let bundle = validate("g", &record, &config).unwrap();
        assert_eq!(bundle.photometry.unwrap().mask, vec![true, true]);
    }

    #[test]
    fn all_entries_invalid_is_an_empty_modality_error() {
        let record = RawRecord {
            photometry: Some(photometry_section(
                &[f64::NAN, f64::NAN],
                &[0.1, 0.1],
            )),
            ..Default::default()
        };

        let err = validate("g", &record, &phot_only_config()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::EmptyModality {
                modality: Modality::Photometry
            }
        ));
    }

    #[test]
    fn missing_field_names_field_and_modality() {
        let mut section = Section::default();
        section.insert("flux", FieldValue::Numbers(vec![1.0]));
        let record = RawRecord {
            photometry: Some(section),
            ..Default::default()
        };

        let err = validate("g", &record, &phot_only_config()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingField {
                modality: Modality::Photometry,
                field: "flux_err"
            }
        ));
    }

    #[test]
    fn requested_but_absent_modality_fails() {
        let record = RawRecord::default();
        let err = validate("g", &record, &phot_only_config()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSection { .. }));
    }

    #[test]
    fn mask_length_mismatch_is_rejected() {
        let mut section = photometry_section(&[1.0, 2.0], &[0.1, 0.1]);
        section.insert("mask", FieldValue::Numbers(vec![1.0]));
        let record = RawRecord {
            photometry: Some(section),
            ..Default::default()
        };

        let err = validate("g", &record, &phot_only_config()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::LengthMismatch {
                field: "mask",
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn spectroscopy_filter_also_checks_wavelengths() {
        let record = RawRecord {
            spectroscopy: Some(spectroscopy_section(
                &[4000.0, -1.0, f64::NAN],
                &[1.0, 1.0, 1.0],
                &[0.1, 0.1, 0.1],
            )),
            ..Default::default()
        };

        let mut config = RunConfig::default();
        config.use_photometry = false;

        let bundle = validate("g", &record, &config).unwrap();
        assert_eq!(
            bundle.spectroscopy.unwrap().mask,
            vec![true, false, false]
        );
    }

    #[test]
    fn redshift_override_beats_metadata() {
        let mut meta = Section::default();
        meta.insert("redshift", FieldValue::Scalar(2.0));
        let record = RawRecord {
            metadata: Some(meta),
            photometry: Some(photometry_section(&[1.0], &[0.1])),
            ..Default::default()
        };

        let mut config = phot_only_config();
        config.redshift = Some(0.5);

        let bundle = validate("g", &record, &config).unwrap();
        assert_eq!(bundle.redshift, Some(0.5));
    }

    #[test]
    fn metadata_redshift_used_when_no_override() {
        let mut meta = Section::default();
        meta.insert("redshift", FieldValue::Numbers(vec![1.8]));
        let record = RawRecord {
            metadata: Some(meta),
            photometry: Some(photometry_section(&[1.0], &[0.1])),
            ..Default::default()
        };

        let bundle = validate("g", &record, &phot_only_config()).unwrap();
        assert_eq!(bundle.redshift, Some(1.8));
    }

    #[test]
    fn fixed_z_without_any_redshift_fails() {
        let record = RawRecord {
            photometry: Some(photometry_section(&[1.0], &[0.1])),
            ..Default::default()
        };

        let mut config = phot_only_config();
        config.fixed_z = true;

        let err = validate("g", &record, &config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingMetadata { name: "redshift" }
        ));
    }

    #[test]
    fn unknown_band_fails_unless_wave_effective_is_present() {
        let mut section = Section::default();
        section.insert("flux", FieldValue::Numbers(vec![1.0]));
        section.insert("flux_err", FieldValue::Numbers(vec![0.1]));
        section.insert(
            "filters",
            FieldValue::Strings(vec!["mystery_band".to_string()]),
        );
        let record = RawRecord {
            photometry: Some(section.clone()),
            ..Default::default()
        };

        let err = validate("g", &record, &phot_only_config()).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownBand(_)));

        // With an explicit wave_effective the same band is acceptable.
        section.insert("wave_effective", FieldValue::Numbers(vec![12_345.0]));
        let record = RawRecord {
            photometry: Some(section),
            ..Default::default()
        };
        let bundle = validate("g", &record, &phot_only_config()).unwrap();
        assert_eq!(bundle.photometry.unwrap().wavelength, vec![12_345.0]);
    }
}
