//! Built-in photometric band table.
//!
//! Effective (pivot) wavelengths in Angstrom for the bands that show up in
//! typical extragalactic record files (JWST/NIRCam and HST/ACS+WFC3). Used
//! only when the record does not carry an explicit `wave_effective` field.

const BANDS: &[(&str, f64)] = &[
    // JWST / NIRCam
    ("f070w", 7_039.0),
    ("f090w", 9_022.0),
    ("f115w", 11_543.0),
    ("f150w", 15_007.0),
    ("f200w", 19_886.0),
    ("f277w", 27_617.0),
    ("f335m", 33_621.0),
    ("f356w", 35_684.0),
    ("f410m", 40_822.0),
    ("f444w", 44_043.0),
    // HST / ACS
    ("f435w", 4_329.0),
    ("f606w", 5_922.0),
    ("f775w", 7_693.0),
    ("f814w", 8_045.0),
    ("f850lp", 9_033.0),
    // HST / WFC3-IR
    ("f105w", 10_551.0),
    ("f125w", 12_486.0),
    ("f140w", 13_923.0),
    ("f160w", 15_369.0),
];

/// Look up the effective wavelength for a band name.
///
/// Matching is case-insensitive and tolerates instrument prefixes such as
/// `jwst_f200w` or `hst_wfc3_f160w` (the last `_`-separated token decides).
pub fn effective_wavelength(name: &str) -> Option<f64> {
    let key = name
        .rsplit('_')
        .next()
        .unwrap_or(name)
        .trim()
        .to_ascii_lowercase();
    BANDS
        .iter()
        .find(|(band, _)| *band == key)
        .map(|&(_, wave)| wave)
}
