//! Record-file access.
//!
//! A record file is a structured, hierarchical, array-capable container:
//! a JSON document whose top-level keys are version labels, each holding the
//! named sections ("Metadata", "Photometry", "Spectroscopy"), each section a
//! mapping from field name to a numeric array, scalar, or string array.
//!
//! Design goals:
//! - absence is reported distinctly from emptiness (`Option` vs empty map)
//! - `null` entries inside numeric arrays decode as NaN, so upstream
//!   missing-value markers survive the trip into the validator
//! - no semantic checks here; this module only answers "what is in the file"

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

use crate::domain::Modality;
use crate::error::SourceError;

/// A single field inside a record section.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Numbers(Vec<f64>),
    Scalar(f64),
    Strings(Vec<String>),
}

impl FieldValue {
    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            FieldValue::Numbers(v) => Some(v),
            _ => None,
        }
    }

    /// Scalar view; a one-element numeric array is accepted as a scalar,
    /// matching how single-value datasets are commonly stored.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FieldValue::Scalar(v) => Some(*v),
            FieldValue::Numbers(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            FieldValue::Strings(v) => Some(v),
            _ => None,
        }
    }
}

/// One named section of a raw record.
#[derive(Debug, Clone, Default)]
pub struct Section {
    fields: BTreeMap<String, FieldValue>,
}

impl Section {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Raw in-memory extraction of one version of a dataset file.
///
/// No guarantee of cleanliness: arrays may contain NaN/Inf, non-positive
/// uncertainties, or mismatched lengths. The validator deals with all of
/// that; this type only reflects file structure.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub metadata: Option<Section>,
    pub photometry: Option<Section>,
    pub spectroscopy: Option<Section>,
}

impl RawRecord {
    pub fn section(&self, modality: Modality) -> Option<&Section> {
        match modality {
            Modality::Photometry => self.photometry.as_ref(),
            Modality::Spectroscopy => self.spectroscopy.as_ref(),
        }
    }
}

/// Read one version group from a record file.
pub fn read_record(path: &Path, version: &str) -> Result<RawRecord, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| SourceError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let doc: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SourceError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let Some(group) = doc.get(version) else {
        return Err(SourceError::VersionNotFound {
            version: version.to_string(),
            path: path.to_path_buf(),
        });
    };

    Ok(RawRecord {
        metadata: extract_section(group.get("Metadata")),
        photometry: extract_section(group.get("Photometry")),
        spectroscopy: extract_section(group.get("Spectroscopy")),
    })
}

fn extract_section(value: Option<&Value>) -> Option<Section> {
    let obj = value?.as_object()?;
    let mut section = Section::default();
    for (name, v) in obj {
        if let Some(field) = convert_field(v) {
            section.insert(name.clone(), field);
        }
    }
    Some(section)
}

/// Convert one JSON value into a typed field.
///
/// Accepted shapes: number, bool, array of numbers/bools/nulls, array of
/// strings, or a single-key `{"data": ...}` wrapper (how scalar datasets are
/// sometimes exported). Anything else is ignored.
fn convert_field(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Number(n) => Some(FieldValue::Scalar(n.as_f64()?)),
        Value::Bool(b) => Some(FieldValue::Scalar(if *b { 1.0 } else { 0.0 })),
        Value::Array(items) => convert_array(items),
        Value::Object(obj) if obj.len() == 1 => convert_field(obj.get("data")?),
        _ => None,
    }
}

fn convert_array(items: &[Value]) -> Option<FieldValue> {
    if items.iter().all(Value::is_string) {
        let strings = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        return Some(FieldValue::Strings(strings));
    }

    let mut numbers = Vec::with_capacity(items.len());
    for item in items {
        let v = match item {
            Value::Number(n) => n.as_f64()?,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            // JSON cannot carry NaN; null is the conventional stand-in.
            Value::Null => f64::NAN,
            _ => return None,
        };
        numbers.push(v);
    }
    Some(FieldValue::Numbers(numbers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_record(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gal_0001.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_sections_and_decodes_null_as_nan() {
        let (_dir, path) = write_record(
            r#"{
                "V1": {
                    "Metadata": {"redshift": 1.25},
                    "Photometry": {
                        "flux": [1.0, null, 3.0],
                        "flux_err": [0.1, 0.1, -0.2],
                        "filters": ["f115w", "f200w", "f444w"]
                    },
                    "Spectroscopy": {"wavelength": [1.0], "flux": [2.0], "flux_err": [0.1]}
                }
            }"#,
        );

        let record = read_record(&path, "V1").unwrap();
        let phot = record.photometry.unwrap();
        let flux = phot.get("flux").unwrap().as_numbers().unwrap();
        assert_eq!(flux.len(), 3);
        assert!(flux[1].is_nan());

        let bands = phot.get("filters").unwrap().as_strings().unwrap();
        assert_eq!(bands[2], "f444w");

        let z = record
            .metadata
            .unwrap()
            .get("redshift")
            .unwrap()
            .as_scalar()
            .unwrap();
        assert!((z - 1.25).abs() < 1e-12);
    }

    #[test]
    fn missing_version_is_distinct_from_missing_file() {
        let (_dir, path) = write_record(r#"{"V2": {"Metadata": {}}}"#);

        match read_record(&path, "V1") {
            Err(SourceError::VersionNotFound { version, .. }) => assert_eq!(version, "V1"),
            other => panic!("expected VersionNotFound, got {other:?}"),
        }

        let missing = path.with_file_name("nope.json");
        assert!(matches!(
            read_record(&missing, "V1"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn scalar_wrapped_in_data_key_unwraps() {
        let (_dir, path) =
            write_record(r#"{"V1": {"Metadata": {"redshift": {"data": [0.7]}}}}"#);
        let record = read_record(&path, "V1").unwrap();
        let z = record
            .metadata
            .unwrap()
            .get("redshift")
            .unwrap()
            .as_scalar()
            .unwrap();
        assert!((z - 0.7).abs() < 1e-12);
    }

    #[test]
    fn absent_section_reported_as_none_not_empty() {
        let (_dir, path) = write_record(r#"{"V1": {"Photometry": {}}}"#);
        let record = read_record(&path, "V1").unwrap();
        assert!(record.spectroscopy.is_none());
        assert!(record.photometry.is_some_and(|s| s.is_empty()));
    }
}
