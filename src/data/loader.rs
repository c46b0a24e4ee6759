//! Dataset loading.
//!
//! The loader is a pure I/O boundary: it resolves the configured version
//! inside the record file and pulls the sections into memory. It performs no
//! validation beyond structural presence; data-quality questions belong to
//! the validator, so I/O failures and data failures stay distinct error
//! kinds.

use tracing::{debug, info};

use crate::domain::JobUnit;
use crate::error::SourceError;
use crate::io::source::{RawRecord, read_record};

/// Load the raw record for one job.
pub fn load_record(job: &JobUnit) -> Result<RawRecord, SourceError> {
    info!(
        dataset = %job.dataset,
        path = %job.path.display(),
        version = %job.config.version,
        "loading record"
    );

    let record = read_record(&job.path, &job.config.version)?;

    debug!(
        metadata = record.metadata.is_some(),
        photometry = record.photometry.is_some(),
        spectroscopy = record.spectroscopy.is_some(),
        "record sections present"
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunConfig;
    use std::path::PathBuf;

    fn job(path: PathBuf, version: &str) -> JobUnit {
        let mut config = RunConfig::default();
        config.version = version.to_string();
        JobUnit {
            dataset: "gal".to_string(),
            path,
            config,
        }
    }

    #[test]
    fn surfaces_version_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gal.json");
        std::fs::write(&path, r#"{"V1": {"Metadata": {}}}"#).unwrap();

        let err = load_record(&job(path, "V9")).unwrap_err();
        assert!(matches!(err, SourceError::VersionNotFound { .. }));
    }

    #[test]
    fn loads_present_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gal.json");
        std::fs::write(
            &path,
            r#"{"V1": {"Photometry": {"flux": [1.0]}, "Metadata": {"redshift": 0.3}}}"#,
        )
        .unwrap();

        let record = load_record(&job(path, "V1")).unwrap();
        assert!(record.photometry.is_some());
        assert!(record.spectroscopy.is_none());
    }
}
