//! Artifacts Module - Load-once model bundle
//!
//! Reads classifier, scaler and metadata, checks they belong together and
//! publishes them as one immutable `ArtifactBundle`.

pub mod metadata;
pub mod store;

use std::path::Path;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::logic::error::LoadError;

// Re-export common types
pub use metadata::Metadata;
pub use store::{ArtifactBundle, ArtifactStore, BundleInfo};

/// Read a JSON artifact, distinguishing missing / unreadable / malformed
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Hex SHA-256 of a file
pub fn file_checksum(path: &Path) -> Result<String, LoadError> {
    let bytes = read_bytes(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Compare a file against an expected hex digest
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), LoadError> {
    let actual = file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(LoadError::Checksum {
            path: path.to_path_buf(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"abc").unwrap();

        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(file_checksum(&path).unwrap(), digest);
        assert!(verify_checksum(&path, &digest.to_ascii_uppercase()).is_ok());
        assert!(matches!(
            verify_checksum(&path, "00"),
            Err(LoadError::Checksum { .. })
        ));
    }

    #[test]
    fn test_read_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(read_json::<serde_json::Value>(&missing), Err(LoadError::Missing(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, b"{").unwrap();
        assert!(matches!(read_json::<serde_json::Value>(&broken), Err(LoadError::Parse { .. })));
    }
}
