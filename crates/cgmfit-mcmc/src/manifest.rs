use std::fs;
use std::path::{Path, PathBuf};

use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::{RunProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::FitConfig;

/// Structured manifest describing a completed or interrupted fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Layout version of this file.
    pub schema: SchemaVersion,
    /// Configuration used for the run.
    pub config: FitConfig,
    /// Hashes, seed and timestamp.
    pub provenance: RunProvenance,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Steps committed to the chain.
    pub steps_completed: usize,
    /// Set when the run ended on a stop request.
    pub interrupted: bool,
    /// Artefacts written next to the manifest (relative to the run directory).
    pub files: Vec<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), CgmError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| CgmError::io("manifest-mkdir", parent, err))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            CgmError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| CgmError::io("manifest-write", path, err))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, CgmError> {
        let contents =
            fs::read_to_string(path).map_err(|err| CgmError::io("manifest-read", path, err))?;
        serde_json::from_str(&contents).map_err(|err| {
            CgmError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

/// Hex SHA-256 of the JSON encoding of `value`.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, CgmError> {
    let bytes = serde_json::to_vec(value).map_err(|err| CgmError::serde("hash-serialize", err))?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}
