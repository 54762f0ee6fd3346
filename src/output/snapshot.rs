//! Binary snapshots of rule results
//!
//! A snapshot lets a run be rendered later without access to the cluster.

use crate::check::RuleResults;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("could not write snapshot {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read snapshot {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode snapshot")]
    Encode(#[source] bincode::Error),

    #[error("could not decode snapshot")]
    Decode(#[source] bincode::Error),
}

pub fn encode(results: &RuleResults) -> Result<Vec<u8>, SnapshotError> {
    bincode::serialize(results).map_err(SnapshotError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<RuleResults, SnapshotError> {
    bincode::deserialize(bytes).map_err(SnapshotError::Decode)
}

/// Write results to a file, replacing it if it exists
pub fn save(path: &Path, results: &RuleResults) -> Result<(), SnapshotError> {
    let bytes = encode(results)?;
    std::fs::write(path, bytes).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Wrote {} rule results to {}", results.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<RuleResults, SnapshotError> {
    let bytes = std::fs::read(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes)
}
