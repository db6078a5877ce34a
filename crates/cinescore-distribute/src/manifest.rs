//! Generation manifest of the distributed artifact set.
//!
//! The manifest is uploaded after the artifacts it describes. A reader that
//! sees a manifest can check every artifact against its digest and knows the
//! set belongs to one generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use cinescore_core::error::Result;
use cinescore_core::layout::ArtifactKind;
use cinescore_core::types::RunDate;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// One artifact of a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Artifact file name, e.g. `best_model.json`.
    pub name: String,
    /// Object key inside the bucket.
    pub key: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// `{run-date}-{uuid}`.
    pub generation: String,
    pub published_at: DateTime<Utc>,
    pub artifacts: Vec<ManifestEntry>,
}

impl Manifest {
    /// Describe a new generation from `(kind, key, contents)` triples.
    pub fn new<'a, I>(date: RunDate, artifacts: I) -> Self
    where
        I: IntoIterator<Item = (ArtifactKind, String, &'a [u8])>,
    {
        let artifacts = artifacts
            .into_iter()
            .map(|(kind, key, bytes)| ManifestEntry {
                name: kind.file_name().to_string(),
                key,
                sha256: sha256_hex(bytes),
                bytes: bytes.len() as u64,
            })
            .collect();
        Self {
            generation: format!("{}-{}", date, Uuid::new_v4()),
            published_at: Utc::now(),
            artifacts,
        }
    }

    pub fn entry(&self, kind: ArtifactKind) -> Option<&ManifestEntry> {
        self.artifacts.iter().find(|e| e.name == kind.file_name())
    }

    /// Whether `bytes` are the contents recorded for `kind`. An artifact the
    /// manifest does not list never matches.
    pub fn matches(&self, kind: ArtifactKind, bytes: &[u8]) -> bool {
        self.entry(kind).is_some_and(|entry| {
            entry.bytes == bytes.len() as u64 && entry.sha256 == sha256_hex(bytes)
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
