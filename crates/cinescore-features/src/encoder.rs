//! Persistent categorical encoders.
//!
//! An encoder is either unseeded (no artifact on disk yet) or seeded (loaded
//! from its artifact). Only an [`UnseededEncoder`] can be fitted, and fitting
//! consumes it, so once a column's vocabulary is persisted nothing in the
//! pipeline can re-fit or extend it. Codes are the positions of the classes
//! in sorted order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cinescore_core::error::{CinescoreError, Result};

/// Code assigned to values the encoder has never seen.
pub const OUT_OF_VOCABULARY: i64 = -1;

/// A frozen category-to-code mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    column: String,
    /// Sorted, de-duplicated vocabulary.
    classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Known categories, in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn contains(&self, value: &str) -> bool {
        self.code_of(value).is_some()
    }

    /// Code of a known category.
    pub fn code_of(&self, value: &str) -> Option<i64> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
            .map(|idx| idx as i64)
    }

    /// Code of `value`, or [`OUT_OF_VOCABULARY`] for an unseen category.
    pub fn encode(&self, value: &str) -> i64 {
        self.code_of(value).unwrap_or(OUT_OF_VOCABULARY)
    }

    /// Load a persisted encoder.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CinescoreError::missing(path)
            } else {
                CinescoreError::Io(e)
            }
        })?;
        Self::from_bytes(&bytes)
            .map_err(|e| CinescoreError::Encoder(format!("{}: {}", path.display(), e)))
    }

    /// Decode an encoder artifact, rejecting vocabularies that are not
    /// strictly sorted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let encoder: CategoryEncoder = serde_json::from_slice(bytes)?;
        if encoder.classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(CinescoreError::Encoder(format!(
                "vocabulary of '{}' is not sorted and unique",
                encoder.column
            )));
        }
        Ok(encoder)
    }

    fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.partial");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// A column with no persisted encoder yet.
#[derive(Debug)]
pub struct UnseededEncoder {
    column: String,
    path: PathBuf,
}

impl UnseededEncoder {
    /// Fit on every value observed in this run and persist the result.
    pub fn fit_and_persist<I, S>(self, values: I) -> Result<CategoryEncoder>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        let encoder = CategoryEncoder {
            column: self.column,
            classes: classes.into_iter().collect(),
        };
        encoder.persist(&self.path)?;
        info!(
            column = %encoder.column,
            classes = encoder.classes.len(),
            path = %self.path.display(),
            "New encoder fitted and saved"
        );
        Ok(encoder)
    }
}

/// Lifecycle of one column's encoder.
#[derive(Debug)]
pub enum EncoderState {
    Unseeded(UnseededEncoder),
    Seeded(CategoryEncoder),
}

impl EncoderState {
    /// Inspect the artifact location for `column`.
    ///
    /// An unreadable or malformed artifact is an error rather than a reason
    /// to re-fit: re-fitting would silently renumber every category.
    pub fn open(path: &Path, column: &str) -> Result<Self> {
        if !path.exists() {
            debug!(column, path = %path.display(), "No persisted encoder");
            return Ok(EncoderState::Unseeded(UnseededEncoder {
                column: column.to_string(),
                path: path.to_path_buf(),
            }));
        }

        let encoder = CategoryEncoder::load(path)?;
        if encoder.column != column {
            return Err(CinescoreError::Encoder(format!(
                "{} holds the encoder of '{}', expected '{}'",
                path.display(),
                encoder.column,
                column
            )));
        }
        info!(column, path = %path.display(), "Existing encoder loaded");
        Ok(EncoderState::Seeded(encoder))
    }

    /// Encode a column: apply a seeded encoder, or seed one from `values`.
    pub fn encode_all(self, values: &[String]) -> Result<(CategoryEncoder, Vec<i64>)> {
        let encoder = match self {
            EncoderState::Seeded(encoder) => encoder,
            EncoderState::Unseeded(unseeded) => unseeded.fit_and_persist(values)?,
        };
        let codes = values.iter().map(|v| encoder.encode(v)).collect();
        Ok((encoder, codes))
    }

    pub fn is_seeded(&self) -> bool {
        matches!(self, EncoderState::Seeded(_))
    }
}
