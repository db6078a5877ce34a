use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the Cinescore pipeline.
///
/// Stage-level variants are fatal for the stage that raised them and are
/// surfaced to whatever invoked the stage (the scheduler, or the CLI exit
/// code). Foreign errors (csv, reqwest, gbdt) are mapped into the matching
/// variant at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CinescoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required input missing: {}", path.display())]
    PreconditionMissing { path: PathBuf },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Inconsistent artifact set: {0}")]
    InconsistentArtifacts(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CinescoreError {
    /// Shorthand for a missing upstream file.
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        CinescoreError::PreconditionMissing { path: path.into() }
    }
}

impl From<toml::de::Error> for CinescoreError {
    fn from(err: toml::de::Error) -> Self {
        CinescoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CinescoreError {
    fn from(err: toml::ser::Error) -> Self {
        CinescoreError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CinescoreError {
    fn from(err: serde_json::Error) -> Self {
        CinescoreError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Cinescore operations.
pub type Result<T> = std::result::Result<T, CinescoreError>;
