//! Loading the pulled artifact set on a serving host.
//!
//! When a manifest copy is present next to the artifacts every file read is
//! checked against it, so a surface never pairs a model with encoders from
//! another generation.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::layout::{ArtifactKind, DataLayout, GENRE_COLUMN, LANGUAGE_COLUMN};
use cinescore_features::CategoryEncoder;
use cinescore_train::RatingModel;

use crate::manifest::Manifest;

/// The model alone, for the prediction surface.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: RatingModel,
    pub generation: Option<String>,
}

/// Model and both encoders of a single generation.
#[derive(Debug)]
pub struct ArtifactSet {
    pub model: RatingModel,
    pub genre: CategoryEncoder,
    pub language: CategoryEncoder,
    pub generation: Option<String>,
}

/// The artifact directory of a serving surface.
#[derive(Debug, Clone)]
pub struct LocalArtifacts {
    layout: DataLayout,
}

impl LocalArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: DataLayout::new(dir),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn dir(&self) -> &Path {
        self.layout.root()
    }

    fn manifest(&self) -> Result<Option<Manifest>> {
        let path = self.layout.manifest();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Manifest::from_bytes(&bytes).map(Some).map_err(|e| {
            CinescoreError::InconsistentArtifacts(format!("{}: {}", path.display(), e))
        })
    }

    fn read(&self, kind: ArtifactKind, manifest: Option<&Manifest>) -> Result<Vec<u8>> {
        let path = self.layout.artifact(kind);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CinescoreError::missing(&path)
            } else {
                CinescoreError::Io(e)
            }
        })?;
        if let Some(manifest) = manifest {
            if !manifest.matches(kind, &bytes) {
                return Err(CinescoreError::InconsistentArtifacts(format!(
                    "{} does not belong to generation {}",
                    path.display(),
                    manifest.generation
                )));
            }
        }
        Ok(bytes)
    }

    /// Load the best model.
    pub fn load_model(&self) -> Result<LoadedModel> {
        let manifest = self.manifest()?;
        if manifest.is_none() {
            warn!(dir = %self.dir().display(), "No manifest next to the model; loading unverified");
        }
        let model = RatingModel::from_bytes(&self.read(ArtifactKind::BestModel, manifest.as_ref())?)?;
        let generation = manifest.map(|m| m.generation);
        info!(family = %model.family(), generation = ?generation, "Model loaded");
        Ok(LoadedModel { model, generation })
    }

    /// Load the model and both encoders.
    pub fn load_set(&self) -> Result<ArtifactSet> {
        let manifest = self.manifest()?;
        if manifest.is_none() {
            warn!(dir = %self.dir().display(), "No manifest next to the artifacts; loading unverified");
        }
        let manifest = manifest.as_ref();

        let model = RatingModel::from_bytes(&self.read(ArtifactKind::BestModel, manifest)?)?;
        let genre = CategoryEncoder::from_bytes(&self.read(ArtifactKind::GenreEncoder, manifest)?)?;
        let language =
            CategoryEncoder::from_bytes(&self.read(ArtifactKind::LanguageEncoder, manifest)?)?;
        for (encoder, column) in [(&genre, GENRE_COLUMN), (&language, LANGUAGE_COLUMN)] {
            if encoder.column() != column {
                return Err(CinescoreError::Encoder(format!(
                    "expected the encoder of '{}', found '{}'",
                    column,
                    encoder.column()
                )));
            }
        }

        let generation = manifest.map(|m| m.generation.clone());
        info!(
            generation = ?generation,
            genres = genre.classes().len(),
            languages = language.classes().len(),
            "Artifact set loaded"
        );
        Ok(ArtifactSet {
            model,
            genre,
            language,
            generation,
        })
    }
}
