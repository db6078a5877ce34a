//! On-disk naming of datasets and artifacts.
//!
//! Every stage resolves its inputs and outputs through [`DataLayout`] so the
//! file names written by one stage are exactly the ones read by the next.

use std::path::{Path, PathBuf};

use crate::types::RunDate;

/// One of the three artifacts shipped to serving surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    BestModel,
    GenreEncoder,
    LanguageEncoder,
}

/// The distributed artifact set, in upload order.
pub const DISTRIBUTED_ARTIFACTS: [ArtifactKind; 3] = [
    ArtifactKind::BestModel,
    ArtifactKind::GenreEncoder,
    ArtifactKind::LanguageEncoder,
];

/// Column whose values the genre encoder maps.
pub const GENRE_COLUMN: &str = "main_genre";
/// Column whose values the language encoder maps.
pub const LANGUAGE_COLUMN: &str = "original_language";

/// File name of the distribution manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::BestModel => "best_model.json",
            ArtifactKind::GenreEncoder => "main_genre_encoder.json",
            ArtifactKind::LanguageEncoder => "original_language_encoder.json",
        }
    }
}

/// Resolves paths inside a stage's working directory.
#[derive(Clone, Debug)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    pub fn raw_dataset(&self, date: RunDate) -> PathBuf {
        self.root.join(format!("movies_{}.csv", date))
    }

    pub fn cleaned_dataset(&self, date: RunDate) -> PathBuf {
        self.root.join(format!("movies_cleaned_{}.csv", date))
    }

    pub fn backup_model(&self, date: RunDate) -> PathBuf {
        self.root.join(format!("model_{}.json", date))
    }

    pub fn best_model(&self) -> PathBuf {
        self.artifact(ArtifactKind::BestModel)
    }

    pub fn best_score(&self) -> PathBuf {
        self.root.join("best_score.txt")
    }

    /// Persisted encoder for a categorical column.
    pub fn encoder(&self, column: &str) -> PathBuf {
        self.root.join(format!("{}_encoder.json", column))
    }

    pub fn artifact(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}
