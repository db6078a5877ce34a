//! Push of the latest artifact set from the pipeline host and pull of it on
//! serving hosts.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use cinescore_core::config::StoreConfig;
use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::layout::{ArtifactKind, DataLayout, DISTRIBUTED_ARTIFACTS, MANIFEST_FILE};
use cinescore_core::outcome::Outcome;
use cinescore_core::types::RunDate;

use crate::manifest::Manifest;
use crate::store::{store_from_config, ArtifactStore};

/// What a push or pull moved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferReport {
    /// Generation of the transferred set, when a manifest was involved.
    pub generation: Option<String>,
    pub artifacts: usize,
}

/// Pause between whole-set pull attempts, giving an in-flight push time to
/// finish writing its manifest.
pub const DEFAULT_PULL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Moves the artifact set between a local directory and the remote store.
pub struct Distributor {
    store: Option<Box<dyn ArtifactStore>>,
    prefix: String,
    pull_attempts: u32,
    retry_delay: Duration,
}

impl Distributor {
    pub fn new(store: Option<Box<dyn ArtifactStore>>, prefix: &str, pull_attempts: u32) -> Self {
        Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
            pull_attempts: pull_attempts.max(1),
            retry_delay: DEFAULT_PULL_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(
            store_from_config(config)?,
            &config.prefix,
            config.pull_attempts,
        )
        .with_retry_delay(Duration::from_millis(config.pull_retry_delay_ms)))
    }

    fn key(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }

    /// Upload the best model and both encoders from `source`, then the
    /// manifest describing them.
    ///
    /// Without a configured bucket nothing is uploaded and the outcome is
    /// degraded. A missing local artifact or a failed upload aborts the
    /// push; the manifest is only written once all three uploads succeeded.
    pub async fn push(&self, source: &DataLayout, date: RunDate) -> Result<Outcome<TransferReport>> {
        let Some(store) = &self.store else {
            warn!("No artifact bucket configured; skipping upload");
            return Ok(Outcome::degraded(
                TransferReport::default(),
                "artifact bucket not configured",
            ));
        };

        let mut contents = Vec::with_capacity(DISTRIBUTED_ARTIFACTS.len());
        for kind in DISTRIBUTED_ARTIFACTS {
            let path = source.artifact(kind);
            let bytes = std::fs::read(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CinescoreError::missing(&path)
                } else {
                    CinescoreError::Io(e)
                }
            })?;
            contents.push((kind, bytes));
        }

        for (kind, bytes) in &contents {
            let key = self.key(kind.file_name());
            store.put(&key, bytes.clone()).await?;
            info!(key = %key, bytes = bytes.len(), "Artifact uploaded");
        }

        let manifest = Manifest::new(
            date,
            contents
                .iter()
                .map(|(kind, bytes)| (*kind, self.key(kind.file_name()), bytes.as_slice())),
        );
        store
            .put(&self.key(MANIFEST_FILE), manifest.to_bytes()?)
            .await?;
        info!(
            generation = %manifest.generation,
            location = %store.location(),
            "Artifact set published"
        );

        Ok(Outcome::Complete(TransferReport {
            generation: Some(manifest.generation),
            artifacts: contents.len(),
        }))
    }

    /// Download the artifact set into `dest`.
    ///
    /// The set is verified against the remote manifest and re-downloaded as
    /// a whole when an artifact does not match it, up to the configured
    /// number of attempts. Local files are only replaced once the full set
    /// verified. A missing remote manifest is tolerated and reported as a
    /// degraded, unverified pull.
    pub async fn pull(&self, dest: &DataLayout) -> Result<Outcome<TransferReport>> {
        let Some(store) = &self.store else {
            warn!("No artifact bucket configured; using local artifacts as they are");
            return Ok(Outcome::degraded(
                TransferReport::default(),
                "artifact bucket not configured",
            ));
        };
        dest.ensure_root()?;

        let mut last_mismatch = String::new();
        for attempt in 1..=self.pull_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }
            let manifest_bytes = store.get(&self.key(MANIFEST_FILE)).await?;
            let manifest = match &manifest_bytes {
                Some(bytes) => Some(Manifest::from_bytes(bytes).map_err(|e| {
                    CinescoreError::InconsistentArtifacts(format!("unreadable manifest: {}", e))
                })?),
                None => None,
            };

            let fetched = self.fetch_set(store.as_ref()).await?;

            let Some(manifest) = manifest else {
                warn!("Remote manifest missing; installing artifacts unverified");
                install(dest, &fetched, None)?;
                return Ok(Outcome::degraded(
                    TransferReport {
                        generation: None,
                        artifacts: fetched.len(),
                    },
                    "remote manifest missing; artifacts not verified",
                ));
            };

            match fetched
                .iter()
                .find(|(kind, bytes)| !manifest.matches(*kind, bytes))
            {
                None => {
                    install(dest, &fetched, manifest_bytes.as_deref())?;
                    info!(
                        generation = %manifest.generation,
                        attempt,
                        dir = %dest.root().display(),
                        "Artifact set pulled"
                    );
                    return Ok(Outcome::Complete(TransferReport {
                        generation: Some(manifest.generation),
                        artifacts: fetched.len(),
                    }));
                }
                Some((kind, _)) => {
                    last_mismatch = format!(
                        "{} does not match generation {}",
                        kind.file_name(),
                        manifest.generation
                    );
                    warn!(attempt, reason = %last_mismatch, "Torn artifact set; retrying");
                }
            }
        }

        Err(CinescoreError::InconsistentArtifacts(format!(
            "gave up after {} attempts: {}",
            self.pull_attempts, last_mismatch
        )))
    }

    async fn fetch_set(&self, store: &dyn ArtifactStore) -> Result<Vec<(ArtifactKind, Vec<u8>)>> {
        let mut fetched = Vec::with_capacity(DISTRIBUTED_ARTIFACTS.len());
        for kind in DISTRIBUTED_ARTIFACTS {
            let key = self.key(kind.file_name());
            let bytes = store
                .get(&key)
                .await?
                .ok_or_else(|| CinescoreError::Transfer(format!("object {} not found", key)))?;
            fetched.push((kind, bytes));
        }
        Ok(fetched)
    }
}

/// Write the artifacts, then the manifest copy, each via a temporary file.
/// Without a manifest any stale local copy is removed so local loads do not
/// verify against an older generation.
fn install(
    dest: &DataLayout,
    artifacts: &[(ArtifactKind, Vec<u8>)],
    manifest: Option<&[u8]>,
) -> Result<()> {
    for (kind, bytes) in artifacts {
        write_atomic(&dest.artifact(*kind), bytes)?;
    }
    match manifest {
        Some(bytes) => write_atomic(&dest.manifest(), bytes)?,
        None => {
            if dest.manifest().exists() {
                std::fs::remove_file(dest.manifest())?;
            }
        }
    }
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("download");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn date() -> RunDate {
        "2026-01-23".parse().unwrap()
    }

    fn seed_local(layout: &DataLayout, tag: &str) {
        layout.ensure_root().unwrap();
        for kind in DISTRIBUTED_ARTIFACTS {
            std::fs::write(layout.artifact(kind), format!("{}-{}", tag, kind.file_name())).unwrap();
        }
    }

    fn fs_distributor(root: &Path) -> Distributor {
        Distributor::new(Some(Box::new(FsStore::new(root))), "models/latest", 3)
    }

    #[tokio::test]
    async fn test_push_then_pull_round_trip() {
        let bucket = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let serving = tempfile::tempdir().unwrap();
        let source = DataLayout::new(data.path());
        let dest = DataLayout::new(serving.path().join("model"));
        seed_local(&source, "v1");
        let distributor = fs_distributor(bucket.path());

        let pushed = distributor.push(&source, date()).await.unwrap();
        let pulled = distributor.pull(&dest).await.unwrap();

        assert!(!pushed.is_degraded());
        assert!(!pulled.is_degraded());
        assert_eq!(pushed.value().generation, pulled.value().generation);
        assert!(bucket.path().join("models/latest/manifest.json").exists());
        for kind in DISTRIBUTED_ARTIFACTS {
            assert_eq!(
                std::fs::read(dest.artifact(kind)).unwrap(),
                std::fs::read(source.artifact(kind)).unwrap()
            );
        }
        assert!(dest.manifest().exists());
    }

    #[tokio::test]
    async fn test_no_bucket_degrades_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let distributor = Distributor::new(None, "models/latest", 3);

        assert!(distributor.push(&layout, date()).await.unwrap().is_degraded());
        assert!(distributor.pull(&layout).await.unwrap().is_degraded());
    }

    #[tokio::test]
    async fn test_push_missing_artifact_uploads_nothing_after_it() {
        let bucket = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let source = DataLayout::new(data.path());
        seed_local(&source, "v1");
        std::fs::remove_file(source.artifact(ArtifactKind::LanguageEncoder)).unwrap();

        let result = fs_distributor(bucket.path()).push(&source, date()).await;

        assert!(matches!(
            result,
            Err(CinescoreError::PreconditionMissing { .. })
        ));
        assert!(!bucket.path().join("models/latest/manifest.json").exists());
    }

    #[tokio::test]
    async fn test_torn_set_is_rejected_and_local_files_untouched() {
        let bucket = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let serving = tempfile::tempdir().unwrap();
        let source = DataLayout::new(data.path());
        let dest = DataLayout::new(serving.path());
        seed_local(&source, "v1");
        seed_local(&dest, "local");
        let distributor = fs_distributor(bucket.path());
        distributor.push(&source, date()).await.unwrap();
        // A newer model lands without its manifest.
        std::fs::write(
            bucket.path().join("models/latest/best_model.json"),
            "v2-best_model.json",
        )
        .unwrap();

        let result = distributor.pull(&dest).await;

        assert!(matches!(
            result,
            Err(CinescoreError::InconsistentArtifacts(_))
        ));
        assert_eq!(
            std::fs::read_to_string(dest.artifact(ArtifactKind::BestModel)).unwrap(),
            "local-best_model.json"
        );
    }

    /// Serves a stale object for the first few reads of one key.
    struct RacingStore {
        inner: FsStore,
        stale_key: String,
        stale_reads: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactStore for RacingStore {
        async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
            self.inner.put(key, bytes).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            if key == self.stale_key && self.stale_reads.load(Ordering::SeqCst) > 0 {
                self.stale_reads.fetch_sub(1, Ordering::SeqCst);
                return Ok(Some(b"stale".to_vec()));
            }
            self.inner.get(key).await
        }

        fn location(&self) -> String {
            self.inner.location()
        }
    }

    #[tokio::test]
    async fn test_pull_retries_whole_set_until_consistent() {
        let bucket = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let serving = tempfile::tempdir().unwrap();
        let source = DataLayout::new(data.path());
        let dest = DataLayout::new(serving.path());
        seed_local(&source, "v1");
        fs_distributor(bucket.path()).push(&source, date()).await.unwrap();

        let store = RacingStore {
            inner: FsStore::new(bucket.path()),
            stale_key: "models/latest/main_genre_encoder.json".to_string(),
            stale_reads: AtomicUsize::new(2),
        };
        let distributor = Distributor::new(Some(Box::new(store)), "models/latest", 3)
            .with_retry_delay(Duration::from_millis(10));

        let pulled = distributor.pull(&dest).await.unwrap();

        assert!(!pulled.is_degraded());
        assert_eq!(
            std::fs::read_to_string(dest.artifact(ArtifactKind::GenreEncoder)).unwrap(),
            "v1-main_genre_encoder.json"
        );
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    #[async_trait]
    impl ArtifactStore for MemoryStore {
        async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.objects.lock().unwrap().get(key).cloned())
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    #[tokio::test]
    async fn test_torn_set_retries_are_spaced_out() {
        let data = tempfile::tempdir().unwrap();
        let serving = tempfile::tempdir().unwrap();
        let source = DataLayout::new(data.path());
        seed_local(&source, "v1");
        let store = MemoryStore::default();
        Distributor::new(Some(Box::new(store.clone())), "models/latest", 3)
            .push(&source, date())
            .await
            .unwrap();
        store
            .put("models/latest/best_model.json", b"half-written".to_vec())
            .await
            .unwrap();

        tokio::time::pause();
        let delay = Duration::from_secs(5);
        let distributor = Distributor::new(Some(Box::new(store)), "models/latest", 3)
            .with_retry_delay(delay);
        let started = tokio::time::Instant::now();

        let result = distributor.pull(&DataLayout::new(serving.path())).await;

        assert!(matches!(result, Err(CinescoreError::InconsistentArtifacts(_))));
        let waited = started.elapsed();
        assert!(waited >= delay * 2, "waited {:?}", waited);
        assert!(waited < delay * 3, "waited {:?}", waited);
    }

    #[tokio::test]
    async fn test_missing_manifest_installs_unverified() {
        let bucket = tempfile::tempdir().unwrap();
        let serving = tempfile::tempdir().unwrap();
        let store = FsStore::new(bucket.path());
        for kind in DISTRIBUTED_ARTIFACTS {
            store
                .put(&format!("models/latest/{}", kind.file_name()), b"legacy".to_vec())
                .await
                .unwrap();
        }
        let dest = DataLayout::new(serving.path());
        std::fs::write(dest.manifest(), b"{}").unwrap();
        let distributor = Distributor::new(Some(Box::new(store)), "models/latest", 3);

        let pulled = distributor.pull(&dest).await.unwrap();

        assert!(pulled.is_degraded());
        assert_eq!(pulled.value().artifacts, 3);
        assert!(!dest.manifest().exists());
    }
}
