use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CinescoreError, Result};
use crate::types::{ModelFamily, ModelParams};

/// Top-level configuration for the Cinescore pipeline and its serving surfaces.
///
/// Loaded from `cinescore.toml` by default. Secrets and deployment-specific
/// values are usually injected through environment variables afterwards via
/// [`CinescoreConfig::apply_env_overrides`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CinescoreConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl CinescoreConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed. An unknown
    /// model family is a parse error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CinescoreConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    ///
    /// A file that exists but does not parse is still an error: silently
    /// replacing an operator's model choice with the default family would
    /// train the wrong model.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found. Using defaults.",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CinescoreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CINESCORE_DATA_DIR") {
            self.general.data_dir = v;
        }
        if let Some(v) = get("CINESCORE_ARTIFACT_DIR") {
            self.general.artifact_dir = v;
        }
        if let Some(v) = get("TMDB_API_KEY") {
            self.catalog.api_key = v;
        }
        if let Some(v) = get("TMDB_BASE_URL") {
            self.catalog.base_url = v;
        }
        if let Some(v) = get("S3_BUCKET_NAME") {
            self.store.bucket = Some(v);
        }
        if let Some(v) = get("AWS_ACCESS_KEY_ID") {
            self.store.access_key_id = Some(v);
        }
        if let Some(v) = get("AWS_SECRET_ACCESS_KEY") {
            self.store.secret_access_key = Some(v);
        }
        if let Some(v) = get("AWS_DEFAULT_REGION") {
            self.store.region = v;
        }
        if let Some(v) = get("ARTIFACT_STORE_ENDPOINT") {
            self.store.endpoint = Some(v);
        }
        if let Some(v) = get("WANDB_API_KEY") {
            self.training.tracker.api_key = Some(v);
        }
    }

    /// Directory holding datasets, backups, the best model and encoders.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.data_dir)
    }

    /// Directory a serving surface pulls artifacts into and loads them from.
    pub fn artifact_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.artifact_dir)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Working directory of the batch stages.
    pub data_dir: String,
    /// Local artifact directory of the serving surfaces.
    pub artifact_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data-prepare".to_string(),
            artifact_dir: "./app/model".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// External content catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_key: String,
    /// Number of "popular" listing pages fetched per run.
    pub pages: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: String::new(),
            pages: 5,
        }
    }
}

/// Feature builder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rows with a vote count at or below this value are dropped.
    pub min_vote_count: u64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { min_vote_count: 5 }
    }
}

/// Trainer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    /// Fraction of rows held out for the test partition.
    pub test_fraction: f64,
    /// Seed of the train/test shuffle.
    pub split_seed: u64,
    pub tracker: TrackerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            test_fraction: 0.2,
            split_seed: 42,
            tracker: TrackerConfig::default(),
        }
    }
}

/// Model family plus hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: ModelFamily,
    #[serde(default)]
    pub params: ModelParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: ModelFamily::GradientBoosting,
            params: ModelParams {
                n_estimators: Some(200),
                learning_rate: Some(0.05),
                max_depth: Some(4),
                subsample: Some(0.7),
                random_state: Some(42),
            },
        }
    }
}

/// Experiment tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub project: String,
    /// HTTP endpoint receiving run metrics. When unset, runs are appended
    /// to `log_file` inside the data directory.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub log_file: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            project: "movie-rating-predictor".to_string(),
            endpoint: None,
            api_key: None,
            log_file: "experiments.jsonl".to_string(),
        }
    }
}

/// Backend used to reach the remote artifact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Bucket is a directory below `endpoint` (a mounted volume).
    #[default]
    Fs,
    /// Objects are read and written with GET/PUT on `{endpoint}/{bucket}/{key}`.
    Http,
}

/// Remote artifact store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Bucket identifier. Transfers are skipped when unset.
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Logical path of the "latest" artifact set inside the bucket.
    pub prefix: String,
    /// Whole-set download attempts before a torn set is reported.
    pub pull_attempts: u32,
    /// Pause between those attempts, in milliseconds.
    pub pull_retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Fs,
            bucket: None,
            region: "ap-northeast-2".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            prefix: "models/latest".to_string(),
            pull_attempts: 3,
            pull_retry_delay_ms: 2000,
        }
    }
}

/// Overview translation settings for the interactive surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            target_language: "en".to_string(),
        }
    }
}

/// Listener settings for the two serving surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub api_port: u16,
    pub form_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            api_port: 8000,
            form_port: 8501,
        }
    }
}
