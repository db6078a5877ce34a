//! Experiment tracking.
//!
//! Each training run logs its metrics under a run name derived from the
//! model family, run date and depth. Logging is best effort: the trainer
//! records a failure as a degraded outcome and carries on.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cinescore_core::config::TrackerConfig;
use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::outcome::Outcome;
use cinescore_core::types::{ModelFamily, ModelParams, RunDate};

/// Metrics and context of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub project: String,
    pub run_name: String,
    pub model_type: ModelFamily,
    pub params: ModelParams,
    pub train_rmse: f64,
    pub test_rmse: f64,
    pub rmse_gap: f64,
    pub promoted: bool,
    pub logged_at: DateTime<Utc>,
}

/// `{family}_{date}_depth{max_depth}`, with `N/A` when no depth is set.
pub fn run_name(family: ModelFamily, date: RunDate, params: &ModelParams) -> String {
    let depth = params
        .max_depth
        .map(|d| d.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!("{}_{}_depth{}", family, date, depth)
}

/// Sink for per-run metrics.
#[async_trait]
pub trait ExperimentTracker: Send + Sync {
    async fn log_run(&self, run: &RunMetrics) -> Result<()>;

    /// Log a run, turning any failure into a degraded outcome.
    async fn log_best_effort(&self, run: &RunMetrics) -> Outcome<()> {
        match self.log_run(run).await {
            Ok(()) => Outcome::Complete(()),
            Err(e) => {
                warn!(run = %run.run_name, error = %e, "Experiment logging failed");
                Outcome::degraded((), e.to_string())
            }
        }
    }
}

/// Appends one JSON object per run to a local file.
pub struct JsonlTracker {
    path: PathBuf,
}

impl JsonlTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ExperimentTracker for JsonlTracker {
    async fn log_run(&self, run: &RunMetrics) -> Result<()> {
        let mut line = serde_json::to_string(run)?;
        line.push('\n');
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CinescoreError::Tracker(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| CinescoreError::Tracker(e.to_string()))?;
        debug!(path = %self.path.display(), run = %run.run_name, "Run appended");
        Ok(())
    }
}

/// Posts runs as JSON to `{endpoint}/runs`, authenticated with a bearer key.
pub struct HttpTracker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTracker {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CinescoreError::Tracker(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ExperimentTracker for HttpTracker {
    async fn log_run(&self, run: &RunMetrics) -> Result<()> {
        let mut request = self
            .client
            .post(format!("{}/runs", self.endpoint))
            .json(run);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CinescoreError::Tracker(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CinescoreError::Tracker(format!(
                "tracker responded with status {}",
                response.status()
            )));
        }
        debug!(run = %run.run_name, "Run posted");
        Ok(())
    }
}

/// Pick the tracker described by the configuration. An endpoint selects the
/// HTTP tracker; otherwise runs go to the JSON-lines file in `data_dir`.
pub fn from_config(
    config: &TrackerConfig,
    data_dir: &Path,
) -> Result<Box<dyn ExperimentTracker>> {
    match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => {
            if config.api_key.is_none() {
                warn!("Tracker endpoint configured without an API key");
            }
            Ok(Box::new(HttpTracker::new(endpoint, config.api_key.clone())?))
        }
        None => Ok(Box::new(JsonlTracker::new(data_dir.join(&config.log_file)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(name: &str) -> RunMetrics {
        RunMetrics {
            project: "movie-rating-predictor".into(),
            run_name: name.into(),
            model_type: ModelFamily::GradientBoosting,
            params: ModelParams::default(),
            train_rmse: 0.5,
            test_rmse: 0.75,
            rmse_gap: 0.25,
            promoted: true,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn test_run_name_format() {
        let date: RunDate = "2026-01-23".parse().unwrap();
        let params = ModelParams {
            max_depth: Some(4),
            ..Default::default()
        };
        assert_eq!(
            run_name(ModelFamily::GradientBoosting, date, &params),
            "xgboost_2026-01-23_depth4"
        );
        assert_eq!(
            run_name(ModelFamily::RandomForest, date, &ModelParams::default()),
            "rf_2026-01-23_depthN/A"
        );
    }

    #[tokio::test]
    async fn test_jsonl_tracker_appends() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = JsonlTracker::new(dir.path().join("experiments.jsonl"));
        tracker.log_run(&metrics("a")).await.unwrap();
        tracker.log_run(&metrics("b")).await.unwrap();

        let content = std::fs::read_to_string(tracker.path()).unwrap();
        let runs: Vec<RunMetrics> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].run_name, "b");
    }

    #[tokio::test]
    async fn test_unreachable_tracker_degrades() {
        let tracker = HttpTracker::new("http://127.0.0.1:9", None).unwrap();
        let outcome = tracker.log_best_effort(&metrics("x")).await;
        assert!(outcome.is_degraded());
    }

    #[test]
    fn test_from_config_defaults_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::default();
        assert!(from_config(&config, dir.path()).is_ok());
    }
}
