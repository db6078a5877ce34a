//! Shared state of the two serving surfaces.
//!
//! Each surface owns one loaded artifact generation behind an `RwLock`.
//! Handlers read it; `POST /reload` pulls the latest set and swaps it in
//! only once the new generation loaded completely.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{info, warn};

use cinescore_core::config::TranslationConfig;
use cinescore_core::error::Result;
use cinescore_core::outcome::Outcome;
use cinescore_distribute::{Distributor, LoadedModel, LocalArtifacts, TransferReport};
use cinescore_ui::{translator_from_config, InteractivePredictor};

/// State of the prediction surface.
#[derive(Clone)]
pub struct PredictionState {
    pub artifacts: LocalArtifacts,
    pub distributor: Arc<Distributor>,
    model: Arc<RwLock<Option<Arc<LoadedModel>>>>,
    pub start_time: Instant,
}

impl PredictionState {
    /// Try to load the local model. A missing or invalid model leaves the
    /// surface running without one; requests then retry the load.
    pub fn new(artifacts: LocalArtifacts, distributor: Distributor) -> Self {
        let model = match artifacts.load_model() {
            Ok(model) => Some(Arc::new(model)),
            Err(e) => {
                warn!(error = %e, "Prediction surface starting without a model");
                None
            }
        };
        Self {
            artifacts,
            distributor: Arc::new(distributor),
            model: Arc::new(RwLock::new(model)),
            start_time: Instant::now(),
        }
    }

    /// The loaded model, loading it first if the surface has none yet.
    pub async fn current_model(&self) -> Result<Arc<LoadedModel>> {
        if let Some(model) = self.model.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }
        let mut slot = self.model.write().await;
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(self.artifacts.load_model()?);
        info!(generation = ?model.generation, "Model loaded on demand");
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    pub async fn generation(&self) -> Option<String> {
        self.model
            .read()
            .await
            .as_ref()
            .and_then(|m| m.generation.clone())
    }

    pub async fn has_model(&self) -> bool {
        self.model.read().await.is_some()
    }

    /// Pull the latest artifact set and swap in its model.
    pub async fn reload(&self) -> Result<Outcome<TransferReport>> {
        let pulled = self.distributor.pull(self.artifacts.layout()).await?;
        let model = Arc::new(self.artifacts.load_model()?);
        info!(generation = ?model.generation, "Prediction surface reloaded");
        *self.model.write().await = Some(model);
        Ok(pulled)
    }
}

/// State of the form surface.
#[derive(Clone)]
pub struct FormState {
    pub artifacts: LocalArtifacts,
    pub distributor: Arc<Distributor>,
    pub translation: TranslationConfig,
    predictor: Arc<RwLock<Arc<InteractivePredictor>>>,
    pub start_time: Instant,
}

impl FormState {
    /// Load the artifact set. Without one the form cannot offer any genre
    /// or language, so a failure here is fatal for the surface.
    pub fn load(
        artifacts: LocalArtifacts,
        distributor: Distributor,
        translation: TranslationConfig,
    ) -> Result<Self> {
        let predictor = Self::build_predictor(&artifacts, &translation)?;
        Ok(Self {
            artifacts,
            distributor: Arc::new(distributor),
            translation,
            predictor: Arc::new(RwLock::new(Arc::new(predictor))),
            start_time: Instant::now(),
        })
    }

    /// Use an already built predictor.
    pub fn with_predictor(
        artifacts: LocalArtifacts,
        distributor: Distributor,
        translation: TranslationConfig,
        predictor: InteractivePredictor,
    ) -> Self {
        Self {
            artifacts,
            distributor: Arc::new(distributor),
            translation,
            predictor: Arc::new(RwLock::new(Arc::new(predictor))),
            start_time: Instant::now(),
        }
    }

    fn build_predictor(
        artifacts: &LocalArtifacts,
        translation: &TranslationConfig,
    ) -> Result<InteractivePredictor> {
        let set = artifacts.load_set()?;
        Ok(InteractivePredictor::new(set, translator_from_config(translation)?))
    }

    pub async fn predictor(&self) -> Arc<InteractivePredictor> {
        Arc::clone(&*self.predictor.read().await)
    }

    /// Pull the latest artifact set and swap in a predictor built from it.
    pub async fn reload(&self) -> Result<Outcome<TransferReport>> {
        let pulled = self.distributor.pull(self.artifacts.layout()).await?;
        let predictor = Self::build_predictor(&self.artifacts, &self.translation)?;
        info!(generation = ?predictor.generation(), "Form surface reloaded");
        *self.predictor.write().await = Arc::new(predictor);
        Ok(pulled)
    }
}
