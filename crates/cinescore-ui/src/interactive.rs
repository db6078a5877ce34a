//! Interactive predictor: raw form input to a rendered rating.

use serde::Deserialize;
use tracing::info;

use cinescore_core::outcome::Outcome;
use cinescore_core::types::{FeatureVector, SentimentLabel};
use cinescore_distribute::ArtifactSet;
use cinescore_features::{overview_features, SentimentAnalyzer, VaderSentiment};

use crate::translate::{translate_or_original, Translator};

pub const MIN_RUNTIME: u32 = 1;
pub const MAX_RUNTIME: u32 = 300;

/// Rejected form input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("Runtime must be between 1 and 300 minutes, got {0}")]
    RuntimeOutOfRange(u32),
    #[error("Unknown genre: {0}")]
    UnknownGenre(String),
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
}

/// Values submitted through the form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormInput {
    pub runtime: u32,
    pub genre: String,
    pub language: String,
    #[serde(default)]
    pub overview: String,
}

/// A rendered prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub rating: f64,
    pub sentiment: f64,
    pub label: SentimentLabel,
    pub overview_len: u64,
    /// Text the sentiment was scored on; degraded when translation failed.
    pub scored_text: Outcome<String>,
}

impl Prediction {
    /// `7.25 / 10`
    pub fn rating_display(&self) -> String {
        format!("{:.2} / 10", self.rating)
    }

    /// Sentiment score with two decimals.
    pub fn score_display(&self) -> String {
        format!("{:.2}", self.sentiment)
    }
}

/// Holds one generation of artifacts for the lifetime of the process.
pub struct InteractivePredictor {
    artifacts: ArtifactSet,
    translator: Box<dyn Translator>,
    analyzer: Box<dyn SentimentAnalyzer>,
}

impl InteractivePredictor {
    pub fn new(artifacts: ArtifactSet, translator: Box<dyn Translator>) -> Self {
        Self::with_analyzer(artifacts, translator, Box::new(VaderSentiment::new()))
    }

    pub fn with_analyzer(
        artifacts: ArtifactSet,
        translator: Box<dyn Translator>,
        analyzer: Box<dyn SentimentAnalyzer>,
    ) -> Self {
        Self {
            artifacts,
            translator,
            analyzer,
        }
    }

    /// Genres offered by the form, in code order.
    pub fn genres(&self) -> &[String] {
        self.artifacts.genre.classes()
    }

    /// Languages offered by the form, in code order.
    pub fn languages(&self) -> &[String] {
        self.artifacts.language.classes()
    }

    pub fn generation(&self) -> Option<&str> {
        self.artifacts.generation.as_deref()
    }

    pub fn validate(&self, input: &FormInput) -> Result<(), InputError> {
        if !(MIN_RUNTIME..=MAX_RUNTIME).contains(&input.runtime) {
            return Err(InputError::RuntimeOutOfRange(input.runtime));
        }
        if !self.artifacts.genre.contains(&input.genre) {
            return Err(InputError::UnknownGenre(input.genre.clone()));
        }
        if !self.artifacts.language.contains(&input.language) {
            return Err(InputError::UnknownLanguage(input.language.clone()));
        }
        Ok(())
    }

    /// Validate, translate, derive the five features and predict.
    pub async fn predict(&self, input: &FormInput) -> Result<Prediction, InputError> {
        self.validate(input)?;

        let scored_text = translate_or_original(self.translator.as_ref(), &input.overview).await;
        let text = overview_features(self.analyzer.as_ref(), Some(scored_text.value().as_str()));

        let features = FeatureVector {
            runtime: f64::from(input.runtime),
            genre_encoded: self.artifacts.genre.encode(&input.genre),
            lang_encoded: self.artifacts.language.encode(&input.language),
            overview_sentiment: text.sentiment,
            overview_len: text.length,
        };
        let rating = self.artifacts.model.predict_one(&features).clamp(0.0, 10.0);
        info!(
            rating,
            sentiment = text.sentiment,
            translated = !scored_text.is_degraded(),
            "Interactive prediction"
        );

        Ok(Prediction {
            rating,
            sentiment: text.sentiment,
            label: SentimentLabel::from_score(text.sentiment),
            overview_len: text.length,
            scored_text,
        })
    }
}
