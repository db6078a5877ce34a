//! Overview translation.
//!
//! Sentiment is scored on English text, so overviews typed in another
//! language are translated first. Translation is best effort: any failure
//! falls back to the text as typed.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use cinescore_core::config::TranslationConfig;
use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::outcome::Outcome;

/// Translates free text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Passes text through unchanged. Used when translation is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Client for a Google-translate-compatible `translate_a/single` endpoint.
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    target_language: String,
}

impl HttpTranslator {
    pub fn new(endpoint: &str, target_language: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CinescoreError::Translation(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            target_language: target_language.to_string(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", self.target_language.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| CinescoreError::Translation(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CinescoreError::Translation(format!(
                "translator responded with status {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CinescoreError::Translation(e.to_string()))?;
        parse_segments(&body)
    }
}

/// Join the translated segments of a `[[[translated, original, ...], ...], ...]`
/// response.
fn parse_segments(body: &serde_json::Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| CinescoreError::Translation("unexpected response shape".to_string()))?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();
    if text.is_empty() {
        return Err(CinescoreError::Translation("empty translation".to_string()));
    }
    Ok(text)
}

/// Translate `text`, or return it unchanged as a degraded outcome.
pub async fn translate_or_original(translator: &dyn Translator, text: &str) -> Outcome<String> {
    if text.trim().is_empty() {
        return Outcome::Complete(text.to_string());
    }
    match translator.translate(text).await {
        Ok(translated) => {
            debug!(chars = translated.chars().count(), "Overview translated");
            Outcome::Complete(translated)
        }
        Err(e) => {
            warn!(error = %e, "Translation failed; using the original text");
            Outcome::degraded(text.to_string(), e.to_string())
        }
    }
}

/// Build the translator described by the configuration.
pub fn translator_from_config(config: &TranslationConfig) -> Result<Box<dyn Translator>> {
    if !config.enabled {
        return Ok(Box::new(NoopTranslator));
    }
    Ok(Box::new(HttpTranslator::new(
        &config.endpoint,
        &config.target_language,
    )?))
}
