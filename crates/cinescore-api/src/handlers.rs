//! Route handler functions for both serving surfaces.
//!
//! Each handler extracts query or form parameters via axum extractors,
//! reads the surface's loaded artifacts and returns JSON or HTML.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cinescore_core::outcome::Outcome;
use cinescore_core::types::FeatureVector;
use cinescore_distribute::TransferReport;
use cinescore_ui::{render_form, FormInput, FormView};

use crate::error::ApiError;
use crate::state::{FormState, PredictionState};

// =============================================================================
// Request types
// =============================================================================

/// Query of `GET /predict`. All five features are required.
#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub runtime: Option<f64>,
    pub genre_encoded: Option<i64>,
    pub lang_encoded: Option<i64>,
    pub sentiment: Option<f64>,
    pub overview_len: Option<u64>,
}

impl PredictParams {
    fn into_features(self) -> Result<FeatureVector, ApiError> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
            value.ok_or_else(|| ApiError::BadRequest(format!("missing query parameter '{}'", name)))
        }
        let features = FeatureVector {
            runtime: required(self.runtime, "runtime")?,
            genre_encoded: required(self.genre_encoded, "genre_encoded")?,
            lang_encoded: required(self.lang_encoded, "lang_encoded")?,
            overview_sentiment: required(self.sentiment, "sentiment")?,
            overview_len: required(self.overview_len, "overview_len")?,
        };
        if !features.runtime.is_finite() || !features.overview_sentiment.is_finite() {
            return Err(ApiError::BadRequest(
                "runtime and sentiment must be finite numbers".to_string(),
            ));
        }
        Ok(features)
    }
}

/// Raw form fields. `runtime` is parsed by hand so a bad value re-renders
/// the page with a message instead of a bare rejection.
#[derive(Debug, Deserialize)]
pub struct FormSubmission {
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub overview: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_rating: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` while no model is loaded.
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    pub generation: Option<String>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    /// Generation now being served.
    pub generation: Option<String>,
    /// Whether the pull completed and was verified against a manifest.
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReloadResponse {
    fn from_pull(pulled: &Outcome<TransferReport>, generation: Option<String>) -> Self {
        Self {
            generation,
            verified: !pulled.is_degraded(),
            note: pulled.reason().map(str::to_string),
        }
    }
}

// =============================================================================
// Prediction surface
// =============================================================================

/// GET /predict - apply the best model to a pre-encoded feature vector.
pub async fn predict(
    State(state): State<PredictionState>,
    query: Result<Query<PredictParams>, QueryRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let features = params.into_features()?;
    let loaded = state.current_model().await?;
    let predicted_rating = loaded.model.predict_one(&features);
    debug!(predicted_rating, "Prediction served");
    Ok(Json(PredictResponse { predicted_rating }))
}

/// GET /health on the prediction surface.
pub async fn prediction_health(State(state): State<PredictionState>) -> Json<HealthResponse> {
    let model_loaded = state.has_model().await;
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded,
        generation: state.generation().await,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /reload on the prediction surface.
pub async fn prediction_reload(
    State(state): State<PredictionState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let pulled = state.reload().await?;
    Ok(Json(ReloadResponse::from_pull(&pulled, state.generation().await)))
}

// =============================================================================
// Form surface
// =============================================================================

/// GET / - the empty form.
pub async fn form_page(State(state): State<FormState>) -> Html<String> {
    let predictor = state.predictor().await;
    Html(render_form(&FormView {
        genres: predictor.genres(),
        languages: predictor.languages(),
        generation: predictor.generation(),
        ..Default::default()
    }))
}

/// POST / - predict and re-render the form with the result.
pub async fn form_submit(
    State(state): State<FormState>,
    Form(submission): Form<FormSubmission>,
) -> Html<String> {
    let predictor = state.predictor().await;
    let runtime = submission.runtime.trim().parse::<u32>();
    let input = FormInput {
        runtime: *runtime.as_ref().unwrap_or(&0),
        genre: submission.genre,
        language: submission.language,
        overview: submission.overview,
    };

    let (prediction, error) = match runtime {
        Err(_) => (
            None,
            Some(format!("Runtime must be a whole number of minutes, got '{}'", submission.runtime)),
        ),
        Ok(_) => match predictor.predict(&input).await {
            Ok(prediction) => (Some(prediction), None),
            Err(e) => {
                warn!(error = %e, "Form input rejected");
                (None, Some(e.to_string()))
            }
        },
    };

    Html(render_form(&FormView {
        genres: predictor.genres(),
        languages: predictor.languages(),
        generation: predictor.generation(),
        input: Some(&input),
        prediction: prediction.as_ref(),
        error,
    }))
}

/// GET /health on the form surface.
pub async fn form_health(State(state): State<FormState>) -> Json<HealthResponse> {
    let predictor = state.predictor().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: true,
        generation: predictor.generation().map(str::to_string),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /reload on the form surface.
pub async fn form_reload(State(state): State<FormState>) -> Result<Json<ReloadResponse>, ApiError> {
    let pulled = state.reload().await?;
    let generation = state.predictor().await.generation().map(str::to_string);
    Ok(Json(ReloadResponse::from_pull(&pulled, generation)))
}
