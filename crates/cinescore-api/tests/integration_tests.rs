//! Integration tests for the prediction and form surfaces.
//!
//! Each test builds its own artifact directory in a temp dir and drives the
//! router directly with `oneshot`.

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use cinescore_api::handlers::{HealthResponse, PredictResponse, ReloadResponse};
use cinescore_api::{create_form_router, create_prediction_router, FormState, PredictionState};
use cinescore_core::config::TranslationConfig;
use cinescore_core::layout::{DataLayout, GENRE_COLUMN, LANGUAGE_COLUMN};
use cinescore_core::types::{FeatureVector, ModelFamily, ModelParams, RunDate};
use cinescore_distribute::{Distributor, FsStore, LocalArtifacts};
use cinescore_features::EncoderState;
use cinescore_train::RatingModel;

// =============================================================================
// Helpers
// =============================================================================

/// Write a small model and both encoders into `dir`.
fn write_artifacts(dir: &Path, base_rating: f64) {
    let layout = DataLayout::new(dir);
    layout.ensure_root().unwrap();
    let features: Vec<FeatureVector> = (0..30)
        .map(|i| FeatureVector {
            runtime: 60.0 + i as f64 * 4.0,
            genre_encoded: (i % 3) as i64,
            lang_encoded: (i % 2) as i64,
            overview_sentiment: 0.0,
            overview_len: 40,
        })
        .collect();
    let labels: Vec<f64> = (0..30).map(|i| base_rating + (i % 5) as f64 * 0.2).collect();
    let params = ModelParams {
        n_estimators: Some(10),
        max_depth: Some(3),
        ..Default::default()
    };
    let model =
        RatingModel::fit(ModelFamily::GradientBoosting, &params, &features, &labels).unwrap();
    std::fs::write(layout.best_model(), model.to_bytes().unwrap()).unwrap();
    EncoderState::open(&layout.encoder(GENRE_COLUMN), GENRE_COLUMN)
        .unwrap()
        .encode_all(&["Action".to_string(), "Comedy".to_string(), "Drama".to_string()])
        .unwrap();
    EncoderState::open(&layout.encoder(LANGUAGE_COLUMN), LANGUAGE_COLUMN)
        .unwrap()
        .encode_all(&["en".to_string(), "ko".to_string()])
        .unwrap();
}

fn no_store() -> Distributor {
    Distributor::new(None, "models/latest", 3)
}

fn offline_translation() -> TranslationConfig {
    TranslationConfig {
        enabled: false,
        ..Default::default()
    }
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const PREDICT_URI: &str =
    "/predict?runtime=120&genre_encoded=1&lang_encoded=0&sentiment=0.25&overview_len=80";

// =============================================================================
// Prediction surface
// =============================================================================

#[tokio::test]
async fn test_predict_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let state = PredictionState::new(LocalArtifacts::new(dir.path()), no_store());

    let resp = create_prediction_router(state)
        .oneshot(get(PREDICT_URI))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: PredictResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body.predicted_rating.is_finite());
    assert!(body.predicted_rating > 4.0 && body.predicted_rating < 9.0);
}

#[tokio::test]
async fn test_predict_accepts_out_of_vocabulary_codes() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let state = PredictionState::new(LocalArtifacts::new(dir.path()), no_store());

    let resp = create_prediction_router(state)
        .oneshot(get(
            "/predict?runtime=90&genre_encoded=-1&lang_encoded=-1&sentiment=0&overview_len=0",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_predict_without_model_returns_error_json() {
    let dir = tempfile::tempdir().unwrap();
    let state = PredictionState::new(LocalArtifacts::new(dir.path()), no_store());

    let resp = create_prediction_router(state)
        .oneshot(get(PREDICT_URI))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Model not loaded"));
    assert!(body.get("predicted_rating").is_none());
}

#[tokio::test]
async fn test_model_appearing_later_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let state = PredictionState::new(LocalArtifacts::new(dir.path()), no_store());
    let app = create_prediction_router(state);

    let before = app.clone().oneshot(get(PREDICT_URI)).await.unwrap();
    write_artifacts(dir.path(), 6.0);
    let after = app.oneshot(get(PREDICT_URI)).await.unwrap();

    assert_eq!(before.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(after.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_predict_missing_parameter() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let state = PredictionState::new(LocalArtifacts::new(dir.path()), no_store());

    let resp = create_prediction_router(state)
        .oneshot(get("/predict?runtime=120&genre_encoded=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("lang_encoded"));
}

#[tokio::test]
async fn test_predict_non_numeric_parameter_returns_error_json() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let state = PredictionState::new(LocalArtifacts::new(dir.path()), no_store());

    let resp = create_prediction_router(state)
        .oneshot(get(
            "/predict?runtime=abc&genre_encoded=1&lang_encoded=0&sentiment=0&overview_len=10",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["code"], "bad_request");
    assert!(body["error"].as_str().unwrap().contains("query string"));
}

#[tokio::test]
async fn test_prediction_health_reports_model_state() {
    let empty = tempfile::tempdir().unwrap();
    let resp = create_prediction_router(PredictionState::new(
        LocalArtifacts::new(empty.path()),
        no_store(),
    ))
    .oneshot(get("/health"))
    .await
    .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.model_loaded);

    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let resp = create_prediction_router(PredictionState::new(
        LocalArtifacts::new(dir.path()),
        no_store(),
    ))
    .oneshot(get("/health"))
    .await
    .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.model_loaded);
}

#[tokio::test]
async fn test_reload_switches_to_pushed_generation() {
    let pipeline = tempfile::tempdir().unwrap();
    let bucket = tempfile::tempdir().unwrap();
    let serving = tempfile::tempdir().unwrap();
    write_artifacts(pipeline.path(), 6.0);
    write_artifacts(serving.path(), 2.0);

    let publisher = Distributor::new(Some(Box::new(FsStore::new(bucket.path()))), "models/latest", 3);
    let date: RunDate = "2026-01-23".parse().unwrap();
    let pushed = publisher
        .push(&DataLayout::new(pipeline.path()), date)
        .await
        .unwrap();

    let consumer = Distributor::new(Some(Box::new(FsStore::new(bucket.path()))), "models/latest", 3);
    let state = PredictionState::new(LocalArtifacts::new(serving.path()), consumer);
    let app = create_prediction_router(state);

    let resp = app
        .clone()
        .oneshot(Request::post("/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let reload: ReloadResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(reload.verified);
    assert_eq!(reload.generation, pushed.value().generation);

    let resp = app.oneshot(get(PREDICT_URI)).await.unwrap();
    let body: PredictResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body.predicted_rating > 4.0);
}

#[tokio::test]
async fn test_reload_without_bucket_keeps_local_model() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let app = create_prediction_router(PredictionState::new(
        LocalArtifacts::new(dir.path()),
        no_store(),
    ));

    let resp = app
        .oneshot(Request::post("/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let reload: ReloadResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(!reload.verified);
    assert!(reload.note.unwrap().contains("not configured"));
}

// =============================================================================
// Form surface
// =============================================================================

fn form_app(dir: &Path) -> axum::Router {
    let state = FormState::load(LocalArtifacts::new(dir), no_store(), offline_translation()).unwrap();
    create_form_router(state)
}

#[tokio::test]
async fn test_form_surface_requires_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let result = FormState::load(LocalArtifacts::new(dir.path()), no_store(), offline_translation());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_form_page_lists_encoder_classes() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);

    let resp = form_app(dir.path()).oneshot(get("/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("<option value=\"Comedy\">Comedy</option>"));
    assert!(html.contains("<option value=\"ko\">ko</option>"));
}

#[tokio::test]
async fn test_form_submit_renders_prediction() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);

    let resp = form_app(dir.path())
        .oneshot(post_form(
            "/",
            "runtime=110&genre=Drama&language=en&overview=",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains(" / 10"));
    assert!(html.contains("<strong>neutral</strong> (0.00)"));
    assert!(html.contains("Genre: Drama / Language: en / Runtime: 110 min"));
}

#[tokio::test]
async fn test_form_submit_rejects_bad_runtime() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);
    let app = form_app(dir.path());

    let resp = app
        .clone()
        .oneshot(post_form("/", "runtime=301&genre=Drama&language=en&overview=x"))
        .await
        .unwrap();
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("between 1 and 300"));

    let resp = app
        .oneshot(post_form("/", "runtime=long&genre=Drama&language=en"))
        .await
        .unwrap();
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("whole number"));
}

#[tokio::test]
async fn test_form_health() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path(), 6.0);

    let resp = form_app(dir.path()).oneshot(get("/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(health.model_loaded);
    assert_eq!(health.generation, None);
}
