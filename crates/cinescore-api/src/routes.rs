//! Router setup for both serving surfaces.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use cinescore_core::error::{CinescoreError, Result};

use crate::handlers;
use crate::state::{FormState, PredictionState};

/// Router of the prediction surface.
pub fn create_prediction_router(state: PredictionState) -> Router {
    Router::new()
        .route("/predict", get(handlers::predict))
        .route("/health", get(handlers::prediction_health))
        .route("/reload", post(handlers::prediction_reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router of the interactive form surface.
pub fn create_form_router(state: FormState) -> Router {
    Router::new()
        .route("/", get(handlers::form_page).post(handlers::form_submit))
        .route("/health", get(handlers::form_health))
        .route("/reload", post(handlers::form_reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve `router` until the process ends.
pub async fn serve(router: Router, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CinescoreError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(CinescoreError::Io)?;

    Ok(())
}
