//! Cinescore API crate - the two serving surfaces over axum.
//!
//! The prediction surface answers `GET /predict` for pre-encoded feature
//! vectors. The form surface serves the interactive predictor as an HTML
//! page. Both load their artifacts once, report them on `GET /health` and
//! switch to a newly distributed generation on `POST /reload`.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_form_router, create_prediction_router, serve};
pub use state::{FormState, PredictionState};
