//! Cinescore UI crate - the interactive predictor behind the form surface.
//!
//! Raw form input goes through best-effort translation, the same text
//! features and encoders the training pipeline used, and the best model.
//! The form page itself is a self-contained HTML template embedded at
//! compile time via `include_str!`.
//!
//! # Modules
//!
//! - [`translate`]: Overview translation with fallback to the original text
//! - [`interactive`]: Input validation, feature derivation and prediction
//! - [`form`]: Rendering of the form page

pub mod form;
pub mod interactive;
pub mod translate;

pub use form::{render_form, FormView, FORM_HTML};
pub use interactive::{FormInput, InputError, InteractivePredictor, Prediction, MAX_RUNTIME, MIN_RUNTIME};
pub use translate::{translate_or_original, translator_from_config, HttpTranslator, NoopTranslator, Translator};
