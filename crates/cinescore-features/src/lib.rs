//! Cinescore features crate - persistent categorical encoders, overview
//! text features and the preprocessing stage.
//!
//! Everything that turns raw values into model inputs lives here so the
//! training pipeline and both serving surfaces derive features through the
//! same code.

pub mod builder;
pub mod encoder;
pub mod text;

pub use builder::{BuildReport, FeatureBuilder};
pub use encoder::{CategoryEncoder, EncoderState, UnseededEncoder, OUT_OF_VOCABULARY};
pub use text::{overview_features, SentimentAnalyzer, TextFeatures, VaderSentiment};
