use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CinescoreError;

// =============================================================================
// Run date
// =============================================================================

/// The logical batch key partitioning every per-run dataset and backup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunDate(NaiveDate);

impl RunDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's date in UTC.
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for RunDate {
    type Err = CinescoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| CinescoreError::Config(format!("invalid run date '{}': {}", s, e)))
    }
}

// =============================================================================
// Model configuration
// =============================================================================

/// Closed set of supported regressor families.
///
/// The serialized names are the values operators write in `model_type`.
/// Anything else fails to deserialize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    /// Depth-wise gradient boosted trees.
    #[serde(rename = "xgboost")]
    GradientBoosting,
    /// Gradient boosted trees regularised by a minimum leaf size.
    #[serde(rename = "lgbm")]
    LeafwiseBoosting,
    /// Bagged regression trees.
    #[serde(rename = "rf")]
    RandomForest,
}

impl ModelFamily {
    /// Name used in configuration and experiment run names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::GradientBoosting => "xgboost",
            ModelFamily::LeafwiseBoosting => "lgbm",
            ModelFamily::RandomForest => "rf",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters shared by every family. Unset values fall back to
/// family defaults at construction time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsample: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

// =============================================================================
// Records
// =============================================================================

/// One catalog item as written to `movies_{date}.csv`.
///
/// `genres` holds the catalog's nested genre list serialized as JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// One row of `movies_cleaned_{date}.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub id: u64,
    pub title: String,
    pub budget: f64,
    pub revenue: f64,
    pub runtime: f64,
    pub vote_count: u64,
    pub vote_average: f64,
    pub release_year: Option<i32>,
    pub genre_encoded: i64,
    pub lang_encoded: i64,
    pub overview_len: u64,
    pub overview_sentiment: f64,
}

impl CleanedRecord {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            runtime: self.runtime,
            genre_encoded: self.genre_encoded,
            lang_encoded: self.lang_encoded,
            overview_sentiment: self.overview_sentiment,
            overview_len: self.overview_len,
        }
    }

    /// Training target.
    pub fn label(&self) -> f64 {
        self.vote_average
    }
}

// =============================================================================
// Feature vector
// =============================================================================

/// Column order of every model input, at training and serving time alike.
pub const FEATURE_COLUMNS: [&str; 5] = [
    "runtime",
    "genre_encoded",
    "lang_encoded",
    "overview_sentiment",
    "overview_len",
];

/// The five model inputs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub runtime: f64,
    pub genre_encoded: i64,
    pub lang_encoded: i64,
    pub overview_sentiment: f64,
    pub overview_len: u64,
}

impl FeatureVector {
    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn to_row(&self) -> [f64; 5] {
        [
            self.runtime,
            self.genre_encoded as f64,
            self.lang_encoded as f64,
            self.overview_sentiment,
            self.overview_len as f64,
        ]
    }
}

// =============================================================================
// Sentiment label
// =============================================================================

/// Qualitative bucket shown next to an interactive prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Bucket a polarity score. Both thresholds are exclusive.
    pub fn from_score(score: f64) -> Self {
        if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
