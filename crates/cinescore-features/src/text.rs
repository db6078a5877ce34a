//! Overview text features: polarity and length.

use vader_sentiment::SentimentIntensityAnalyzer;

/// Scores the polarity of free text.
///
/// Implementations return a value in `[-1.0, 1.0]`.
pub trait SentimentAnalyzer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// Lexicon-based polarity using the VADER compound score.
#[derive(Debug, Default, Clone, Copy)]
pub struct VaderSentiment;

impl VaderSentiment {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentAnalyzer for VaderSentiment {
    fn polarity(&self, text: &str) -> f64 {
        let analyzer = SentimentIntensityAnalyzer::new();
        let scores = analyzer.polarity_scores(text);
        scores.get("compound").copied().unwrap_or(0.0)
    }
}

/// The two text-derived model inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFeatures {
    pub sentiment: f64,
    /// Unicode scalar values in the text.
    pub length: u64,
}

/// Derive sentiment and length from an overview. Missing or blank text is
/// neutral; length counts the text as given, whitespace included.
pub fn overview_features<A: SentimentAnalyzer + ?Sized>(
    analyzer: &A,
    text: Option<&str>,
) -> TextFeatures {
    let text = text.unwrap_or("");
    let length = text.chars().count() as u64;
    let sentiment = if text.trim().is_empty() {
        0.0
    } else {
        let score = analyzer.polarity(text);
        if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    };
    TextFeatures { sentiment, length }
}
