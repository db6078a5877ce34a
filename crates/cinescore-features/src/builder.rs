//! Preprocessing stage: raw dataset in, cleaned dataset and encoders out.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use cinescore_core::config::FeatureConfig;
use cinescore_core::dataset;
use cinescore_core::error::Result;
use cinescore_core::layout::{DataLayout, GENRE_COLUMN, LANGUAGE_COLUMN};
use cinescore_core::types::{CleanedRecord, RawRecord, RunDate};

use crate::encoder::EncoderState;
use crate::text::{overview_features, SentimentAnalyzer};

/// Category used when a row has no usable genre or language.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Summary of one preprocessing run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub path: PathBuf,
    pub input_rows: usize,
    pub output_rows: usize,
    /// Whether the genre encoder was fitted by this run.
    pub genre_encoder_created: bool,
    /// Whether the language encoder was fitted by this run.
    pub language_encoder_created: bool,
}

/// Turns `movies_{date}.csv` into `movies_cleaned_{date}.csv`.
pub struct FeatureBuilder<'a, A: SentimentAnalyzer> {
    layout: &'a DataLayout,
    config: &'a FeatureConfig,
    analyzer: &'a A,
}

/// A row that survived filtering, before encoding.
struct Candidate {
    raw: RawRecord,
    runtime: f64,
    budget: f64,
    revenue: f64,
    vote_count: u64,
    vote_average: f64,
    release_year: Option<i32>,
    genre: String,
    language: String,
}

impl<'a, A: SentimentAnalyzer> FeatureBuilder<'a, A> {
    pub fn new(layout: &'a DataLayout, config: &'a FeatureConfig, analyzer: &'a A) -> Self {
        Self {
            layout,
            config,
            analyzer,
        }
    }

    /// Run the stage for one date.
    ///
    /// Fails with `PreconditionMissing` when the raw dataset for `date` does
    /// not exist.
    pub fn build(&self, date: RunDate) -> Result<BuildReport> {
        let input = self.layout.raw_dataset(date);
        let raw: Vec<RawRecord> = dataset::read_records(&input)?;
        let input_rows = raw.len();
        info!(path = %input.display(), rows = input_rows, "Raw dataset loaded");

        let candidates: Vec<Candidate> = raw
            .into_iter()
            .filter_map(|record| self.filter(record))
            .collect();
        debug!(
            kept = candidates.len(),
            dropped = input_rows - candidates.len(),
            "Rows filtered"
        );

        let genres: Vec<String> = candidates.iter().map(|c| c.genre.clone()).collect();
        let languages: Vec<String> = candidates.iter().map(|c| c.language.clone()).collect();

        let genre_state = EncoderState::open(&self.layout.encoder(GENRE_COLUMN), GENRE_COLUMN)?;
        let genre_encoder_created = !genre_state.is_seeded();
        let (_, genre_codes) = genre_state.encode_all(&genres)?;

        let language_state =
            EncoderState::open(&self.layout.encoder(LANGUAGE_COLUMN), LANGUAGE_COLUMN)?;
        let language_encoder_created = !language_state.is_seeded();
        let (_, language_codes) = language_state.encode_all(&languages)?;

        let cleaned: Vec<CleanedRecord> = candidates
            .into_iter()
            .zip(genre_codes)
            .zip(language_codes)
            .map(|((candidate, genre_encoded), lang_encoded)| {
                let text = overview_features(self.analyzer, candidate.raw.overview.as_deref());
                CleanedRecord {
                    id: candidate.raw.id,
                    title: candidate.raw.title.unwrap_or_default(),
                    budget: candidate.budget,
                    revenue: candidate.revenue,
                    runtime: candidate.runtime,
                    vote_count: candidate.vote_count,
                    vote_average: candidate.vote_average,
                    release_year: candidate.release_year,
                    genre_encoded,
                    lang_encoded,
                    overview_len: text.length,
                    overview_sentiment: text.sentiment,
                }
            })
            .collect();

        let output = self.layout.cleaned_dataset(date);
        dataset::write_records(&output, &cleaned)?;
        info!(
            path = %output.display(),
            rows = cleaned.len(),
            genre_encoder_created,
            language_encoder_created,
            "Cleaned dataset written"
        );

        Ok(BuildReport {
            path: output,
            input_rows,
            output_rows: cleaned.len(),
            genre_encoder_created,
            language_encoder_created,
        })
    }

    /// Drop rows missing runtime, release date, budget, revenue or the
    /// rating label, and rows with too few votes.
    fn filter(&self, raw: RawRecord) -> Option<Candidate> {
        let runtime = raw.runtime?;
        let budget = raw.budget?;
        let revenue = raw.revenue?;
        let release_date = raw.release_date.as_deref()?;
        let vote_average = raw.vote_average?;
        let vote_count = raw.vote_count.unwrap_or(0);
        if vote_count <= self.config.min_vote_count {
            return None;
        }

        let release_year = release_year(release_date);
        let genre = primary_genre(raw.genres.as_deref());
        let language = raw
            .original_language
            .clone()
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

        Some(Candidate {
            raw,
            runtime,
            budget,
            revenue,
            vote_count,
            vote_average,
            release_year,
            genre,
            language,
        })
    }
}

/// Year of a `YYYY-MM-DD` date.
pub fn release_year(date: &str) -> Option<i32> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.year())
}

/// Name of the first entry of a JSON genre list, or `"Unknown"`.
pub fn primary_genre(genres: Option<&str>) -> String {
    genres
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .and_then(|value| {
            value
                .as_array()
                .and_then(|list| list.first())
                .and_then(|first| first.get("name"))
                .and_then(|name| name.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}
