//! HTTP client for the external movie catalog.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cinescore_core::config::CatalogConfig;
use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::types::RawRecord;

/// One entry of the catalog's nested genre list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct PopularPage {
    results: Vec<PopularItem>,
}

#[derive(Debug, Deserialize)]
struct PopularItem {
    id: u64,
}

/// Full movie detail as returned by `movie/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetail {
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
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl MovieDetail {
    /// Flatten into a raw dataset row. Empty strings become missing values
    /// and the genre list is kept as its JSON encoding.
    pub fn into_record(self) -> Result<RawRecord> {
        let genres = serde_json::to_string(&self.genres)?;
        Ok(RawRecord {
            id: self.id,
            title: non_empty(self.title),
            original_language: non_empty(self.original_language),
            budget: self.budget,
            revenue: self.revenue,
            runtime: self.runtime,
            genres: Some(genres),
            release_date: non_empty(self.release_date),
            vote_count: self.vote_count,
            vote_average: self.vote_average,
            overview: non_empty(self.overview),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Client for the catalog's `movie/popular` listing and `movie/{id}` detail.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CatalogClient {
    /// Build a client from the catalog configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            warn!("Catalog API key is not configured; requests will likely be rejected");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CinescoreError::Catalog(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Identifiers listed on one page of the popular listing (1-based).
    pub async fn popular_page(&self, page: u32) -> Result<Vec<u64>> {
        let url = format!("{}/movie/popular", self.base_url);
        let page_param = page.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("page", page_param.as_str())])
            .send()
            .await
            .map_err(|e| CinescoreError::Catalog(format!("Failed to fetch page {}: {}", page, e)))?;

        if !response.status().is_success() {
            return Err(CinescoreError::Catalog(format!(
                "Failed to fetch page {}: status {}",
                page,
                response.status()
            )));
        }

        let body: PopularPage = response
            .json()
            .await
            .map_err(|e| CinescoreError::Catalog(format!("Failed to parse page {}: {}", page, e)))?;
        debug!(page, items = body.results.len(), "Popular page fetched");
        Ok(body.results.into_iter().map(|item| item.id).collect())
    }

    /// Full detail of one movie.
    pub async fn movie_detail(&self, id: u64) -> Result<MovieDetail> {
        let url = format!("{}/movie/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| CinescoreError::Catalog(format!("Failed to fetch movie {}: {}", id, e)))?;

        if !response.status().is_success() {
            return Err(CinescoreError::Catalog(format!(
                "Failed to fetch movie {}: status {}",
                id,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CinescoreError::Catalog(format!("Failed to parse movie {}: {}", id, e)))
    }
}
