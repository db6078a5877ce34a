//! Fetch stage: listing pages, per-movie detail, dated raw dataset.

use std::path::PathBuf;

use tracing::info;

use cinescore_core::dataset;
use cinescore_core::error::Result;
use cinescore_core::layout::DataLayout;
use cinescore_core::types::{RawRecord, RunDate};

use crate::client::CatalogClient;

/// Summary of a successful fetch run.
#[derive(Debug, Clone)]
pub struct CollectReport {
    pub path: PathBuf,
    pub records: usize,
}

/// Fetch `pages` listing pages and the detail of every listed movie, then
/// write `movies_{date}.csv`.
///
/// Any failed request aborts the run before anything is written; the run
/// is retried as a whole by whoever scheduled it.
pub async fn collect(
    client: &CatalogClient,
    layout: &DataLayout,
    date: RunDate,
    pages: u32,
) -> Result<CollectReport> {
    info!(run_date = %date, pages, "Collecting catalog snapshot");
    layout.ensure_root()?;

    let mut ids = Vec::new();
    for page in 1..=pages {
        ids.extend(client.popular_page(page).await?);
    }

    let mut records: Vec<RawRecord> = Vec::with_capacity(ids.len());
    for id in ids {
        let detail = client.movie_detail(id).await?;
        records.push(detail.into_record()?);
    }

    let path = layout.raw_dataset(date);
    dataset::write_records(&path, &records)?;
    info!(
        path = %path.display(),
        records = records.len(),
        "Raw dataset written"
    );

    Ok(CollectReport {
        path,
        records: records.len(),
    })
}
