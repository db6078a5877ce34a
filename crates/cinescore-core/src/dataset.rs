//! CSV persistence for raw and cleaned datasets.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CinescoreError, Result};

/// Read every row of a CSV file with a header line.
///
/// A missing file is a [`CinescoreError::PreconditionMissing`]: datasets are
/// always produced by an upstream stage.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(CinescoreError::missing(path));
    }
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| CinescoreError::Dataset(format!("{}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        let row: T = row.map_err(|e| {
            CinescoreError::Dataset(format!("{} row {}: {}", path.display(), line + 1, e))
        })?;
        rows.push(row);
    }
    debug!(path = %path.display(), rows = rows.len(), "Dataset read");
    Ok(rows)
}

/// Write rows to a CSV file with a header line.
///
/// The file is written next to its destination and renamed into place, so
/// readers never observe a half-written dataset.
pub fn write_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("csv.partial");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .map_err(|e| CinescoreError::Dataset(format!("{}: {}", tmp.display(), e)))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| CinescoreError::Dataset(e.to_string()))?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), rows = rows.len(), "Dataset written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRecord;

    #[test]
    fn test_missing_dataset_is_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_records::<RawRecord>(&dir.path().join("movies_2026-01-01.csv"));
        assert!(matches!(
            result,
            Err(CinescoreError::PreconditionMissing { .. })
        ));
    }

    #[test]
    fn test_empty_cells_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(
            &path,
            "id,title,runtime,vote_count,overview,extra_column\n1,Alien,,10,,ignored\n",
        )
        .unwrap();

        let rows: Vec<RawRecord> = read_records(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("Alien"));
        assert_eq!(rows[0].runtime, None);
        assert_eq!(rows[0].vote_count, Some(10));
        assert_eq!(rows[0].overview, None);
        assert_eq!(rows[0].budget, None);
    }

    #[test]
    fn test_write_then_read_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("raw.csv");
        let rows = vec![RawRecord {
            id: 9,
            title: Some("Up".into()),
            runtime: Some(96.0),
            ..RawRecord::default()
        }];
        write_records(&path, &rows).unwrap();

        let back: Vec<RawRecord> = read_records(&path).unwrap();
        assert_eq!(back, rows);
        assert!(!path.with_extension("csv.partial").exists());
    }
}
