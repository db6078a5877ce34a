//! Training stage: cleaned dataset in, backup model (and maybe a new best
//! model) out.

use chrono::Utc;
use tracing::info;

use cinescore_core::config::TrainingConfig;
use cinescore_core::dataset;
use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::layout::DataLayout;
use cinescore_core::outcome::Outcome;
use cinescore_core::types::{CleanedRecord, FeatureVector, RunDate};

use crate::metrics::rmse;
use crate::model::RatingModel;
use crate::promotion::{Decision, ModelRegistry};
use crate::split::train_test_split;
use crate::tracker::{run_name, ExperimentTracker, RunMetrics};

/// Smallest dataset that leaves both partitions non-empty.
pub const MIN_TRAINING_ROWS: usize = 5;

/// Summary of one training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub run_name: String,
    pub train_rmse: f64,
    pub test_rmse: f64,
    pub rmse_gap: f64,
    pub decision: Decision,
    /// Whether the tracker accepted the run.
    pub tracking: Outcome<()>,
}

pub struct Trainer<'a> {
    layout: &'a DataLayout,
    config: &'a TrainingConfig,
    tracker: &'a dyn ExperimentTracker,
}

impl<'a> Trainer<'a> {
    pub fn new(
        layout: &'a DataLayout,
        config: &'a TrainingConfig,
        tracker: &'a dyn ExperimentTracker,
    ) -> Self {
        Self {
            layout,
            config,
            tracker,
        }
    }

    /// Train on `movies_cleaned_{date}.csv`, write the backup and apply the
    /// promotion rule.
    pub async fn run(&self, date: RunDate) -> Result<TrainReport> {
        let input = self.layout.cleaned_dataset(date);
        let records: Vec<CleanedRecord> = dataset::read_records(&input)?;
        if records.len() < MIN_TRAINING_ROWS {
            return Err(CinescoreError::InsufficientData(format!(
                "{} has {} rows, at least {} are needed",
                input.display(),
                records.len(),
                MIN_TRAINING_ROWS
            )));
        }

        let split = train_test_split(records, self.config.test_fraction, self.config.split_seed);
        if split.train.is_empty() || split.test.is_empty() {
            return Err(CinescoreError::InsufficientData(format!(
                "test fraction {} leaves an empty partition",
                self.config.test_fraction
            )));
        }
        let (train_x, train_y) = columns(&split.train);
        let (test_x, test_y) = columns(&split.test);

        let family = self.config.model.model_type;
        info!(
            run_date = %date,
            family = %family,
            train_rows = train_x.len(),
            test_rows = test_x.len(),
            "Training model"
        );
        let model = RatingModel::fit(family, &self.config.model.params, &train_x, &train_y)?;

        let train_rmse = rmse(&train_y, &model.predict(&train_x));
        let test_rmse = rmse(&test_y, &model.predict(&test_x));
        let rmse_gap = (test_rmse - train_rmse).abs();
        info!(train_rmse, test_rmse, rmse_gap, "Model evaluated");

        let registry = ModelRegistry::new(self.layout);
        let record = registry.record_run(date, &model.to_bytes()?, rmse_gap)?;

        let name = run_name(family, date, model.params());
        let metrics = RunMetrics {
            project: self.config.tracker.project.clone(),
            run_name: name.clone(),
            model_type: family,
            params: model.params().clone(),
            train_rmse,
            test_rmse,
            rmse_gap,
            promoted: record.decision.promotes(),
            logged_at: Utc::now(),
        };
        let tracking = self.tracker.log_best_effort(&metrics).await;

        Ok(TrainReport {
            run_name: name,
            train_rmse,
            test_rmse,
            rmse_gap,
            decision: record.decision,
            tracking,
        })
    }
}

fn columns(rows: &[CleanedRecord]) -> (Vec<FeatureVector>, Vec<f64>) {
    rows.iter().map(|r| (r.features(), r.label())).unzip()
}
