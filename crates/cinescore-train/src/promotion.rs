//! Best-model promotion.
//!
//! The best slot is a two-state machine: either no best model exists, or one
//! exists together with a (possibly unreadable) persisted gap. A run promotes
//! when there is no best model, when the persisted gap cannot be read, or
//! when its own gap is strictly smaller.

use std::path::Path;

use tracing::{info, warn};

use cinescore_core::error::Result;
use cinescore_core::layout::DataLayout;
use cinescore_core::types::RunDate;

/// Observed state of the best-model slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BestState {
    NoBestExists,
    /// `score` is `None` when the score file is absent or does not parse.
    BestExists { score: Option<f64> },
}

/// Why a run was promoted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromotionReason {
    FirstRun,
    ScoreUnreadable,
    Improved { previous: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Promote(PromotionReason),
    Keep { best: f64 },
}

impl Decision {
    pub fn promotes(&self) -> bool {
        matches!(self, Decision::Promote(_))
    }
}

/// The promotion rule. Strictly smaller gaps win; ties keep the incumbent.
pub fn decide(state: BestState, gap: f64) -> Decision {
    match state {
        BestState::NoBestExists => Decision::Promote(PromotionReason::FirstRun),
        BestState::BestExists { score: None } => Decision::Promote(PromotionReason::ScoreUnreadable),
        BestState::BestExists {
            score: Some(previous),
        } => {
            if gap < previous {
                Decision::Promote(PromotionReason::Improved { previous })
            } else {
                Decision::Keep { best: previous }
            }
        }
    }
}

/// Persisted text form of a gap. Always carries a decimal point, so a gap of
/// two is written as `2.0`.
pub fn format_score(gap: f64) -> String {
    format!("{:?}", gap)
}

fn read_score(path: &Path) -> Option<f64> {
    let text = std::fs::read_to_string(path).ok()?;
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Outcome of recording one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub decision: Decision,
    pub backup_path: std::path::PathBuf,
}

/// Backups, the best-model slot and its score file inside the data directory.
pub struct ModelRegistry<'a> {
    layout: &'a DataLayout,
}

impl<'a> ModelRegistry<'a> {
    pub fn new(layout: &'a DataLayout) -> Self {
        Self { layout }
    }

    /// Inspect the best-model slot.
    pub fn state(&self) -> BestState {
        if !self.layout.best_model().exists() {
            return BestState::NoBestExists;
        }
        let score = read_score(&self.layout.best_score());
        if score.is_none() {
            warn!(
                path = %self.layout.best_score().display(),
                "Best model exists but its score is missing or unreadable"
            );
        }
        BestState::BestExists { score }
    }

    /// Persisted gap of the current best model, if readable.
    pub fn best_score(&self) -> Option<f64> {
        read_score(&self.layout.best_score())
    }

    /// Write the dated backup, then promote if the rule says so.
    ///
    /// The backup is written before the decision and regardless of it.
    pub fn record_run(&self, date: RunDate, model: &[u8], gap: f64) -> Result<RunRecord> {
        self.layout.ensure_root()?;
        let backup_path = self.layout.backup_model(date);
        write_atomic(&backup_path, model)?;
        info!(path = %backup_path.display(), "Backup model saved");

        let decision = decide(self.state(), gap);
        match decision {
            Decision::Promote(reason) => {
                write_atomic(&self.layout.best_model(), model)?;
                write_atomic(&self.layout.best_score(), format_score(gap).as_bytes())?;
                info!(gap, reason = ?reason, "Best model promoted");
            }
            Decision::Keep { best } => {
                info!(gap, best, "Best model kept");
            }
        }
        Ok(RunRecord {
            decision,
            backup_path,
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("partial");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
