//! Cinescore training crate - regression models, the train/test split,
//! the promotion rule for the best-model slot and experiment tracking.

pub mod metrics;
pub mod model;
pub mod promotion;
pub mod split;
pub mod tracker;
pub mod trainer;

pub use metrics::rmse;
pub use model::RatingModel;
pub use promotion::{decide, BestState, Decision, ModelRegistry, PromotionReason, RunRecord};
pub use split::{train_test_split, Split};
pub use tracker::{run_name, ExperimentTracker, HttpTracker, JsonlTracker, RunMetrics};
pub use trainer::{TrainReport, Trainer, MIN_TRAINING_ROWS};
