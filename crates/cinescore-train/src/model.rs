//! Rating regressors bound to the fixed feature schema.
//!
//! Every family is built from single-tree `gbdt` fits. The two boosting
//! families add shrunken residual trees round by round and differ in how
//! they regularise leaves; the random forest averages trees grown on
//! bootstrap resamples. All row sampling is drawn from `random_state`, so
//! identical inputs give identical models.

use std::path::Path;

use gbdt::config::Config as TreeConfig;
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cinescore_core::error::{CinescoreError, Result};
use cinescore_core::types::{FeatureVector, ModelFamily, ModelParams, FEATURE_COLUMNS};

const DEFAULT_ESTIMATORS: u32 = 100;
const DEFAULT_LEARNING_RATE: f64 = 0.1;
const DEFAULT_MAX_DEPTH: u32 = 6;
const DEFAULT_SEED: u64 = 42;
/// Depth used by the forest when none is configured; its trees grow deep.
const FOREST_DEFAULT_DEPTH: u32 = 16;
/// Leaf-size floor of the leaf-regularised boosting family.
const LEAFWISE_MIN_LEAF: usize = 20;

#[derive(Serialize, Deserialize)]
enum Ensemble {
    Boosted {
        base: f64,
        learning_rate: f64,
        trees: Vec<GBDT>,
    },
    Forest(Vec<GBDT>),
}

/// A fitted regressor plus the schema it was trained on.
#[derive(Serialize, Deserialize)]
pub struct RatingModel {
    family: ModelFamily,
    feature_columns: Vec<String>,
    params: ModelParams,
    ensemble: Ensemble,
}

impl std::fmt::Debug for RatingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingModel")
            .field("family", &self.family)
            .field("feature_columns", &self.feature_columns)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Parameters a family actually accepts. The forest has no learning rate or
/// row subsampling of its own.
pub fn effective_params(family: ModelFamily, params: &ModelParams) -> ModelParams {
    let mut params = params.clone();
    if family == ModelFamily::RandomForest {
        if params.learning_rate.take().is_some() {
            debug!("learning_rate is not used by the random forest; dropped");
        }
        if params.subsample.take().is_some() {
            debug!("subsample is not used by the random forest; dropped");
        }
    }
    params
}

impl RatingModel {
    /// Fit a model of `family` on feature rows and labels.
    pub fn fit(
        family: ModelFamily,
        params: &ModelParams,
        features: &[FeatureVector],
        labels: &[f64],
    ) -> Result<Self> {
        if features.is_empty() || features.len() != labels.len() {
            return Err(CinescoreError::Model(format!(
                "cannot fit on {} rows with {} labels",
                features.len(),
                labels.len()
            )));
        }

        let params = effective_params(family, params);
        let ensemble = match family {
            ModelFamily::GradientBoosting => fit_boosted(&params, features, labels, 1)?,
            ModelFamily::LeafwiseBoosting => {
                fit_boosted(&params, features, labels, LEAFWISE_MIN_LEAF)?
            }
            ModelFamily::RandomForest => Ensemble::Forest(fit_forest(&params, features, labels)?),
        };
        info!(family = %family, rows = features.len(), "Model fitted");

        Ok(Self {
            family,
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            params,
            ensemble,
        })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Hyperparameters after family-specific stripping.
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Predict one rating per feature row.
    pub fn predict(&self, features: &[FeatureVector]) -> Vec<f64> {
        if features.is_empty() {
            return Vec::new();
        }
        let data: DataVec = features.iter().map(test_row).collect();
        match &self.ensemble {
            Ensemble::Boosted {
                base,
                learning_rate,
                trees,
            } => {
                let mut scores = vec![*base; features.len()];
                for tree in trees {
                    for (score, p) in scores.iter_mut().zip(tree.predict(&data)) {
                        *score += learning_rate * f64::from(p);
                    }
                }
                scores
            }
            Ensemble::Forest(trees) => {
                let mut sums = vec![0.0f64; features.len()];
                for tree in trees {
                    for (sum, p) in sums.iter_mut().zip(tree.predict(&data)) {
                        *sum += f64::from(p);
                    }
                }
                let count = trees.len().max(1) as f64;
                sums.into_iter().map(|s| s / count).collect()
            }
        }
    }

    /// Predict a single row.
    pub fn predict_one(&self, features: &FeatureVector) -> f64 {
        self.predict(std::slice::from_ref(features))
            .first()
            .copied()
            .unwrap_or(0.0)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CinescoreError::Model(e.to_string()))
    }

    /// Decode a model artifact, rejecting one trained on a different schema.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: RatingModel =
            serde_json::from_slice(bytes).map_err(|e| CinescoreError::Model(e.to_string()))?;
        if model.feature_columns != FEATURE_COLUMNS {
            return Err(CinescoreError::Model(format!(
                "model expects features {:?}, serving provides {:?}",
                model.feature_columns, FEATURE_COLUMNS
            )));
        }
        Ok(model)
    }

    /// Load a model artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CinescoreError::missing(path)
            } else {
                CinescoreError::Io(e)
            }
        })?;
        Self::from_bytes(&bytes)
    }
}

fn training_row(features: &FeatureVector, label: f64) -> Data {
    Data::new_training_data(to_values(features), 1.0, label as ValueType, None)
}

fn test_row(features: &FeatureVector) -> Data {
    Data::new_test_data(to_values(features), None)
}

fn to_values(features: &FeatureVector) -> Vec<ValueType> {
    features.to_row().iter().map(|v| *v as ValueType).collect()
}

fn base_config(max_depth: u32) -> TreeConfig {
    let mut cfg = TreeConfig::new();
    cfg.set_feature_size(FEATURE_COLUMNS.len());
    cfg.set_max_depth(max_depth);
    cfg.set_loss("SquaredError");
    cfg.set_debug(false);
    cfg.set_feature_sample_ratio(1.0);
    cfg.set_training_optimization_level(2);
    cfg
}

/// Config of one regression tree: a single unshrunk round on whatever rows
/// it is handed.
fn tree_config(max_depth: u32, min_leaf_size: usize) -> TreeConfig {
    let mut cfg = base_config(max_depth);
    cfg.set_iterations(1);
    cfg.set_shrinkage(1.0);
    cfg.set_data_sample_ratio(1.0);
    cfg.set_min_leaf_size(min_leaf_size);
    cfg
}

/// Rows drawn without replacement for one boosting round.
fn round_sample_size(n: usize, subsample: f64) -> usize {
    ((n as f64 * subsample.clamp(0.0, 1.0)).ceil() as usize).clamp(1, n)
}

fn fit_boosted(
    params: &ModelParams,
    features: &[FeatureVector],
    labels: &[f64],
    min_leaf_size: usize,
) -> Result<Ensemble> {
    let rounds = params.n_estimators.unwrap_or(DEFAULT_ESTIMATORS) as usize;
    let learning_rate = params.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE);
    let n = features.len();
    let sample_size = round_sample_size(n, params.subsample.unwrap_or(1.0));
    // The minimum leaf size must leave at least one split on small datasets.
    let min_leaf = min_leaf_size.min((sample_size / 2).max(1));
    let cfg = tree_config(params.max_depth.unwrap_or(DEFAULT_MAX_DEPTH), min_leaf);
    let mut rng = StdRng::seed_from_u64(params.random_state.unwrap_or(DEFAULT_SEED));

    let base = labels.iter().sum::<f64>() / n as f64;
    let all_rows: DataVec = features.iter().map(test_row).collect();
    let mut scores = vec![base; n];
    let mut trees = Vec::with_capacity(rounds);

    for _ in 0..rounds {
        let mut sample: DataVec = if sample_size == n {
            (0..n)
                .map(|i| training_row(&features[i], labels[i] - scores[i]))
                .collect()
        } else {
            let mut picked = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            picked.sort_unstable();
            picked
                .into_iter()
                .map(|i| training_row(&features[i], labels[i] - scores[i]))
                .collect()
        };
        let mut tree = GBDT::new(&cfg);
        tree.fit(&mut sample);
        for (score, p) in scores.iter_mut().zip(tree.predict(&all_rows)) {
            *score += learning_rate * f64::from(p);
        }
        trees.push(tree);
    }
    debug!(rounds = trees.len(), sample_size, "Boosting rounds fitted");

    Ok(Ensemble::Boosted {
        base,
        learning_rate,
        trees,
    })
}

fn fit_forest(
    params: &ModelParams,
    features: &[FeatureVector],
    labels: &[f64],
) -> Result<Vec<GBDT>> {
    let trees = params.n_estimators.unwrap_or(DEFAULT_ESTIMATORS).max(1);
    let seed = params.random_state.unwrap_or(DEFAULT_SEED);
    let cfg = tree_config(params.max_depth.unwrap_or(FOREST_DEFAULT_DEPTH), 1);

    let n = features.len();
    let mut forest = Vec::with_capacity(trees as usize);
    for i in 0..trees {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(i)));
        let mut sample: DataVec = (0..n)
            .map(|_| {
                let idx = rng.random_range(0..n);
                training_row(&features[idx], labels[idx])
            })
            .collect();
        let mut tree = GBDT::new(&cfg);
        tree.fit(&mut sample);
        forest.push(tree);
    }
    debug!(trees = forest.len(), "Forest grown");
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> (Vec<FeatureVector>, Vec<f64>) {
        let features: Vec<FeatureVector> = (0..n)
            .map(|i| FeatureVector {
                runtime: 80.0 + i as f64 * 2.0,
                genre_encoded: (i % 3) as i64,
                lang_encoded: (i % 2) as i64,
                overview_sentiment: 0.0,
                overview_len: 100,
            })
            .collect();
        let labels = features
            .iter()
            .map(|f| if f.runtime < 120.0 { 4.0 } else { 8.0 })
            .collect();
        (features, labels)
    }

    fn small_params() -> ModelParams {
        ModelParams {
            n_estimators: Some(30),
            learning_rate: Some(0.3),
            max_depth: Some(3),
            subsample: None,
            random_state: Some(42),
        }
    }

    #[test]
    fn test_forest_strips_boosting_params() {
        let params = ModelParams {
            learning_rate: Some(0.05),
            subsample: Some(0.7),
            ..small_params()
        };
        let stripped = effective_params(ModelFamily::RandomForest, &params);
        assert_eq!(stripped.learning_rate, None);
        assert_eq!(stripped.subsample, None);
        assert_eq!(stripped.max_depth, Some(3));

        let kept = effective_params(ModelFamily::GradientBoosting, &params);
        assert_eq!(kept.learning_rate, Some(0.05));
        assert_eq!(kept.subsample, Some(0.7));
    }

    #[test]
    fn test_every_family_learns_a_step() {
        let (features, labels) = rows(40);
        for family in [
            ModelFamily::GradientBoosting,
            ModelFamily::LeafwiseBoosting,
            ModelFamily::RandomForest,
        ] {
            let model = RatingModel::fit(family, &small_params(), &features, &labels).unwrap();
            let low = model.predict_one(&features[0]);
            let high = model.predict_one(&features[39]);
            assert!(high > low, "{}: {} <= {}", family, high, low);
        }
    }

    #[test]
    fn test_default_config_fits_are_reproducible() {
        let (features, labels) = rows(200);
        let params = cinescore_core::config::ModelConfig::default().params;
        assert!(params.subsample.is_some_and(|s| s < 1.0));
        for family in [ModelFamily::GradientBoosting, ModelFamily::LeafwiseBoosting] {
            let first = RatingModel::fit(family, &params, &features, &labels).unwrap();
            let second = RatingModel::fit(family, &params, &features, &labels).unwrap();
            assert_eq!(first.predict(&features), second.predict(&features), "{}", family);
        }
    }

    #[test]
    fn test_round_sample_size() {
        assert_eq!(round_sample_size(200, 0.7), 140);
        assert_eq!(round_sample_size(10, 0.75), 8);
        assert_eq!(round_sample_size(10, 1.0), 10);
        assert_eq!(round_sample_size(3, 0.0), 1);
    }

    #[test]
    fn test_round_trip_preserves_predictions() {
        let (features, labels) = rows(30);
        let model =
            RatingModel::fit(ModelFamily::RandomForest, &small_params(), &features, &labels)
                .unwrap();
        let restored = RatingModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
        assert_eq!(model.predict(&features), restored.predict(&features));
        assert_eq!(restored.family(), ModelFamily::RandomForest);
        assert_eq!(restored.params().learning_rate, None);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let (features, labels) = rows(20);
        let model =
            RatingModel::fit(ModelFamily::GradientBoosting, &small_params(), &features, &labels)
                .unwrap();
        let mut json: serde_json::Value = serde_json::from_slice(&model.to_bytes().unwrap()).unwrap();
        json["feature_columns"] = serde_json::json!(["runtime", "budget"]);
        let result = RatingModel::from_bytes(json.to_string().as_bytes());
        assert!(matches!(result, Err(CinescoreError::Model(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RatingModel::load(&dir.path().join("best_model.json"));
        assert!(matches!(
            result,
            Err(CinescoreError::PreconditionMissing { .. })
        ));
    }

    #[test]
    fn test_fit_rejects_empty_input() {
        assert!(RatingModel::fit(ModelFamily::GradientBoosting, &small_params(), &[], &[]).is_err());
    }
}
