//! Unsupervised anomaly model: a seeded isolation forest over the four
//! temporal features. No outbreak labels exist reliably, so the model only
//! learns what "typical" feature vectors look like and scores departure
//! from that.

mod tree;

pub use tree::IsolationTree;

use crate::config::RiskConfig;
use crate::model::FeatureVector;
use crate::risk::scorer::ScoreBounds;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForestError {
    #[error("insufficient training data: need {needed} complete rows, have {have}")]
    InsufficientData { needed: usize, have: usize },

    #[error("incomplete features for {region} period {period}: {field} is missing")]
    IncompleteFeatures {
        region: String,
        period: i64,
        field: &'static str,
    },
}

/// Number of features per vector (incidence, lag1, lag2, ma3).
pub const FEATURE_COUNT: usize = 4;

/// The isolation forest ensemble. Immutable once trained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Subsample size each tree was grown from; fixes the score scale.
    sample_size: usize,
}

impl IsolationForest {
    /// Grow the ensemble from complete feature rows.
    ///
    /// Rows with any missing lag/MA field must be filtered out by the
    /// caller before training; this function only sees dense rows.
    pub fn train(rows: &[[f64; FEATURE_COUNT]], config: &RiskConfig) -> Result<Self, ForestError> {
        if rows.len() < config.min_training_rows {
            return Err(ForestError::InsufficientData {
                needed: config.min_training_rows,
                have: rows.len(),
            });
        }

        let sample_size = config.sample_size.min(rows.len());
        let mut rng = StdRng::seed_from_u64(config.random_seed);

        let trees = (0..config.ensemble_size)
            .map(|_| IsolationTree::grow(rows, sample_size, &mut rng))
            .collect();

        Ok(Self { trees, sample_size })
    }

    /// Anomaly score in (0, 1): higher = more unusual.
    ///
    /// Standard isolation-forest formula: `2^(-E[h(x)] / c(n))` where
    /// `E[h(x)]` is the mean isolation depth across trees and `c(n)` the
    /// expected depth for the subsample size.
    pub fn raw_score(&self, point: &[f64; FEATURE_COUNT]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(point)).sum();
        let mean_depth = total / self.trees.len() as f64;
        let norm = tree::average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_depth / norm)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

/// Immutable artifact produced by a training run.
///
/// Holds everything scoring needs: the ensemble, the fitted normalization
/// bounds, and the seed that produced it. Serializable so it can cross the
/// persistence boundary and be reloaded without losing determinism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub forest: IsolationForest,
    pub bounds: ScoreBounds,
    pub seed: u64,
    pub training_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Raw anomaly score for a fully defined feature vector.
    ///
    /// Pure: no mutation, no side effects, safe to call concurrently from
    /// any number of readers.
    pub fn raw_score(&self, vector: &FeatureVector) -> Result<f64, ForestError> {
        let Some(point) = vector.dense() else {
            return Err(ForestError::IncompleteFeatures {
                region: vector.region.clone(),
                period: vector.period,
                // missing_field is Some whenever dense() is None
                field: vector.missing_field().unwrap_or("lag1"),
            });
        };
        Ok(self.forest.raw_score(&point))
    }

    /// Normalized risk in [0, 100] for a fully defined feature vector.
    pub fn risk_score(&self, vector: &FeatureVector) -> Result<f64, ForestError> {
        Ok(self.bounds.normalize(self.raw_score(vector)?))
    }
}
