//! Pipeline configuration.
//!
//! One explicit value passed through train/score calls -- no global state,
//! so a process can host several independently configured models.

use crate::risk::AlertLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Upper bound (exclusive, except the final 100.0) for one alert level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    pub level: AlertLevel,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Number of randomized trees in the ensemble.
    pub ensemble_size: usize,
    /// Subsample size each tree is grown from.
    pub sample_size: usize,
    /// Fraction clipped off each tail of the raw-score distribution when
    /// fitting normalization bounds.
    pub clip_percentile: f64,
    /// Seed for tree construction; stored in the trained artifact.
    pub random_seed: u64,
    /// Minimum complete feature rows required to train at all.
    pub min_training_rows: usize,
    /// Ordered alert cut points covering [0, 100].
    pub alert_cut_points: Vec<CutPoint>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            ensemble_size: 200,
            sample_size: 256,
            clip_percentile: 0.01,
            random_seed: 42,
            min_training_rows: 30,
            alert_cut_points: vec![
                CutPoint { level: AlertLevel::Low, upper: 40.0 },
                CutPoint { level: AlertLevel::Moderate, upper: 65.0 },
                CutPoint { level: AlertLevel::High, upper: 85.0 },
                CutPoint { level: AlertLevel::Critical, upper: 100.0 },
            ],
        }
    }
}

impl RiskConfig {
    /// Load from a TOML file. Unset keys fall back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing config file {path}"))?;
        Ok(config)
    }
}
