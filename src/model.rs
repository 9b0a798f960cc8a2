//! Shared data types for the scoring pipeline.

use serde::{Deserialize, Serialize};

/// One surveillance observation: case count and population for a region
/// in a single reporting period (e.g. a year).
///
/// Uniquely keyed by (region, period). Case counts are unsigned so a
/// negative count is unrepresentable here; signed ingestion surfaces must
/// reject negatives before constructing a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub region: String,
    pub period: i64,
    pub cases: u64,
    pub population: u64,
}

/// Temporal features derived from a region's case series.
///
/// Lag and moving-average fields are `None` when the contiguous history
/// needed to compute them does not exist. They are never zero-filled:
/// a missing lag is not the same thing as a low incidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub region: String,
    pub period: i64,
    /// Cases per 100,000 population.
    pub incidence: f64,
    /// Incidence one period back, if period-1 exists contiguously.
    pub lag1: Option<f64>,
    /// Incidence two periods back.
    pub lag2: Option<f64>,
    /// Mean incidence over the trailing 3 periods, current inclusive.
    pub ma3: Option<f64>,
}

impl FeatureVector {
    /// The feature values in model order, or `None` if any field is missing.
    pub fn dense(&self) -> Option<[f64; 4]> {
        Some([self.incidence, self.lag1?, self.lag2?, self.ma3?])
    }

    /// Name of the first missing field, if any. Used for error reporting.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.lag1.is_none() {
            Some("lag1")
        } else if self.lag2.is_none() {
            Some("lag2")
        } else if self.ma3.is_none() {
            Some("ma3")
        } else {
            None
        }
    }
}

/// A scored (region, period) with its operational signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub region: String,
    pub period: i64,
    /// Normalized risk in [0, 100].
    pub risk_score: f64,
    pub alert_level: crate::risk::AlertLevel,
    pub recommendation_key: String,
}

/// Outcome of scoring one (region, period).
///
/// Periods without enough history to form a complete feature vector are
/// reported explicitly rather than given a number -- a missing score must
/// never read as "low risk".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored(RiskAssessment),
    NotScorable {
        region: String,
        period: i64,
        reason: String,
    },
}

impl ScoreOutcome {
    pub fn assessment(&self) -> Option<&RiskAssessment> {
        match self {
            ScoreOutcome::Scored(a) => Some(a),
            ScoreOutcome::NotScorable { .. } => None,
        }
    }
}
