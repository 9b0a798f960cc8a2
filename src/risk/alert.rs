//! Risk score -> discrete alert level and recommendation.

use crate::config::CutPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operational alert levels, lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AlertLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Low,
        AlertLevel::Moderate,
        AlertLevel::High,
        AlertLevel::Critical,
    ];

    /// Stable key the presentation layer resolves to rendered guidance.
    pub fn recommendation_key(&self) -> &'static str {
        match self {
            AlertLevel::Low => "routine-monitoring",
            AlertLevel::Moderate => "enhanced-surveillance",
            AlertLevel::High => "vector-control-campaign",
            AlertLevel::Critical => "emergency-response",
        }
    }

    /// Default operator-facing text for a recommendation key.
    pub fn recommendation_text(&self) -> &'static str {
        match self {
            AlertLevel::Low => "Continue routine surveillance reporting.",
            AlertLevel::Moderate => {
                "Intensify surveillance in health centers over the next 48-72h."
            }
            AlertLevel::High => {
                "Launch targeted vector-control campaign: fumigation and breeding-site removal."
            }
            AlertLevel::Critical => {
                "Activate emergency response: public communication, reinforce rapid tests \
                 and serums in nearby hospitals."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "Low",
            AlertLevel::Moderate => "Moderate",
            AlertLevel::High => "High",
            AlertLevel::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(AlertLevel::Low),
            "Moderate" => Some(AlertLevel::Moderate),
            "High" => Some(AlertLevel::High),
            "Critical" => Some(AlertLevel::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid threshold config: {reason}")]
pub struct InvalidThresholdConfig {
    pub reason: String,
}

fn invalid(reason: impl Into<String>) -> InvalidThresholdConfig {
    InvalidThresholdConfig { reason: reason.into() }
}

/// Validated alert cut points covering [0, 100] contiguously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    cuts: Vec<CutPoint>,
}

impl AlertThresholds {
    /// Validate raw cut points.
    ///
    /// Requirements: levels appear in ascending order without repeats,
    /// upper bounds strictly increase, the final bound is exactly 100.
    /// A gap or overlap would silently misclassify scores, so any
    /// violation is a hard error.
    pub fn new(cuts: Vec<CutPoint>) -> Result<Self, InvalidThresholdConfig> {
        if cuts.is_empty() {
            return Err(invalid("no cut points configured"));
        }

        let mut prev_upper = 0.0f64;
        let mut prev_level: Option<AlertLevel> = None;
        for cut in &cuts {
            if !(0.0..=100.0).contains(&cut.upper) {
                return Err(invalid(format!(
                    "bound {} for {:?} is outside [0, 100]",
                    cut.upper, cut.level
                )));
            }
            if cut.upper <= prev_upper && prev_level.is_some() {
                return Err(invalid(format!(
                    "bound {} for {:?} does not increase over {}",
                    cut.upper, cut.level, prev_upper
                )));
            }
            if let Some(prev) = prev_level {
                if cut.level <= prev {
                    return Err(invalid(format!(
                        "level {:?} repeats or reorders after {:?}",
                        cut.level, prev
                    )));
                }
            }
            prev_upper = cut.upper;
            prev_level = Some(cut.level);
        }

        let last = cuts.last().map(|c| c.upper).unwrap_or(0.0);
        if last != 100.0 {
            return Err(invalid(format!(
                "cut points must cover [0, 100]; last bound is {last}"
            )));
        }

        Ok(Self { cuts })
    }

    /// Total over [0, 100]: every risk maps to exactly one level.
    /// Bounds are exclusive uppers except 100, which belongs to the
    /// final level.
    pub fn classify(&self, risk: f64) -> AlertLevel {
        for cut in &self.cuts {
            if risk < cut.upper {
                return cut.level;
            }
        }
        // risk == 100 (or anything at/above the final bound)
        self.cuts.last().map(|c| c.level).unwrap_or(AlertLevel::Critical)
    }
}
