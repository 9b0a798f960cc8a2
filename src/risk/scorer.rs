//! Raw anomaly score -> bounded risk score.

use serde::{Deserialize, Serialize};

/// Normalization bounds fitted on the training corpus's raw scores.
///
/// Fitted once at training time and stored in the artifact, so the same
/// raw score always maps to the same risk no matter when it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBounds {
    min: f64,
    max: f64,
}

impl ScoreBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Fit bounds from raw training scores, clipping `clip_percentile`
    /// off each tail so a single extreme score cannot compress the whole
    /// scale.
    pub fn fit(raw_scores: &[f64], clip_percentile: f64) -> Self {
        if raw_scores.is_empty() {
            return Self { min: 0.0, max: 0.0 };
        }
        let mut sorted = raw_scores.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let p = clip_percentile.clamp(0.0, 0.5);
        Self {
            min: quantile(&sorted, p),
            max: quantile(&sorted, 1.0 - p),
        }
    }

    /// Clamp to the fitted bounds, then rescale linearly to [0, 100].
    ///
    /// Monotonic by construction. Degenerate bounds (zero variance in the
    /// training scores) map everything to the midpoint instead of
    /// dividing by zero.
    pub fn normalize(&self, raw: f64) -> f64 {
        if self.max <= self.min {
            return 50.0;
        }
        let clamped = raw.clamp(self.min, self.max);
        (clamped - self.min) / (self.max - self.min) * 100.0
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Linear-interpolation quantile over an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_monotonic() {
        let bounds = ScoreBounds::new(0.2, 0.8);
        let raws = [-1.0, 0.0, 0.2, 0.35, 0.5, 0.79, 0.8, 2.0];
        let risks: Vec<f64> = raws.iter().map(|&r| bounds.normalize(r)).collect();
        for w in risks.windows(2) {
            assert!(w[0] <= w[1], "normalize not monotonic: {risks:?}");
        }
        assert_eq!(risks[0], 0.0);
        assert_eq!(*risks.last().unwrap(), 100.0);
    }

    #[test]
    fn test_degenerate_bounds_map_to_midpoint() {
        let bounds = ScoreBounds::new(5.0, 5.0);
        assert_eq!(bounds.normalize(5.0), 50.0);
        assert_eq!(bounds.normalize(0.0), 50.0);
        assert_eq!(bounds.normalize(1e9), 50.0);
    }

    #[test]
    fn test_fit_without_clip_spans_min_max() {
        let scores = [0.1, 0.5, 0.3, 0.9, 0.2];
        let bounds = ScoreBounds::fit(&scores, 0.0);
        assert_eq!(bounds.min(), 0.1);
        assert_eq!(bounds.max(), 0.9);
        assert_eq!(bounds.normalize(0.1), 0.0);
        assert_eq!(bounds.normalize(0.9), 100.0);
    }

    #[test]
    fn test_clip_resists_outlier_distortion() {
        // 100 scores near 0.4, one wild outlier at 10.0
        let mut scores: Vec<f64> = (0..100).map(|i| 0.35 + (i % 10) as f64 * 0.01).collect();
        scores.push(10.0);
        let clipped = ScoreBounds::fit(&scores, 0.05);
        let unclipped = ScoreBounds::fit(&scores, 0.0);
        assert!(clipped.max() < 1.0, "clip should discard the outlier tail");
        assert_eq!(unclipped.max(), 10.0);
    }

    #[test]
    fn test_values_stay_in_range() {
        let bounds = ScoreBounds::fit(&[0.3, 0.4, 0.5, 0.6], 0.0);
        for raw in [-100.0, 0.0, 0.45, 0.6, 100.0] {
            let risk = bounds.normalize(raw);
            assert!((0.0..=100.0).contains(&risk));
        }
    }
}
