//! Pipeline orchestration: training runs and scoring runs.
//!
//! Training is an explicit one-shot batch over the full corpus; scoring
//! re-runs freely against the resulting read-only artifact and never
//! triggers retraining.

use crate::config::RiskConfig;
use crate::features::build_features;
use crate::forest::{IsolationForest, TrainedModel};
use crate::model::{CaseRecord, FeatureVector, RiskAssessment, ScoreOutcome};
use crate::risk::alert::AlertThresholds;
use crate::risk::scorer::ScoreBounds;
use crate::risk::AlertLevel;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Group a flat record set by region, preserving per-region period order.
pub fn group_by_region(records: Vec<CaseRecord>) -> BTreeMap<String, Vec<CaseRecord>> {
    let mut by_region: BTreeMap<String, Vec<CaseRecord>> = BTreeMap::new();
    for record in records {
        by_region.entry(record.region.clone()).or_default().push(record);
    }
    for series in by_region.values_mut() {
        series.sort_by_key(|r| r.period);
    }
    by_region
}

/// Build feature vectors for every region in the corpus.
pub fn build_corpus(
    series_by_region: &BTreeMap<String, Vec<CaseRecord>>,
) -> Result<Vec<FeatureVector>> {
    let mut corpus = Vec::new();
    for series in series_by_region.values() {
        corpus.extend(build_features(series)?);
    }
    Ok(corpus)
}

/// Fit the forest and the normalization bounds in one pass.
///
/// Rows with missing lag/MA fields are excluded from training, never
/// imputed. The returned artifact is immutable; replacing a deployed
/// model is the caller's explicit decision after this succeeds.
pub fn train_model(
    series_by_region: &BTreeMap<String, Vec<CaseRecord>>,
    config: &RiskConfig,
) -> Result<TrainedModel> {
    let corpus = build_corpus(series_by_region)?;
    let dense: Vec<[f64; 4]> = corpus.iter().filter_map(|fv| fv.dense()).collect();

    info!(
        regions = series_by_region.len(),
        rows = corpus.len(),
        usable = dense.len(),
        "Training isolation forest"
    );

    let forest = IsolationForest::train(&dense, config)?;
    let raw_scores: Vec<f64> = dense.iter().map(|p| forest.raw_score(p)).collect();
    let bounds = ScoreBounds::fit(&raw_scores, config.clip_percentile);

    info!(
        trees = forest.tree_count(),
        raw_min = bounds.min(),
        raw_max = bounds.max(),
        "Training complete"
    );

    Ok(TrainedModel {
        forest,
        bounds,
        seed: config.random_seed,
        training_rows: dense.len(),
        trained_at: chrono::Utc::now(),
    })
}

/// Score one feature vector against a trained model.
///
/// Incomplete vectors come back as an explicit not-scorable marker;
/// reporting "no score" is the caller's job, defaulting to low risk is
/// nobody's.
pub fn score_vector(
    model: &TrainedModel,
    thresholds: &AlertThresholds,
    vector: &FeatureVector,
) -> ScoreOutcome {
    if let Some(field) = vector.missing_field() {
        return ScoreOutcome::NotScorable {
            region: vector.region.clone(),
            period: vector.period,
            reason: format!("insufficient history: {field} undefined"),
        };
    }

    // dense() is Some here, so risk_score cannot fail
    let risk = match model.risk_score(vector) {
        Ok(r) => r,
        Err(e) => {
            return ScoreOutcome::NotScorable {
                region: vector.region.clone(),
                period: vector.period,
                reason: e.to_string(),
            }
        }
    };

    let level = thresholds.classify(risk);
    if level >= AlertLevel::High {
        warn!(
            region = %vector.region,
            period = vector.period,
            risk,
            level = level.as_str(),
            "Elevated outbreak risk"
        );
    }

    ScoreOutcome::Scored(RiskAssessment {
        region: vector.region.clone(),
        period: vector.period,
        risk_score: risk,
        alert_level: level,
        recommendation_key: level.recommendation_key().to_string(),
    })
}

/// Run the full scoring path over every region and period.
pub fn score_all(
    model: &TrainedModel,
    thresholds: &AlertThresholds,
    series_by_region: &BTreeMap<String, Vec<CaseRecord>>,
) -> Result<Vec<ScoreOutcome>> {
    let mut outcomes = Vec::new();
    for series in series_by_region.values() {
        for vector in build_features(series)? {
            outcomes.push(score_vector(model, thresholds, &vector));
        }
    }

    let scored = outcomes.iter().filter(|o| o.assessment().is_some()).count();
    info!(
        total = outcomes.len(),
        scored,
        unscorable = outcomes.len() - scored,
        "Scoring run complete"
    );
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, period: i64, cases: u64) -> CaseRecord {
        CaseRecord {
            region: region.into(),
            period,
            cases,
            population: 1_000_000,
        }
    }

    fn thresholds(config: &RiskConfig) -> AlertThresholds {
        AlertThresholds::new(config.alert_cut_points.clone()).unwrap()
    }

    /// Several regions with steady incidence around 10/100k.
    fn steady_corpus() -> BTreeMap<String, Vec<CaseRecord>> {
        let mut records = Vec::new();
        for (r, region) in ["BRA", "COL", "MEX", "PER"].iter().enumerate() {
            for period in 2000..2015 {
                let wobble = ((period + r as i64) % 5) as u64 * 4;
                records.push(record(region, period, 95 + wobble));
            }
        }
        group_by_region(records)
    }

    #[test]
    fn test_group_by_region_sorts_periods() {
        let grouped = group_by_region(vec![
            record("BRA", 2012, 5),
            record("BRA", 2010, 5),
            record("COL", 2011, 5),
        ]);
        assert_eq!(grouped["BRA"][0].period, 2010);
        assert_eq!(grouped["COL"].len(), 1);
    }

    #[test]
    fn test_spike_scores_highest_and_alerts() {
        let mut corpus = steady_corpus();
        // Steady region, then a 10x spike in the final period
        let mut series: Vec<_> = (2000..2011).map(|p| record("VEN", p, 100)).collect();
        series.push(record("VEN", 2011, 1000));
        corpus.insert("VEN".into(), series);

        let config = RiskConfig {
            ensemble_size: 100,
            min_training_rows: 20,
            ..RiskConfig::default()
        };
        let model = train_model(&corpus, &config).unwrap();
        let outcomes = score_all(&model, &thresholds(&config), &corpus).unwrap();

        let ven: Vec<&RiskAssessment> = outcomes
            .iter()
            .filter_map(|o| o.assessment())
            .filter(|a| a.region == "VEN")
            .collect();

        let spike = ven.iter().find(|a| a.period == 2011).unwrap();
        for prior in ven.iter().filter(|a| a.period < 2011) {
            assert!(
                spike.risk_score > prior.risk_score,
                "spike {:.2} not above period {} ({:.2})",
                spike.risk_score,
                prior.period,
                prior.risk_score
            );
        }
        assert!(spike.alert_level > AlertLevel::Low);
    }

    #[test]
    fn test_warmup_periods_not_scorable() {
        let corpus = steady_corpus();
        let config = RiskConfig {
            ensemble_size: 50,
            min_training_rows: 20,
            ..RiskConfig::default()
        };
        let model = train_model(&corpus, &config).unwrap();
        let outcomes = score_all(&model, &thresholds(&config), &corpus).unwrap();

        // First two periods of each region lack full history
        let unscorable: Vec<_> = outcomes
            .iter()
            .filter(|o| o.assessment().is_none())
            .collect();
        assert_eq!(unscorable.len(), 2 * 4);
        match unscorable[0] {
            ScoreOutcome::NotScorable { reason, .. } => {
                assert!(reason.contains("insufficient history"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_training_twice_same_seed_agrees() {
        let corpus = steady_corpus();
        let config = RiskConfig {
            ensemble_size: 50,
            min_training_rows: 20,
            ..RiskConfig::default()
        };
        let a = train_model(&corpus, &config).unwrap();
        let b = train_model(&corpus, &config).unwrap();

        let held_out = FeatureVector {
            region: "HND".into(),
            period: 2020,
            incidence: 17.0,
            lag1: Some(9.5),
            lag2: Some(10.5),
            ma3: Some(12.3),
        };
        let ra = a.risk_score(&held_out).unwrap();
        let rb = b.risk_score(&held_out).unwrap();
        assert!((ra - rb).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_corpus_fails_training() {
        let corpus = group_by_region((2000..2006).map(|p| record("BRA", p, 100)).collect());
        let config = RiskConfig::default(); // min_training_rows = 30
        let err = train_model(&corpus, &config).unwrap_err();
        assert!(err.to_string().contains("insufficient training data"));
    }
}
