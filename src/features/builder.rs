use crate::features::FeatureError;
use crate::model::{CaseRecord, FeatureVector};

/// Incidence rate: cases per 100,000 population.
const PER_100K: f64 = 100_000.0;

/// Validate a raw ingestion row into a `CaseRecord`.
///
/// Upstream feeds carry signed integers, so negative counts and
/// non-positive populations are caught here rather than silently
/// producing a nonsense incidence.
pub fn case_record_from_raw(
    region: &str,
    period: i64,
    cases: i64,
    population: i64,
) -> Result<CaseRecord, FeatureError> {
    if cases < 0 {
        return Err(FeatureError::InvalidRecord {
            region: region.to_string(),
            period,
            field: "cases",
            value: cases,
        });
    }
    if population <= 0 {
        return Err(FeatureError::InvalidRecord {
            region: region.to_string(),
            period,
            field: "population",
            value: population,
        });
    }
    Ok(CaseRecord {
        region: region.to_string(),
        period,
        cases: cases as u64,
        population: population as u64,
    })
}

/// Build feature vectors for one region's series, ordered by period.
///
/// One output per input record, always. Records whose trailing history is
/// incomplete (start of series, or a gap in the period sequence) get
/// explicit `None` markers for the fields that would span the hole --
/// a lag across a gap would silently compare non-adjacent periods.
pub fn build_features(series: &[CaseRecord]) -> Result<Vec<FeatureVector>, FeatureError> {
    let mut out: Vec<FeatureVector> = Vec::with_capacity(series.len());
    // (period, incidence) for up to the two previous records
    let mut prev: Option<(i64, f64)> = None;
    let mut prev2: Option<(i64, f64)> = None;

    for record in series {
        if record.population == 0 {
            return Err(FeatureError::InvalidRecord {
                region: record.region.clone(),
                period: record.period,
                field: "population",
                value: 0,
            });
        }
        if let Some((p, _)) = prev {
            if record.period <= p {
                return Err(FeatureError::OutOfOrder {
                    region: record.region.clone(),
                    period: record.period,
                    previous: p,
                });
            }
        }

        let incidence = record.cases as f64 / record.population as f64 * PER_100K;

        // A lag/MA field is defined only when every period in its trailing
        // window exists: a 2-step lookback over a hole is still a gap.
        let lag1 = prev
            .filter(|(p, _)| *p == record.period - 1)
            .map(|(_, v)| v);
        let lag2 = match (prev, prev2) {
            (Some((p1, _)), Some((p2, v)))
                if p1 == record.period - 1 && p2 == record.period - 2 =>
            {
                Some(v)
            }
            _ => None,
        };
        let ma3 = match (lag1, lag2) {
            (Some(a), Some(b)) => Some((incidence + a + b) / 3.0),
            _ => None,
        };

        out.push(FeatureVector {
            region: record.region.clone(),
            period: record.period,
            incidence,
            lag1,
            lag2,
            ma3,
        });

        prev2 = prev;
        prev = Some((record.period, incidence));
    }

    Ok(out)
}
