//! SQLite storage layer -- schema, queries, model artifact I/O.

pub mod artifact;
pub mod schema;

use crate::model::{CaseRecord, RiskAssessment};
use crate::risk::AlertLevel;
use anyhow::Result;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

/// Connection pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Insert or replace surveillance records. (region, period) is the key,
/// so re-importing a corrected feed is idempotent.
pub fn upsert_case_records(pool: &Pool, records: &[CaseRecord]) -> Result<usize> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    for r in records {
        tx.execute(
            "INSERT INTO case_records (region, period, cases, population)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(region, period) DO UPDATE SET
                 cases = excluded.cases,
                 population = excluded.population",
            params![r.region, r.period, r.cases as i64, r.population as i64],
        )?;
    }
    tx.commit()?;
    Ok(records.len())
}

/// Load the full surveillance corpus, ordered by region then period.
pub fn load_case_records(pool: &Pool) -> Result<Vec<CaseRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT region, period, cases, population FROM case_records
         ORDER BY region, period",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(CaseRecord {
            region: row.get(0)?,
            period: row.get(1)?,
            cases: row.get::<_, i64>(2)? as u64,
            population: row.get::<_, i64>(3)? as u64,
        })
    })?;

    let mut records = Vec::new();
    for r in rows {
        records.push(r?);
    }
    Ok(records)
}

/// Persist a scoring run's assessments. Replaces any previous assessment
/// for the same (region, period).
pub fn save_assessments(pool: &Pool, assessments: &[RiskAssessment]) -> Result<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let scored_at = chrono::Utc::now().to_rfc3339();
    for a in assessments {
        tx.execute(
            "INSERT INTO assessments
                 (region, period, risk_score, alert_level, recommendation_key, scored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(region, period) DO UPDATE SET
                 risk_score = excluded.risk_score,
                 alert_level = excluded.alert_level,
                 recommendation_key = excluded.recommendation_key,
                 scored_at = excluded.scored_at",
            params![
                a.region,
                a.period,
                a.risk_score,
                a.alert_level.as_str(),
                a.recommendation_key,
                scored_at
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn assessment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RiskAssessment> {
    let level_str: String = row.get(3)?;
    // A level we can't parse must surface as an error, not read as Low
    let alert_level = AlertLevel::parse(&level_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown alert level: {level_str}").into(),
        )
    })?;
    Ok(RiskAssessment {
        region: row.get(0)?,
        period: row.get(1)?,
        risk_score: row.get(2)?,
        alert_level,
        recommendation_key: row.get(4)?,
    })
}

/// Assessments at or above a risk floor, highest risk first.
pub fn load_assessments(pool: &Pool, min_risk: f64) -> Result<Vec<RiskAssessment>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT region, period, risk_score, alert_level, recommendation_key
         FROM assessments
         WHERE risk_score >= ?1
         ORDER BY risk_score DESC, region, period",
    )?;

    let rows = stmt.query_map(params![min_risk], assessment_from_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Risk history for one region, oldest period first.
pub fn load_region_trend(pool: &Pool, region: &str) -> Result<Vec<RiskAssessment>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT region, period, risk_score, alert_level, recommendation_key
         FROM assessments
         WHERE region = ?1
         ORDER BY period",
    )?;

    let rows = stmt.query_map(params![region], assessment_from_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_pool() -> (tempfile::TempDir, Pool) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_case_record_round_trip_and_upsert() {
        let (_dir, pool) = test_pool();
        let records = vec![
            CaseRecord { region: "BRA".into(), period: 2019, cases: 120, population: 2_000_000 },
            CaseRecord { region: "BRA".into(), period: 2020, cases: 180, population: 2_000_000 },
        ];
        upsert_case_records(&pool, &records).unwrap();

        // Corrected re-import overwrites in place
        let corrected = vec![CaseRecord {
            region: "BRA".into(),
            period: 2020,
            cases: 200,
            population: 2_000_000,
        }];
        upsert_case_records(&pool, &corrected).unwrap();

        let loaded = load_case_records(&pool).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].cases, 200);
    }

    #[test]
    fn test_assessments_filter_and_trend() {
        let (_dir, pool) = test_pool();
        let mk = |region: &str, period: i64, risk: f64, level: AlertLevel| RiskAssessment {
            region: region.into(),
            period,
            risk_score: risk,
            alert_level: level,
            recommendation_key: level.recommendation_key().into(),
        };
        save_assessments(
            &pool,
            &[
                mk("BRA", 2019, 20.0, AlertLevel::Low),
                mk("BRA", 2020, 90.0, AlertLevel::Critical),
                mk("COL", 2020, 55.0, AlertLevel::Moderate),
            ],
        )
        .unwrap();

        let alerts = load_assessments(&pool, 50.0).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].region, "BRA"); // highest risk first
        assert_eq!(alerts[0].risk_score, 90.0);

        let trend = load_region_trend(&pool, "BRA").unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].period, 2019);
    }
}
