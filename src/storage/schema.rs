//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS case_records (
            id INTEGER PRIMARY KEY,
            region TEXT NOT NULL,
            period INTEGER NOT NULL,
            cases INTEGER NOT NULL,
            population INTEGER NOT NULL,
            imported_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (region, period)
        );

        CREATE TABLE IF NOT EXISTS assessments (
            id INTEGER PRIMARY KEY,
            region TEXT NOT NULL,
            period INTEGER NOT NULL,
            risk_score REAL NOT NULL,
            alert_level TEXT NOT NULL,
            recommendation_key TEXT NOT NULL,
            scored_at TEXT NOT NULL,
            UNIQUE (region, period)
        );

        CREATE INDEX IF NOT EXISTS idx_assessments_risk
            ON assessments (risk_score DESC);
        CREATE INDEX IF NOT EXISTS idx_case_records_region
            ON case_records (region, period);",
    )?;
    Ok(())
}
