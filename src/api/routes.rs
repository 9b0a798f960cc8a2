//! API route definitions.

use crate::api::state::AppState;
use crate::model::{FeatureVector, ScoreOutcome};
use crate::risk::engine::score_vector;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/score", post(score))
        .route("/assessments", get(list_assessments))
        .route("/regions/{region}/trend", get(region_trend))
}

type ApiError = (StatusCode, Json<Value>);

fn internal_error(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

fn envelope(data: Value, meta: Value) -> Json<Value> {
    Json(json!({ "data": data, "meta": meta }))
}

async fn health() -> Json<Value> {
    envelope(
        json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }),
        json!({ "timestamp": chrono::Utc::now().to_rfc3339() }),
    )
}

/// One row of the on-demand rescoring payload: the four feature values
/// for a (region, period). Missing lags come through as null and yield a
/// not-scorable outcome for that row -- never a fabricated low score.
#[derive(Debug, Deserialize)]
struct ScoreRow {
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    period: Option<i64>,
    cases_per_100k: f64,
    lag_cases_1: Option<f64>,
    lag_cases_2: Option<f64>,
    ma3_cases: Option<f64>,
}

/// Rescore feature rows against the loaded model. Scoring only; the
/// model is never retrained here.
async fn score(
    State(state): State<AppState>,
    Json(rows): Json<Vec<ScoreRow>>,
) -> Json<Value> {
    let outcomes: Vec<ScoreOutcome> = rows
        .iter()
        .map(|row| {
            let vector = FeatureVector {
                region: row.region.clone().unwrap_or_else(|| "-".into()),
                period: row.period.unwrap_or(0),
                incidence: row.cases_per_100k,
                lag1: row.lag_cases_1,
                lag2: row.lag_cases_2,
                ma3: row.ma3_cases,
            };
            score_vector(&state.model, &state.thresholds, &vector)
        })
        .collect();

    let scored = outcomes.iter().filter(|o| o.assessment().is_some()).count();
    envelope(
        json!(outcomes),
        json!({ "total": outcomes.len(), "scored": scored }),
    )
}

#[derive(Debug, Deserialize)]
struct AssessmentFilter {
    /// Risk floor; defaults to 0 (everything).
    #[serde(default)]
    min_risk: f64,
}

async fn list_assessments(
    State(state): State<AppState>,
    Query(filter): Query<AssessmentFilter>,
) -> Result<Json<Value>, ApiError> {
    let pool = state.pool.clone();
    let assessments = tokio::task::spawn_blocking(move || {
        crate::storage::load_assessments(&pool, filter.min_risk)
    })
    .await
    .map_err(|e| internal_error(e.into()))?
    .map_err(internal_error)?;

    let total = assessments.len();
    Ok(envelope(json!(assessments), json!({ "total": total })))
}

async fn region_trend(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = state.pool.clone();
    let key = region.clone();
    let trend =
        tokio::task::spawn_blocking(move || crate::storage::load_region_trend(&pool, &key))
            .await
            .map_err(|e| internal_error(e.into()))?
            .map_err(internal_error)?;

    let total = trend.len();
    Ok(envelope(
        json!(trend),
        json!({ "region": region, "total": total }),
    ))
}
