//! Episcope -- outbreak risk scoring for mosquito-borne disease surveillance.
//!
//! This crate provides the core scoring pipeline: temporal feature
//! construction from case/population series, an isolation-forest anomaly
//! model, risk normalization, and alert thresholding, plus the storage
//! and API plumbing around it.

pub mod api;
pub mod config;
pub mod features;
pub mod forest;
pub mod model;
pub mod risk;
pub mod storage;

use anyhow::{Context, Result};

/// Start the episcope daemon: load the trained artifact read-only and
/// serve the scoring API against it.
pub async fn serve(bind: &str, db_path: &str, model_path: &str, config: &config::RiskConfig) -> Result<()> {
    tracing::info!(%db_path, "Initializing database");
    let pool = storage::open_pool(db_path)?;

    let model = storage::artifact::load_model(model_path)?;
    let thresholds = risk::AlertThresholds::new(config.alert_cut_points.clone())
        .context("validating alert cut points")?;

    let state = api::state::AppState {
        pool,
        model: std::sync::Arc::new(model),
        thresholds,
    };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, "Episcope listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
