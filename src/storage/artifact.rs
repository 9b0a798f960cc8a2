//! Trained-model artifact persistence.
//!
//! The artifact is plain JSON: the forest structure, fitted bounds, and
//! seed round-trip losslessly, so a reloaded model scores bit-for-bit the
//! same as the one that was saved. Writes go through a temp file + rename
//! so a failed training run can never leave a half-written artifact where
//! a deployed model used to be.

use crate::forest::TrainedModel;
use anyhow::{Context, Result};
use std::path::Path;

/// Serialize a trained model to `path`.
pub fn save_model(path: &str, model: &TrainedModel) -> Result<()> {
    let json = serde_json::to_vec(model).context("serializing trained model")?;

    let tmp = Path::new(path).with_extension("tmp");
    std::fs::write(&tmp, &json)
        .with_context(|| format!("writing model artifact {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing model artifact {path}"))?;

    tracing::info!(path, bytes = json.len(), "Model artifact saved");
    Ok(())
}

/// Load a trained model from `path`. The result is read-only; scoring
/// never mutates it.
pub fn load_model(path: &str) -> Result<TrainedModel> {
    let raw = std::fs::read(path).with_context(|| format!("reading model artifact {path}"))?;
    let model: TrainedModel =
        serde_json::from_slice(&raw).with_context(|| format!("parsing model artifact {path}"))?;
    tracing::info!(
        path,
        seed = model.seed,
        trees = model.forest.tree_count(),
        "Model artifact loaded"
    );
    Ok(model)
}
