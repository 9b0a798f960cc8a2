use crate::forest::TrainedModel;
use crate::risk::AlertThresholds;
use crate::storage::Pool;
use std::sync::Arc;

/// Shared handler state.
///
/// The trained model is read-only after load, so concurrent scoring
/// requests share one `Arc` with no locking. On-demand rescoring only
/// re-runs the scoring path; retraining is a separate CLI operation that
/// produces a new artifact.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub model: Arc<TrainedModel>,
    pub thresholds: AlertThresholds,
}
