//! Risk normalization, alert thresholding, and the scoring engine.

pub mod alert;
pub mod engine;
pub mod scorer;

pub use alert::{AlertLevel, AlertThresholds, InvalidThresholdConfig};
pub use scorer::ScoreBounds;
