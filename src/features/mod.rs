//! Temporal feature construction from raw case series.

mod builder;

pub use builder::{build_features, case_record_from_raw};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("invalid record for {region} period {period}: {field} = {value}")]
    InvalidRecord {
        region: String,
        period: i64,
        field: &'static str,
        value: i64,
    },

    #[error("series for {region} is not ordered: period {period} follows {previous}")]
    OutOfOrder {
        region: String,
        period: i64,
        previous: i64,
    },
}
