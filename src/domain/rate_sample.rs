use serde::{Deserialize, Serialize};

/// A single raw exchange-rate observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub timestamp_ms: i64,
    pub rate: f64,
}

impl RateSample {
    pub fn new(timestamp_ms: i64, rate: f64) -> Self {
        Self { timestamp_ms, rate }
    }
}
