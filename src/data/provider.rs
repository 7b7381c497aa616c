use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{PairId, RateSample};

/// Abstract interface for fetching raw exchange-rate history.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Samples for a pair with `from <= timestamp < to`, oldest first.
    async fn get_rates_in_range(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RateSample>>;
}
