use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{build_candles, detect_consolidations};
use crate::config::AnalysisConfig;
use crate::data::Collaborators;
use crate::domain::{Candle, PairId};
use crate::models::ConsolidationReport;

/// Drives the analysis pipeline against the storage collaborators.
///
/// Analysis itself is pure; this type owns the boundary effects: loading rates,
/// persisting trend state and writing consolidation / opportunity records.
pub struct SniperEngine<S: Collaborators> {
    pub(crate) store: Arc<S>,
    pub(crate) config: AnalysisConfig,
}

impl<S: Collaborators> SniperEngine<S> {
    pub fn new(store: Arc<S>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Hourly candles built from the raw rates in `[from, to)`. Buckets ending after
    /// `now` are left out.
    pub async fn load_candles(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let samples = self.store.get_rates_in_range(pair_id, from, to).await?;
        Ok(build_candles(
            &samples,
            &self.config.candles,
            now.timestamp_millis(),
        ))
    }

    /// Window scan on tokio's blocking pool. The scan is CPU-bound and grows with
    /// the square of the lookback.
    pub(crate) async fn scan_consolidations(
        &self,
        candles: Arc<[Candle]>,
    ) -> Result<ConsolidationReport> {
        let settings = self.config.consolidation.clone();
        let swings = self.config.swings.clone();
        let report = tokio::task::spawn_blocking(move || {
            detect_consolidations(&candles, &settings, &swings)
        })
        .await?;
        Ok(report)
    }

    pub(crate) fn pair_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.scheduler.pair_timeout_secs)
    }
}

/// Counters for one pass over the active pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub pairs_processed: usize,
    pub pairs_failed: usize,
    pub pairs_skipped: usize,
    pub trending: usize,
    pub consolidations_created: usize,
    pub opportunities_created: usize,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} failed, {} skipped, {} trending, {} consolidations, {} opportunities",
            self.pairs_processed,
            self.pairs_failed,
            self.pairs_skipped,
            self.trending,
            self.consolidations_created,
            self.opportunities_created
        )
    }
}
