use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::timeout;

use crate::analysis::{classify_trend, trend_window};
use crate::data::Collaborators;
use crate::domain::{Candle, CurrencyPair, PairId};
use crate::models::TrendCheck;
use crate::utils::TimeUtils;

use super::{CycleSummary, SniperEngine};

impl<S: Collaborators> SniperEngine<S> {
    /// Candles for the trend check, widening the start of the window by
    /// `fetch_extension_hours` up to `max_fetch_attempts` times while short.
    pub async fn fetch_trend_candles(&self, pair_id: PairId, now: DateTime<Utc>) -> Result<Vec<Candle>> {
        let settings = &self.config.trend;
        let (mut start, end) = trend_window(now, settings);

        let mut candles = self.load_candles(pair_id, start, end, end).await?;
        let mut attempt = 0;
        while candles.len() < settings.required_candles && attempt < settings.max_fetch_attempts {
            attempt += 1;
            start -= TimeUtils::hours(settings.fetch_extension_hours);
            log::debug!(
                "Pair {}: {} of {} trend candles, widening window (attempt {})",
                pair_id,
                candles.len(),
                settings.required_candles,
                attempt
            );
            candles = self.load_candles(pair_id, start, end, end).await?;
        }
        Ok(candles)
    }

    /// Classifies the pair without touching storage.
    pub async fn check_trend(&self, pair_id: PairId, now: DateTime<Utc>) -> Result<TrendCheck> {
        let candles = self.fetch_trend_candles(pair_id, now).await?;
        Ok(classify_trend(&candles, &self.config.trend))
    }

    /// Classifies the pair and overwrites its stored trend state.
    /// Insufficient data leaves the stored state untouched.
    pub async fn update_pair_trend(&self, pair: &CurrencyPair, now: DateTime<Utc>) -> Result<TrendCheck> {
        let check = self.check_trend(pair.id, now).await?;
        match &check {
            TrendCheck::Classified(verdict) => {
                self.store
                    .update_trend_state(pair.id, &verdict.to_state(now))
                    .await?;
                log::info!(
                    "{}: trending={} direction={:?} adx={:?}",
                    pair,
                    verdict.is_trending,
                    verdict.direction,
                    verdict.adx
                );
            }
            TrendCheck::InsufficientData(shortfall) => {
                log::warn!("{}: trend check skipped. {}", pair, shortfall);
            }
        }
        Ok(check)
    }

    /// One trend pass over every active pair. A failing pair is logged and skipped.
    pub async fn run_trend_cycle(&self, now: DateTime<Utc>) -> Result<CycleSummary> {
        let pairs = self.store.get_active_pairs().await?;
        let mut summary = CycleSummary::default();

        for pair in &pairs {
            match timeout(self.pair_timeout(), self.update_pair_trend(pair, now)).await {
                Ok(Ok(TrendCheck::Classified(verdict))) => {
                    summary.pairs_processed += 1;
                    if verdict.is_trending {
                        summary.trending += 1;
                    }
                }
                Ok(Ok(TrendCheck::InsufficientData(_))) => summary.pairs_skipped += 1,
                Ok(Err(e)) => {
                    summary.pairs_failed += 1;
                    log::error!("{}: trend check failed: {:#}", pair, e);
                }
                Err(_) => {
                    summary.pairs_failed += 1;
                    log::warn!("{}: trend check timed out", pair);
                }
            }
        }

        log::info!("Trend cycle: {}", summary);
        Ok(summary)
    }
}
