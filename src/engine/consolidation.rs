use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::timeout;

use crate::config::AnalysisConfig;
use crate::config::PriceLike;
use crate::data::Collaborators;
use crate::domain::{CurrencyPair, PairId};
use crate::models::{
    Consolidation, ConsolidationCandidate, ConsolidationReport, Opportunity, SignalType, Strategy,
    TrendDirection, trade_levels,
};
use crate::utils::{TimeUtils, ms_to_datetime};

use super::{CycleSummary, SniperEngine};

/// A consolidation about to be written, with the opportunity it spawns if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRecord {
    pub consolidation: Consolidation,
    pub opportunity: Option<Opportunity>,
}

/// Records produced for one pair in one pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairConsolidations {
    pub report: ConsolidationReport,
    pub consolidations: Vec<Consolidation>,
    pub opportunities: Vec<Opportunity>,
}

fn to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    ms_to_datetime(ms).ok_or_else(|| anyhow::anyhow!("Candle timestamp {} out of range", ms))
}

pub fn consolidation_from_candidate(
    pair_id: PairId,
    candidate: &ConsolidationCandidate,
    trend: Option<TrendDirection>,
    now: DateTime<Utc>,
) -> Result<Consolidation> {
    Ok(Consolidation {
        id: None,
        pair_id,
        trend_direction: trend,
        start_time: to_datetime(candidate.start_ms)?,
        end_time: to_datetime(candidate.end_ms)?,
        resistance: candidate.resistance,
        support: candidate.support,
        broken_at: Some(to_datetime(candidate.breakout_ms)?),
        breakout_direction: Some(candidate.breakout_direction),
        breakout_matches_trend: trend == Some(candidate.breakout_direction),
        created_at: now,
    })
}

pub fn opportunity_from_candidate(
    pair_id: PairId,
    strategy: &Strategy,
    candidate: &ConsolidationCandidate,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> Opportunity {
    let direction = candidate.breakout_direction;
    let (entry_price, stop_loss, take_profit) =
        trade_levels(direction, candidate.support, candidate.resistance, &config.trade);
    Opportunity {
        id: None,
        pair_id,
        strategy_id: strategy.id,
        consolidation_id: None,
        signal: SignalType::from(direction),
        entry_price,
        stop_loss,
        take_profit,
        created_at: now,
        outcome: None,
    }
}

/// Turns candidates into records.
///
/// A candidate whose breakout falls inside a known consolidation (`existing`, or one
/// planned earlier in this call) widened by the configured tolerance is skipped. An
/// opportunity is attached only when the breakout agrees with `trend` and `strategy`
/// is active.
pub fn plan_records(
    pair_id: PairId,
    candidates: &[ConsolidationCandidate],
    trend: Option<TrendDirection>,
    existing: &[Consolidation],
    strategy: Option<&Strategy>,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> Result<Vec<PlannedRecord>> {
    let tolerance = config.consolidation.existing_match_tolerance_ms;
    let mut known: Vec<Consolidation> = existing.to_vec();
    let mut planned = Vec::new();

    for candidate in candidates {
        if known.iter().any(|c| c.covers(candidate.breakout_ms, tolerance)) {
            log::debug!(
                "Pair {}: breakout at {} already recorded",
                pair_id,
                crate::utils::epoch_ms_to_utc(candidate.breakout_ms)
            );
            continue;
        }

        let consolidation = consolidation_from_candidate(pair_id, candidate, trend, now)?;
        let opportunity = match strategy {
            Some(s) if s.active && consolidation.breakout_matches_trend => Some(
                opportunity_from_candidate(pair_id, s, candidate, config, now),
            ),
            _ => None,
        };

        known.push(consolidation.clone());
        planned.push(PlannedRecord {
            consolidation,
            opportunity,
        });
    }

    Ok(planned)
}

impl<S: Collaborators> SniperEngine<S> {
    /// Scans the last `lookback_hours` of a trending pair and stores new records.
    /// Pairs that are not trending are left alone.
    pub async fn process_pair_consolidations(
        &self,
        pair: &CurrencyPair,
        now: DateTime<Utc>,
    ) -> Result<PairConsolidations> {
        let Some(trend) = pair.trend_state.trending_direction() else {
            return Ok(PairConsolidations::default());
        };

        let settings = &self.config.consolidation;
        let start = now - TimeUtils::hours(settings.lookback_hours);
        let candles = self.load_candles(pair.id, start, now, now).await?;
        let report = self.scan_consolidations(candles.into()).await?;

        if report.candidates.is_empty() {
            return Ok(PairConsolidations {
                report,
                ..Default::default()
            });
        }

        let existing = self.store.find_consolidations_by_pair(pair.id).await?;
        let strategy = self
            .store
            .find_strategy_by_name(&self.config.trade.strategy_name)
            .await?;
        if strategy.as_ref().is_none_or(|s| !s.active) {
            log::debug!("Strategy '{}' missing or inactive", self.config.trade.strategy_name);
        }

        let plan = plan_records(
            pair.id,
            &report.candidates,
            Some(trend),
            &existing,
            strategy.as_ref(),
            &self.config,
            now,
        )?;

        let mut out = PairConsolidations {
            report,
            ..Default::default()
        };
        for record in plan {
            let (stored, opportunity) = self
                .store
                .create_consolidation_with_opportunity(record.consolidation, record.opportunity)
                .await?;
            log::info!(
                "{}: consolidation {:.5}-{:.5} broke {:?} (trend {})",
                pair,
                stored.support.value(),
                stored.resistance.value(),
                stored.breakout_direction,
                trend
            );

            out.opportunities.extend(opportunity);
            out.consolidations.push(stored);
        }

        Ok(out)
    }

    /// One consolidation pass over every active pair, reading the trend state stored
    /// by the latest trend cycle.
    pub async fn run_consolidation_cycle(&self, now: DateTime<Utc>) -> Result<CycleSummary> {
        let pairs = self.store.get_active_pairs().await?;
        let mut summary = CycleSummary::default();

        for pair in &pairs {
            if !pair.trend_state.is_trending {
                summary.pairs_skipped += 1;
                continue;
            }
            summary.trending += 1;

            match timeout(self.pair_timeout(), self.process_pair_consolidations(pair, now)).await {
                Ok(Ok(result)) => {
                    summary.pairs_processed += 1;
                    summary.consolidations_created += result.consolidations.len();
                    summary.opportunities_created += result.opportunities.len();
                }
                Ok(Err(e)) => {
                    summary.pairs_failed += 1;
                    log::error!("{}: consolidation scan failed: {:#}", pair, e);
                }
                Err(_) => {
                    summary.pairs_failed += 1;
                    log::warn!("{}: consolidation scan timed out", pair);
                }
            }
        }

        log::info!("Consolidation cycle: {}", summary);
        Ok(summary)
    }

    /// Trend pass followed by a consolidation pass, so every pair's state is fresh
    /// before it is read.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<(CycleSummary, CycleSummary)> {
        let trend = self.run_trend_cycle(now).await?;
        let consolidation = self.run_consolidation_cycle(now).await?;
        Ok((trend, consolidation))
    }
}
