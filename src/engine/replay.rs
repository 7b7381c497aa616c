//! Side-effect free re-runs of the pipeline over a historical range.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::classify_trend;
use crate::data::Collaborators;
use crate::domain::{Candle, PairId};
use crate::models::{Consolidation, ConsolidationReport, Opportunity, TrendCheck};

use super::{SniperEngine, consolidation::plan_records};

/// Either a result or the reason there is none.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> From<Result<T>> for ReplayOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self {
                result: Some(value),
                error: None,
            },
            Err(e) => Self {
                result: None,
                error: Some(format!("{:#}", e)),
            },
        }
    }
}

impl<T> ReplayOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReplay {
    pub trend: TrendCheck,
    pub report: ConsolidationReport,
    pub consolidations: Vec<Consolidation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullFlowReplay {
    pub trend: TrendCheck,
    pub report: Option<ConsolidationReport>,
    pub consolidations: Vec<Consolidation>,
    pub opportunities: Vec<Opportunity>,
}

impl<S: Collaborators> SniperEngine<S> {
    async fn replay_candles(&self, pair_id: PairId, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Arc<[Candle]>> {
        if to <= from {
            anyhow::bail!("Empty replay range: {} is not before {}", from, to);
        }
        if self.store.get_pair(pair_id).await?.is_none() {
            anyhow::bail!("Unknown pair {}", pair_id);
        }
        Ok(self.load_candles(pair_id, from, to, to).await?.into())
    }

    /// Trend verdict over the candles in `[from, to)`.
    pub async fn replay_trend(&self, pair_id: PairId, from: DateTime<Utc>, to: DateTime<Utc>) -> ReplayOutcome<TrendCheck> {
        self.trend_over_range(pair_id, from, to).await.into()
    }

    /// Consolidations detected in `[from, to)`, regardless of trend and of records
    /// already in storage. The trend over the range is still reported and stamped on
    /// each consolidation.
    pub async fn replay_consolidation(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ReplayOutcome<ConsolidationReplay> {
        self.consolidations_over_range(pair_id, from, to).await.into()
    }

    /// Trend, consolidations and opportunities for `[from, to)` as the periodic cycles
    /// would produce them, without writing anything. Consolidations are only searched
    /// when the range classifies as trending. Each opportunity's outcome is replayed
    /// over the candles after its breakout.
    pub async fn replay_full_flow(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ReplayOutcome<FullFlowReplay> {
        self.full_flow_over_range(pair_id, from, to).await.into()
    }

    async fn trend_over_range(&self, pair_id: PairId, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<TrendCheck> {
        let candles = self.replay_candles(pair_id, from, to).await?;
        Ok(classify_trend(&candles, &self.config.trend))
    }

    async fn consolidations_over_range(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ConsolidationReplay> {
        let candles = self.replay_candles(pair_id, from, to).await?;
        let trend = classify_trend(&candles, &self.config.trend);
        let direction = trend.verdict().and_then(|v| v.direction);
        let report = self.scan_consolidations(candles).await?;

        let consolidations = plan_records(pair_id, &report.candidates, direction, &[], None, &self.config, to)?
            .into_iter()
            .map(|r| r.consolidation)
            .collect();

        Ok(ConsolidationReplay {
            trend,
            report,
            consolidations,
        })
    }

    async fn full_flow_over_range(
        &self,
        pair_id: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<FullFlowReplay> {
        let candles = self.replay_candles(pair_id, from, to).await?;
        let trend = classify_trend(&candles, &self.config.trend);

        let direction = trend
            .verdict()
            .filter(|v| v.is_trending)
            .and_then(|v| v.direction);
        let Some(direction) = direction else {
            return Ok(FullFlowReplay {
                trend,
                report: None,
                consolidations: Vec::new(),
                opportunities: Vec::new(),
            });
        };

        let report = self.scan_consolidations(candles.clone()).await?;
        let strategy = self
            .store
            .find_strategy_by_name(&self.config.trade.strategy_name)
            .await?;
        let plan = plan_records(
            pair_id,
            &report.candidates,
            Some(direction),
            &[],
            strategy.as_ref(),
            &self.config,
            to,
        )?;

        let (consolidations, opportunities): (Vec<_>, Vec<_>) = plan
            .into_iter()
            .map(|r| {
                let opportunity = r.opportunity.map(|o| {
                    let broken_at = r.consolidation.broken_at.map_or(i64::MAX, |t| t.timestamp_millis());
                    let after = candles.partition_point(|c| c.timestamp_ms <= broken_at);
                    Opportunity {
                        outcome: o.outcome_over(&candles[after..]),
                        ..o
                    }
                });
                (r.consolidation, opportunity)
            })
            .unzip();

        Ok(FullFlowReplay {
            trend,
            report: Some(report),
            consolidations,
            opportunities: opportunities.into_iter().flatten().collect(),
        })
    }
}
