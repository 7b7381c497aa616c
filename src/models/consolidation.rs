use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Price, RangePct, VolatilityPct};
use crate::domain::PairId;
use crate::models::{SignificantLevel, TrendDirection};

/// A validated oscillation window with a confirmed breakout. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationCandidate {
    pub support: Price,
    pub resistance: Price,
    /// Inclusive candle indices into the analysed window
    pub start_index: usize,
    pub end_index: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    pub range_pct: RangePct,
    pub volatility_pct: VolatilityPct,
    pub direction_changes: usize,
    pub breakout_direction: TrendDirection,
    pub breakout_index: usize,
    pub breakout_ms: i64,
    pub quality_score: f64,
}

impl ConsolidationCandidate {
    #[inline]
    pub fn window_len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Number of candle indices shared with `other` (inclusive ranges).
    pub fn overlap(&self, other: &ConsolidationCandidate) -> usize {
        let lo = self.start_index.max(other.start_index);
        let hi = self.end_index.min(other.end_index);
        if lo > hi { 0 } else { hi - lo + 1 }
    }
}

/// Everything one detection pass produced for a window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub candidates: Vec<ConsolidationCandidate>,
    pub windows_evaluated: usize,
    pub windows_accepted: usize,
    pub levels: Vec<SignificantLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consolidation {
    pub id: Option<i64>,
    pub pair_id: PairId,
    pub trend_direction: Option<TrendDirection>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub resistance: Price,
    pub support: Price,
    pub broken_at: Option<DateTime<Utc>>,
    pub breakout_direction: Option<TrendDirection>,
    pub breakout_matches_trend: bool,
    pub created_at: DateTime<Utc>,
}

impl Consolidation {
    /// Whether `instant` falls inside this record's interval widened by `tolerance_ms`.
    pub fn covers(&self, instant_ms: i64, tolerance_ms: i64) -> bool {
        let start = self.start_time.timestamp_millis() - tolerance_ms;
        let end = self.broken_at.unwrap_or(self.end_time).timestamp_millis() + tolerance_ms;
        (start..=end).contains(&instant_ms)
    }
}
