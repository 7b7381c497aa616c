//! Analysis and computation configuration

use std::{borrow::Cow, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::TimeUtils;

/// Settings for turning raw rate samples into candles.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleSettings {
    /// Nominal spacing of raw rate samples
    pub sample_interval_secs: i64,
    /// Candle width used by the trend and consolidation stages
    pub bucket_hours: i64,
    /// Share of the expected samples a bucket needs before it becomes a candle
    pub min_fill_ratio: f64,
}

/// Swing detection and level grouping.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingSettings {
    /// Candles each side of a swing point
    pub lookback: usize,
    /// Lookback used by the recent-swing fallback
    pub fallback_lookback: usize,
    /// Relative distance (fraction) at which two swing prices share a group
    pub group_tolerance_pct: f64,
    /// Looser distance (fraction) at which a candle counts as touching a level
    pub touch_tolerance_pct: f64,
    /// Zig-zag reversal threshold (fraction)
    pub zigzag_deviation_pct: f64,
    pub min_zigzag_candles: usize,
    pub min_reversal_points: usize,
    pub fallback_min_candles: usize,
    /// Final share of the window in which a touch earns the recency bonus
    pub recency_window_pct: f64,
    pub recency_bonus: f64,
}

/// Diagnostic trap detection between significant levels.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTrapSettings {
    pub max_level_distance_pct: f64,
    pub min_run_candles: usize,
    pub run_saturation_candles: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    /// Target candle count N
    pub required_candles: usize,
    /// EMA short period as a share of N
    pub ema_short_pct: f64,
    /// EMA long period as a share of N
    pub ema_long_pct: f64,
    pub adx_period: usize,
    pub adx_threshold: f64,
    /// Window extensions tried when history is short
    pub max_fetch_attempts: usize,
    pub fetch_extension_hours: i64,
    /// Largest shortfall below N that is still classified
    pub max_shortfall_candles: usize,
}

impl TrendSettings {
    pub fn ema_short_period(&self) -> usize {
        (self.required_candles as f64 * self.ema_short_pct).floor() as usize
    }

    pub fn ema_long_period(&self) -> usize {
        (self.required_candles as f64 * self.ema_long_pct).floor() as usize
    }
}

/// How overlapping consolidation candidates are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Any shared candle index rejects the lower ranked candidate.
    Strict,
    /// Reject only when the overlap exceeds `max_overlap_pct` of the shorter window.
    Proportional { max_overlap_pct: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationSettings {
    pub lookback_hours: i64,
    pub min_consolidation_candles: usize,
    pub max_window_candles: usize,
    pub min_range_pct: f64,
    pub max_range_pct: f64,
    pub max_volatility_pct: f64,
    pub min_direction_changes: usize,
    pub min_oscillations: usize,
    pub breakout_confirmation_candles: usize,
    /// Tolerance around stored consolidations when checking for an existing record
    pub existing_match_tolerance_ms: i64,
    /// Range at which the tightness score peaks
    pub ideal_range_pct: f64,
    /// Window length at which the size score saturates
    pub size_saturation_candles: usize,
    pub dedup: DedupStrategy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeSettings {
    pub strategy_name: Cow<'static, str>,
    pub stop_loss_pct: f64,
    pub reward_risk_ratio: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub trend_interval_secs: u64,
    pub consolidation_interval_secs: u64,
    /// Upper bound on a single pair's work inside a cycle
    pub pair_timeout_secs: u64,
}

/// The Master Analysis Configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub candles: CandleSettings,
    pub swings: SwingSettings,
    pub traps: PriceTrapSettings,
    pub trend: TrendSettings,
    pub consolidation: ConsolidationSettings,
    pub trade: TradeSettings,
    pub scheduler: SchedulerSettings,
}

impl AnalysisConfig {
    /// Reads a JSON override file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn bucket_ms(&self) -> i64 {
        self.candles.bucket_hours * TimeUtils::MS_IN_H
    }
}

pub const ANALYSIS: AnalysisConfig = AnalysisConfig {
    candles: CandleSettings {
        sample_interval_secs: 60,
        bucket_hours: 1,
        min_fill_ratio: 0.8,
    },

    swings: SwingSettings {
        lookback: 3,
        fallback_lookback: 2,
        group_tolerance_pct: 0.001, // 0.1%
        touch_tolerance_pct: 0.002, // 0.2%
        zigzag_deviation_pct: 0.05, // 5%
        min_zigzag_candles: 50,
        min_reversal_points: 4,
        fallback_min_candles: 20,
        recency_window_pct: 0.3,
        recency_bonus: 2.0,
    },

    traps: PriceTrapSettings {
        max_level_distance_pct: 0.03,
        min_run_candles: 8,
        run_saturation_candles: 24,
    },

    trend: TrendSettings {
        required_candles: 120,
        ema_short_pct: 0.2,
        ema_long_pct: 0.5,
        adx_period: 14,
        adx_threshold: 25.0,
        max_fetch_attempts: 5,
        fetch_extension_hours: 24,
        max_shortfall_candles: 10,
    },

    consolidation: ConsolidationSettings {
        lookback_hours: 48,
        min_consolidation_candles: 10,
        max_window_candles: 48,
        min_range_pct: 0.0,
        max_range_pct: 0.015,       // 1.5%
        max_volatility_pct: 0.004,  // 0.4%
        min_direction_changes: 2,
        min_oscillations: 3,
        breakout_confirmation_candles: 3,
        existing_match_tolerance_ms: TimeUtils::MS_IN_H,
        ideal_range_pct: 0.0025, // 0.25%
        size_saturation_candles: 24,
        dedup: DedupStrategy::Strict,
    },

    trade: TradeSettings {
        strategy_name: Cow::Borrowed("Consolidation Breakout"),
        stop_loss_pct: 0.005, // 0.5%
        reward_risk_ratio: 2.0,
    },

    scheduler: SchedulerSettings {
        trend_interval_secs: 3600,
        consolidation_interval_secs: 900,
        pair_timeout_secs: 30,
    },
};

impl Default for AnalysisConfig {
    fn default() -> Self {
        ANALYSIS.clone()
    }
}

macro_rules! default_from_analysis {
    ($ty:ty, $field:ident) => {
        impl Default for $ty {
            fn default() -> Self {
                ANALYSIS.$field.clone()
            }
        }
    };
}

default_from_analysis!(CandleSettings, candles);
default_from_analysis!(SwingSettings, swings);
default_from_analysis!(PriceTrapSettings, traps);
default_from_analysis!(TrendSettings, trend);
default_from_analysis!(ConsolidationSettings, consolidation);
default_from_analysis!(TradeSettings, trade);
default_from_analysis!(SchedulerSettings, scheduler);
