#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use breakout_sniper::config::ANALYSIS;
use breakout_sniper::data::{PairRegistry, SqliteStorage};
use breakout_sniper::domain::{PairId, RateSample};
use breakout_sniper::engine::SniperEngine;
use breakout_sniper::models::{TrendDirection, TrendState};
use breakout_sniper::utils::TimeUtils;

pub const H: i64 = TimeUtils::MS_IN_H;
pub const M: i64 = TimeUtils::MS_IN_MIN;
pub const P: f64 = 1.1;
pub const STRATEGY: &str = "Consolidation Breakout";

/// Thursday 2024-06-13 12:00 UTC, clear of the weekend closure.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 13, 12, 0, 0).unwrap()
}

/// One sample per minute for `hours` hours from `start_ms`, each hour at a single rate.
pub fn flat_hours(start_ms: i64, rates: &[f64]) -> Vec<RateSample> {
    rates
        .iter()
        .enumerate()
        .flat_map(|(h, &rate)| {
            (0..60).map(move |m| RateSample::new(start_ms + h as i64 * H + m * M, rate))
        })
        .collect()
}

/// Minute samples rising by `step_per_hour` (relative) without pause.
pub fn steady_climb(start_ms: i64, hours: i64, step_per_hour: f64) -> Vec<RateSample> {
    (0..hours * 60)
        .map(|i| {
            let rate = P * (1.0 + step_per_hour * i as f64 / 60.0);
            RateSample::new(start_ms + i * M, rate)
        })
        .collect()
}

/// 25 hours of steep ramp, 20 hours of tight ripple around P, then 3 hours above it.
pub fn range_then_breakout(breakout: f64) -> Vec<f64> {
    let ramp = (0..25).map(|i| P * (1.0 - 0.006 * (25 - i) as f64));
    let ripple = (0..20).map(|i| if i % 2 == 0 { P * 1.0001 } else { P * 0.9999 });
    ramp.chain(ripple).chain([breakout; 3]).collect()
}

/// Start of the consolidation lookback ending at `now()`.
pub fn lookback_start() -> i64 {
    now().timestamp_millis() - ANALYSIS.consolidation.lookback_hours * H
}

pub async fn storage_with_pair() -> (SqliteStorage, PairId) {
    let storage = SqliteStorage::in_memory().await.unwrap();
    let pair = storage.insert_pair("EUR", "USD").await.unwrap();
    (storage, pair)
}

pub async fn set_trend(storage: &SqliteStorage, pair: PairId, direction: TrendDirection) {
    let state = TrendState {
        is_trending: true,
        direction: Some(direction),
        strength: Some(40.0),
        detected_at: Some(now()),
        last_checked_at: Some(now()),
    };
    storage.update_trend_state(pair, &state).await.unwrap();
}

pub fn engine(storage: SqliteStorage) -> SniperEngine<SqliteStorage> {
    SniperEngine::new(Arc::new(storage), ANALYSIS.clone())
}
