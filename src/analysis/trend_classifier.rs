use chrono::{DateTime, Utc};

#[cfg(debug_assertions)]
use crate::config::DF;
use crate::config::TrendSettings;
use crate::domain::{Candle, closes};
use crate::models::{InsufficientData, TrendCheck, TrendDirection, TrendVerdict};
use crate::utils::TimeUtils;

use super::indicators::{adx, ema};

/// Fetch range for the trend check: the `required_candles` hours ending one hour
/// before the top of the current hour.
pub fn trend_window(now: DateTime<Utc>, settings: &TrendSettings) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = TimeUtils::hour_floor(now) - TimeUtils::hours(1);
    let start = end - TimeUtils::hours(settings.required_candles as i64);
    (start, end)
}

/// Fewest candles that still produce a verdict.
pub fn minimum_candles(settings: &TrendSettings) -> usize {
    settings
        .required_candles
        .saturating_sub(settings.max_shortfall_candles)
        .max(1)
}

/// Classifies the most recent `required_candles` candles.
///
/// UP when the latest close sits above the short EMA and the short EMA above the long
/// one; DOWN for the mirrored ordering. Trending additionally needs ADX above the
/// threshold. An ADX that cannot be computed never counts as trending.
pub fn classify_trend(candles: &[Candle], settings: &TrendSettings) -> TrendCheck {
    let required = settings.required_candles;
    if candles.len() < minimum_candles(settings) {
        return TrendCheck::InsufficientData(InsufficientData {
            available: candles.len(),
            required,
        });
    }

    let window = &candles[candles.len().saturating_sub(required)..];
    let values = closes(window);
    let Some(&latest_close) = values.last() else {
        return TrendCheck::InsufficientData(InsufficientData {
            available: 0,
            required,
        });
    };

    let ema_short = ema(&values, settings.ema_short_period());
    let ema_long = ema(&values, settings.ema_long_period());
    let adx_value = adx(window, settings.adx_period).map(|r| r.adx);

    let direction = match (ema_short, ema_long) {
        (Some(s), Some(l)) if latest_close > s && s > l => Some(TrendDirection::Up),
        (Some(s), Some(l)) if latest_close < s && s < l => Some(TrendDirection::Down),
        _ => None,
    };
    let strong = adx_value.is_some_and(|a| a > settings.adx_threshold);
    let is_trending = direction.is_some() && strong;

    #[cfg(debug_assertions)]
    if DF.log_trend {
        log::info!(
            "Trend over {} candles: close {:.5} ema_s {:?} ema_l {:?} adx {:?} -> {:?} (trending: {})",
            window.len(),
            latest_close,
            ema_short,
            ema_long,
            adx_value,
            direction,
            is_trending
        );
    }

    TrendCheck::Classified(TrendVerdict {
        is_trending,
        direction,
        adx: adx_value,
        ema_short,
        ema_long,
        latest_close,
        candles_used: window.len(),
    })
}
