//! Diagnostic: periods where price stayed pinned between two nearby significant levels.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::{Price, PriceLike, PriceTrapSettings, RangePct};
use crate::domain::Candle;
use crate::models::{SignificantLevel, TrendDirection};
use crate::utils::{get_max, saturating_ratio};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrap {
    pub lower: Price,
    pub upper: Price,
    pub distance_pct: RangePct,
    /// Inclusive candle indices of the bounded run
    pub start_index: usize,
    pub end_index: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Direction of the candle that ended the run, None if the run reaches the end of data
    pub breakout: Option<TrendDirection>,
    pub quality: f64,
}

impl PriceTrap {
    pub fn run_len(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Every bounded run of at least `min_run_candles` closes between each pair of levels
/// no further apart than `max_level_distance_pct`, best quality first.
pub fn detect_price_traps(
    candles: &[Candle],
    levels: &[SignificantLevel],
    settings: &PriceTrapSettings,
) -> Vec<PriceTrap> {
    let scores: Vec<f64> = levels.iter().map(|l| l.score).collect();
    let best_score = get_max(&scores).unwrap_or(0.0);

    let mut traps: Vec<PriceTrap> = levels
        .iter()
        .tuple_combinations()
        .flat_map(|(a, b)| {
            let (lo, hi) = if a.price <= b.price { (a, b) } else { (b, a) };
            let distance = RangePct::calculate(hi.price.value(), lo.price.value());
            if distance.value() <= 0.0 || distance.value() > settings.max_level_distance_pct {
                return Vec::new();
            }
            let strength = if best_score > 0.0 {
                ((lo.score + hi.score) / 2.0) / best_score
            } else {
                0.0
            };
            bounded_runs(candles, lo.price, hi.price, settings.min_run_candles)
                .into_iter()
                .map(|(start, end)| {
                    let run_len = end - start + 1;
                    let quality = 0.4
                        * saturating_ratio(run_len as f64, settings.run_saturation_candles as f64)
                        + 0.3 * (1.0 - distance.value() / settings.max_level_distance_pct)
                        + 0.3 * strength;
                    PriceTrap {
                        lower: lo.price,
                        upper: hi.price,
                        distance_pct: distance,
                        start_index: start,
                        end_index: end,
                        start_ms: candles[start].timestamp_ms,
                        end_ms: candles[end].timestamp_ms,
                        breakout: candles
                            .get(end + 1)
                            .and_then(|c| breakout_direction(c, lo.price, hi.price)),
                        quality,
                    }
                })
                .collect()
        })
        .collect();

    traps.sort_by(|a, b| {
        b.quality
            .total_cmp(&a.quality)
            .then(a.start_index.cmp(&b.start_index))
    });
    traps
}

fn breakout_direction(candle: &Candle, lower: Price, upper: Price) -> Option<TrendDirection> {
    if candle.close_price > upper {
        Some(TrendDirection::Up)
    } else if candle.close_price < lower {
        Some(TrendDirection::Down)
    } else {
        None
    }
}

/// Maximal runs of consecutive closes inside `[lower, upper]` with at least `min_len` candles.
fn bounded_runs(candles: &[Candle], lower: Price, upper: Price, min_len: usize) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in candles.iter().enumerate() {
        let inside = c.close_price >= lower && c.close_price <= upper;
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_len.max(1) {
                    runs.push((s, i - 1));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start
        && candles.len() - s >= min_len.max(1)
    {
        runs.push((s, candles.len() - 1));
    }

    runs
}
