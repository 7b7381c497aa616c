//! Zig-zag reversal filter and the significant levels derived from it.

use crate::config::{Price, SwingSettings};
use crate::domain::{Candle, closes};
use crate::models::{SignificantLevel, SwingKind, SwingPoint};

use super::swing_levels::score_level_groups;

#[derive(Clone, Copy, PartialEq)]
enum Leg {
    Up,
    Down,
}

/// Indices of confirmed zig-zag pivots over `values`.
///
/// A pivot is only emitted once price has moved `deviation_pct` away from it in the
/// opposite direction, so the final running extreme is never included.
pub fn zigzag_pivots(values: &[f64], deviation_pct: f64) -> Vec<usize> {
    let mut pivots = Vec::new();
    let Some(&first) = values.first() else {
        return pivots;
    };

    let mut leg: Option<Leg> = None;
    let (mut lo_idx, mut hi_idx) = (0usize, 0usize);
    let (mut lo, mut hi) = (first, first);
    let mut ext_idx = 0usize;

    for (i, &v) in values.iter().enumerate().skip(1) {
        match leg {
            None => {
                if v < lo {
                    (lo, lo_idx) = (v, i);
                }
                if v > hi {
                    (hi, hi_idx) = (v, i);
                }
                if lo > 0.0 && v >= lo * (1.0 + deviation_pct) {
                    pivots.push(lo_idx);
                    leg = Some(Leg::Up);
                    ext_idx = i;
                } else if v <= hi * (1.0 - deviation_pct) {
                    pivots.push(hi_idx);
                    leg = Some(Leg::Down);
                    ext_idx = i;
                }
            }
            Some(Leg::Up) => {
                if v > values[ext_idx] {
                    ext_idx = i;
                } else if v <= values[ext_idx] * (1.0 - deviation_pct) {
                    pivots.push(ext_idx);
                    leg = Some(Leg::Down);
                    ext_idx = i;
                }
            }
            Some(Leg::Down) => {
                if v < values[ext_idx] {
                    ext_idx = i;
                } else if v >= values[ext_idx] * (1.0 + deviation_pct) {
                    pivots.push(ext_idx);
                    leg = Some(Leg::Up);
                    ext_idx = i;
                }
            }
        }
    }

    pivots
}

/// Labels each pivot high or low against its neighbouring pivots.
fn classify_pivots(values: &[f64], pivots: &[usize]) -> Vec<SwingKind> {
    pivots
        .iter()
        .enumerate()
        .map(|(k, &idx)| {
            let v = values[idx];
            let neighbour = if k > 0 { pivots[k - 1] } else { pivots[k + 1] };
            if v > values[neighbour] {
                SwingKind::High
            } else {
                SwingKind::Low
            }
        })
        .collect()
}

/// Significant levels from zig-zag reversals of closing prices.
///
/// None when there are fewer than `min_zigzag_candles` candles or fewer than
/// `min_reversal_points` confirmed reversals.
pub fn significant_levels(candles: &[Candle], settings: &SwingSettings) -> Option<Vec<SignificantLevel>> {
    if candles.len() < settings.min_zigzag_candles {
        return None;
    }

    let values = closes(candles);
    let pivots = zigzag_pivots(&values, settings.zigzag_deviation_pct);
    if pivots.len() < settings.min_reversal_points.max(2) {
        log::debug!(
            "Only {} zig-zag reversals over {} candles",
            pivots.len(),
            candles.len()
        );
        return None;
    }

    let points: Vec<SwingPoint> = classify_pivots(&values, &pivots)
        .into_iter()
        .zip(&pivots)
        .map(|(kind, &index)| SwingPoint {
            price: Price::new(values[index]),
            index,
            timestamp_ms: Some(candles[index].timestamp_ms),
            kind,
        })
        .collect();

    Some(score_level_groups(candles, &points, settings))
}
