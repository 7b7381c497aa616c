//! Sliding-window consolidation search, breakout confirmation and de-duplication.

use rayon::prelude::*;

#[cfg(debug_assertions)]
use crate::config::DF;
use crate::config::{
    ConsolidationSettings, DedupStrategy, Price, RangePct, SwingSettings, VolatilityPct,
};
use crate::domain::Candle;
use crate::models::{ConsolidationCandidate, ConsolidationReport, TrendDirection};
use crate::utils::{get_max, get_min, mean_and_stddev, saturating_ratio};

use super::swing_levels::significant_levels_or_fallback;

/// Oscillation measurements over one candidate window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub support: f64,
    pub resistance: f64,
    pub range_pct: RangePct,
    pub volatility_pct: VolatilityPct,
    pub direction_changes: usize,
    pub oscillations: usize,
    /// No close ever moved. Such a window clears the oscillation gate.
    pub is_flat: bool,
}

impl WindowStats {
    pub fn passes(&self, settings: &ConsolidationSettings) -> bool {
        let range = self.range_pct.value();
        let oscillates = self.is_flat
            || (self.direction_changes >= settings.min_direction_changes
                && self.oscillations >= settings.min_oscillations);
        range >= settings.min_range_pct
            && range <= settings.max_range_pct
            && oscillates
            && self.volatility_pct.value() <= settings.max_volatility_pct
    }
}

/// Sign reversals between consecutive close-to-close moves, and the number of
/// same-sign segments. Unchanged closes are ignored.
pub fn oscillation_counts(closes: &[f64]) -> (usize, usize) {
    let signs: Vec<bool> = closes
        .windows(2)
        .filter_map(|w| {
            let d = w[1] - w[0];
            if d > 0.0 {
                Some(true)
            } else if d < 0.0 {
                Some(false)
            } else {
                None
            }
        })
        .collect();

    if signs.is_empty() {
        return (0, 0);
    }
    let changes = signs.windows(2).filter(|w| w[0] != w[1]).count();
    (changes, changes + 1)
}

/// Measures a window given its highs, lows and closes.
pub fn window_stats(highs: &[f64], lows: &[f64], closes: &[f64]) -> Option<WindowStats> {
    let resistance = get_max(highs)?;
    let support = get_min(lows)?;
    let (mean, stddev) = mean_and_stddev(closes);
    let (direction_changes, oscillations) = oscillation_counts(closes);
    let is_flat = closes.len() > 1 && closes.windows(2).all(|w| w[0] == w[1]);

    Some(WindowStats {
        support,
        resistance,
        range_pct: RangePct::calculate(resistance, support),
        volatility_pct: VolatilityPct::calculate(stddev, mean),
        direction_changes,
        oscillations,
        is_flat,
    })
}

/// Stats for `candles` if the window qualifies as a consolidation.
pub fn evaluate_window(candles: &[Candle], settings: &ConsolidationSettings) -> Option<WindowStats> {
    let highs: Vec<f64> = candles.iter().map(Candle::high).collect();
    let lows: Vec<f64> = candles.iter().map(Candle::low).collect();
    let closes: Vec<f64> = candles.iter().map(Candle::close).collect();
    window_stats(&highs, &lows, &closes).filter(|s| s.passes(settings))
}

/// First of the `confirmation` candles after `end` that closes outside the band.
pub fn find_breakout(
    candles: &[Candle],
    end: usize,
    support: f64,
    resistance: f64,
    confirmation: usize,
) -> Option<(TrendDirection, usize)> {
    candles
        .iter()
        .enumerate()
        .skip(end + 1)
        .take(confirmation)
        .find_map(|(i, c)| {
            if c.close() > resistance {
                Some((TrendDirection::Up, i))
            } else if c.close() < support {
                Some((TrendDirection::Down, i))
            } else {
                None
            }
        })
}

/// `0.5 * tightness + 0.3 * size + 0.2 * 0.5`. Breakout strength is not scored yet,
/// so that component is held at its neutral value.
pub fn quality_score(range_pct: RangePct, window_len: usize, settings: &ConsolidationSettings) -> f64 {
    let range = range_pct.value();
    let tightness = if range <= settings.ideal_range_pct {
        1.0
    } else {
        settings.ideal_range_pct / range
    };
    let size = saturating_ratio(window_len as f64, settings.size_saturation_candles as f64);
    const NEUTRAL_BREAKOUT: f64 = 0.5;

    0.5 * tightness + 0.3 * size + 0.2 * NEUTRAL_BREAKOUT
}

/// Greedy selection in (score desc, length desc, start asc) order.
pub fn deduplicate(
    mut candidates: Vec<ConsolidationCandidate>,
    strategy: DedupStrategy,
) -> Vec<ConsolidationCandidate> {
    candidates.sort_by(|a, b| {
        b.quality_score
            .total_cmp(&a.quality_score)
            .then(b.window_len().cmp(&a.window_len()))
            .then(a.start_index.cmp(&b.start_index))
    });

    let mut accepted: Vec<ConsolidationCandidate> = Vec::new();
    for candidate in candidates {
        let clashes = accepted.iter().any(|kept| {
            let shared = candidate.overlap(kept);
            match strategy {
                DedupStrategy::Strict => shared > 0,
                DedupStrategy::Proportional { max_overlap_pct } => {
                    let shorter = candidate.window_len().min(kept.window_len());
                    shared as f64 / shorter as f64 > max_overlap_pct
                }
            }
        });
        if !clashes {
            accepted.push(candidate);
        }
    }
    accepted
}

/// Runs the full search over `candles` (oldest first).
///
/// Every window of `min_consolidation_candles..=min(max_window_candles, len)` candles
/// is measured; qualifying windows need a confirmed breakout within the next
/// `breakout_confirmation_candles` candles to become candidates. Overlapping
/// candidates are then resolved by quality score.
pub fn detect_consolidations(
    candles: &[Candle],
    settings: &ConsolidationSettings,
    swings: &SwingSettings,
) -> ConsolidationReport {
    let levels = significant_levels_or_fallback(candles, swings);
    let n = candles.len();
    let min_len = settings.min_consolidation_candles.max(2);
    let max_len = settings.max_window_candles.min(n);

    if n < settings.min_consolidation_candles + settings.breakout_confirmation_candles
        || min_len > max_len
    {
        log::debug!(
            "Skipping consolidation scan: {} candles, need {}",
            n,
            settings.min_consolidation_candles + settings.breakout_confirmation_candles
        );
        return ConsolidationReport {
            levels,
            ..Default::default()
        };
    }

    let highs: Vec<f64> = candles.iter().map(Candle::high).collect();
    let lows: Vec<f64> = candles.iter().map(Candle::low).collect();
    let closes: Vec<f64> = candles.iter().map(Candle::close).collect();

    let windows: Vec<(usize, usize)> = (min_len..=max_len)
        .flat_map(|len| (0..=n - len).map(move |start| (start, start + len - 1)))
        .collect();

    let valid: Vec<(usize, usize, WindowStats)> = crate::trace_time!("Consolidation window scan", 5_000, {
        windows
            .par_iter()
            .filter_map(|&(start, end)| {
                let stats = window_stats(&highs[start..=end], &lows[start..=end], &closes[start..=end])?;
                stats.passes(settings).then_some((start, end, stats))
            })
            .collect()
    });

    let candidates: Vec<ConsolidationCandidate> = valid
        .iter()
        .filter_map(|(start, end, stats)| {
            let (direction, breakout_index) = find_breakout(
                candles,
                *end,
                stats.support,
                stats.resistance,
                settings.breakout_confirmation_candles,
            )?;
            Some(ConsolidationCandidate {
                support: Price::new(stats.support),
                resistance: Price::new(stats.resistance),
                start_index: *start,
                end_index: *end,
                start_ms: candles[*start].timestamp_ms,
                end_ms: candles[*end].timestamp_ms,
                range_pct: stats.range_pct,
                volatility_pct: stats.volatility_pct,
                direction_changes: stats.direction_changes,
                breakout_direction: direction,
                breakout_index,
                breakout_ms: candles[breakout_index].timestamp_ms,
                quality_score: quality_score(stats.range_pct, end - start + 1, settings),
            })
        })
        .collect();

    let with_breakout = candidates.len();
    let accepted = deduplicate(candidates, settings.dedup);

    #[cfg(debug_assertions)]
    if DF.log_consolidation {
        log::info!(
            "Consolidation scan: {} windows, {} valid, {} with breakout, {} after dedup",
            windows.len(),
            valid.len(),
            with_breakout,
            accepted.len()
        );
    }
    #[cfg(not(debug_assertions))]
    let _ = with_breakout;

    ConsolidationReport {
        candidates: accepted,
        windows_evaluated: windows.len(),
        windows_accepted: valid.len(),
        levels,
    }
}
