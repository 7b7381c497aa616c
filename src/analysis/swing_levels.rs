//! Swing detection and support/resistance grouping.

use crate::config::{Price, PriceLike, SwingSettings};
use crate::domain::Candle;
use crate::models::{
    PriceLevel, SignificantLevel, SupportResistance, SwingKind, SwingPoint,
};

/// Candles whose high strictly exceeds every other high within `lookback` on both sides.
/// The first and last `lookback` candles are never flagged.
pub fn find_swing_highs(candles: &[Candle], lookback: usize) -> Vec<SwingPoint> {
    find_swings(candles, lookback, SwingKind::High)
}

/// Mirror of [`find_swing_highs`] on candle lows.
pub fn find_swing_lows(candles: &[Candle], lookback: usize) -> Vec<SwingPoint> {
    find_swings(candles, lookback, SwingKind::Low)
}

fn find_swings(candles: &[Candle], lookback: usize, kind: SwingKind) -> Vec<SwingPoint> {
    if lookback == 0 || candles.len() < 2 * lookback + 1 {
        return Vec::new();
    }

    let price = |c: &Candle| match kind {
        SwingKind::High => c.high(),
        SwingKind::Low => c.low(),
    };
    let beats = |a: f64, b: f64| match kind {
        SwingKind::High => a > b,
        SwingKind::Low => a < b,
    };

    (lookback..candles.len() - lookback)
        .filter(|&i| {
            let p = price(&candles[i]);
            (i - lookback..=i + lookback)
                .filter(|&j| j != i)
                .all(|j| beats(p, price(&candles[j])))
        })
        .map(|i| SwingPoint {
            price: Price::new(price(&candles[i])),
            index: i,
            timestamp_ms: Some(candles[i].timestamp_ms),
            kind,
        })
        .collect()
}

/// Swing points merged by proximity to a running group mean.
#[derive(Debug, Clone)]
pub struct LevelGroup {
    pub mean: f64,
    pub members: Vec<SwingPoint>,
}

impl LevelGroup {
    pub fn dominant_kind(&self) -> SwingKind {
        let highs = self
            .members
            .iter()
            .filter(|p| p.kind == SwingKind::High)
            .count();
        if highs * 2 >= self.members.len() {
            SwingKind::High
        } else {
            SwingKind::Low
        }
    }
}

/// Assigns each point, in input order, to the first group whose mean is within
/// `tolerance_pct`, updating that mean incrementally. Unmatched points open a new group.
pub fn group_swing_points(points: &[SwingPoint], tolerance_pct: f64) -> Vec<LevelGroup> {
    let mut groups: Vec<LevelGroup> = Vec::new();

    for point in points {
        let p = point.price.value();
        let hit = groups
            .iter_mut()
            .find(|g| g.mean > 0.0 && (p - g.mean).abs() / g.mean <= tolerance_pct);

        match hit {
            Some(group) => {
                let n = group.members.len() as f64;
                group.mean += (p - group.mean) / (n + 1.0);
                group.members.push(*point);
            }
            None => groups.push(LevelGroup {
                mean: p,
                members: vec![*point],
            }),
        }
    }

    groups
}

/// Number of candles whose high, low or close lies within `tolerance_pct` of `level`,
/// and the index of the last such candle. Each candle counts once.
pub fn count_touches(candles: &[Candle], level: f64, tolerance_pct: f64) -> (usize, Option<usize>) {
    if level <= 0.0 {
        return (0, None);
    }
    let near = |x: f64| (x - level).abs() / level <= tolerance_pct;

    candles
        .iter()
        .enumerate()
        .filter(|(_, c)| near(c.high()) || near(c.low()) || near(c.close()))
        .fold((0, None), |(count, _), (i, _)| (count + 1, Some(i)))
}

fn price_levels(candles: &[Candle], points: &[SwingPoint], settings: &SwingSettings) -> Vec<PriceLevel> {
    let mut levels: Vec<PriceLevel> = group_swing_points(points, settings.group_tolerance_pct)
        .into_iter()
        .map(|g| {
            let (touches, last_touch_index) =
                count_touches(candles, g.mean, settings.touch_tolerance_pct);
            PriceLevel {
                price: Price::new(g.mean),
                group_count: g.members.len(),
                touches,
                last_touch_index,
            }
        })
        .collect();

    levels.sort_by(|a, b| {
        b.touches
            .cmp(&a.touches)
            .then(a.price.value().total_cmp(&b.price.value()))
    });
    levels
}

/// Grouped swing highs (resistance) and swing lows (support), most touched first.
pub fn support_resistance_levels(
    candles: &[Candle],
    lookback: usize,
    settings: &SwingSettings,
) -> SupportResistance {
    SupportResistance {
        resistance: price_levels(candles, &find_swing_highs(candles, lookback), settings),
        support: price_levels(candles, &find_swing_lows(candles, lookback), settings),
    }
}

/// Scores grouped points as `group_count * 2 + touches + recency bonus`, best first.
pub(crate) fn score_level_groups(
    candles: &[Candle],
    points: &[SwingPoint],
    settings: &SwingSettings,
) -> Vec<SignificantLevel> {
    let recent_from = candles.len() as f64 * (1.0 - settings.recency_window_pct);

    let mut levels: Vec<SignificantLevel> = group_swing_points(points, settings.group_tolerance_pct)
        .into_iter()
        .map(|g| {
            let (touches, last_touch) =
                count_touches(candles, g.mean, settings.touch_tolerance_pct);
            let bonus = match last_touch {
                Some(i) if i as f64 >= recent_from => settings.recency_bonus,
                _ => 0.0,
            };
            SignificantLevel {
                price: Price::new(g.mean),
                score: (g.members.len() * 2 + touches) as f64 + bonus,
                last_touch_ms: last_touch.map(|i| candles[i].timestamp_ms),
                kind: g.dominant_kind(),
                group_count: g.members.len(),
                touches,
            }
        })
        .collect();

    levels.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.price.value().total_cmp(&b.price.value()))
    });
    levels
}

/// Significant levels from plain swing points over the window. Needs
/// `fallback_min_candles`; returns None below that.
pub fn recent_swing_levels(candles: &[Candle], settings: &SwingSettings) -> Option<Vec<SignificantLevel>> {
    if candles.len() < settings.fallback_min_candles {
        return None;
    }

    let mut points = find_swing_highs(candles, settings.fallback_lookback);
    points.extend(find_swing_lows(candles, settings.fallback_lookback));
    points.sort_by_key(|p| p.index);

    Some(score_level_groups(candles, &points, settings))
}

/// Zig-zag levels when there is enough history, recent swings otherwise.
/// Empty when neither method has enough candles.
pub fn significant_levels_or_fallback(candles: &[Candle], settings: &SwingSettings) -> Vec<SignificantLevel> {
    super::zigzag::significant_levels(candles, settings)
        .or_else(|| recent_swing_levels(candles, settings))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ANALYSIS;

    fn bar(i: usize, high: f64, low: f64) -> Candle {
        let mid = (high + low) / 2.0;
        Candle::new(i as i64 * 3_600_000, mid, high, low, mid)
    }

    fn from_highs(highs: &[f64]) -> Vec<Candle> {
        highs
            .iter()
            .enumerate()
            .map(|(i, &h)| bar(i, h, h - 0.01))
            .collect()
    }

    #[test]
    fn swing_high_needs_strict_exceed() {
        let candles = from_highs(&[1.0, 1.1, 1.2, 1.5, 1.2, 1.1, 1.0]);
        let highs = find_swing_highs(&candles, 2);
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 3);
        assert_eq!(highs[0].kind, SwingKind::High);

        let tied = from_highs(&[1.0, 1.1, 1.5, 1.5, 1.2, 1.1, 1.0]);
        assert!(find_swing_highs(&tied, 2).is_empty());
    }

    #[test]
    fn edges_are_never_swings() {
        let candles = from_highs(&[2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0]);
        assert!(find_swing_highs(&candles, 2).is_empty());
        assert!(find_swing_highs(&candles[..3], 2).is_empty());
    }

    #[test]
    fn swing_lows_mirror_highs() {
        let candles: Vec<Candle> = [1.5, 1.4, 1.3, 1.0, 1.3, 1.4, 1.5]
            .iter()
            .enumerate()
            .map(|(i, &l)| bar(i, l + 0.01, l))
            .collect();
        let lows = find_swing_lows(&candles, 3);
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].index, 3);
        assert_eq!(lows[0].price.value(), 1.0);
    }

    fn point(price: f64, index: usize, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            price: Price::new(price),
            index,
            timestamp_ms: None,
            kind,
        }
    }

    #[test]
    fn grouping_uses_running_mean() {
        let points = [
            point(1.0000, 0, SwingKind::High),
            point(1.0008, 1, SwingKind::High),
            // within 0.1% of the updated mean (1.0004) but not of the first point
            point(1.0014, 2, SwingKind::Low),
            point(1.0100, 3, SwingKind::Low),
        ];
        let groups = group_swing_points(&points, 0.001);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 3);
        assert!((groups[0].mean - 1.000_733_333).abs() < 1e-6);
        assert_eq!(groups[0].dominant_kind(), SwingKind::High);
        assert_eq!(groups[1].dominant_kind(), SwingKind::Low);
    }

    #[test]
    fn touches_count_each_candle_once() {
        let candles = vec![
            Candle::new(0, 1.0, 1.001, 0.999, 1.0),
            Candle::new(1, 1.05, 1.06, 1.04, 1.05),
            Candle::new(2, 1.0015, 1.0015, 1.0015, 1.0015),
        ];
        assert_eq!(count_touches(&candles, 1.0, 0.002), (2, Some(2)));
        assert_eq!(count_touches(&candles, 2.0, 0.002), (0, None));
    }

    #[test]
    fn fallback_requires_minimum_history() {
        let candles = from_highs(&[1.0; 19]);
        assert!(recent_swing_levels(&candles, &ANALYSIS.swings).is_none());

        let mut highs: Vec<f64> = (0..24).map(|i| 1.0 + 0.01 * ((i % 6) as f64)).collect();
        highs[23] = 1.0;
        let candles = from_highs(&highs);
        let levels = recent_swing_levels(&candles, &ANALYSIS.swings).unwrap();
        assert!(!levels.is_empty());
        assert!(levels.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn support_resistance_splits_by_kind() {
        let highs: Vec<f64> = (0..30).map(|i| if i % 6 == 3 { 1.2 } else { 1.1 }).collect();
        let candles: Vec<Candle> = highs
            .iter()
            .enumerate()
            .map(|(i, &h)| bar(i, h, if i % 6 == 0 { 1.0 } else { 1.05 }))
            .collect();
        let sr = support_resistance_levels(&candles, 2, &ANALYSIS.swings);
        assert_eq!(sr.resistance.len(), 1);
        assert!((sr.resistance[0].price.value() - 1.2).abs() < 1e-9);
        assert_eq!(sr.support.len(), 1);
        assert!((sr.support[0].price.value() - 1.0).abs() < 1e-9);
    }
}
