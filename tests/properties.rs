use proptest::prelude::*;

use breakout_sniper::analysis::consolidation::evaluate_window;
use breakout_sniper::analysis::{build_candles, detect_consolidations, detect_price_traps};
use breakout_sniper::config::{ANALYSIS, DedupStrategy, PriceLike};
use breakout_sniper::domain::{Candle, RateSample};
use breakout_sniper::models::TrendDirection;
use breakout_sniper::utils::TimeUtils;

const H: i64 = TimeUtils::MS_IN_H;
// Wednesday 2024-06-12 00:00 UTC
const ORIGIN: i64 = 1_718_150_400_000;

/// Hourly candles from a bounded random walk of close-to-close moves.
fn walk(steps: &[f64]) -> Vec<Candle> {
    let mut price = 1.1;
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let open = price;
            price *= 1.0 + step;
            let wick = price * 0.0002;
            Candle::new(
                ORIGIN + i as i64 * H,
                open,
                open.max(price) + wick,
                open.min(price) - wick,
                price,
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn built_candles_keep_open_and_close_inside_the_wicks(
        rates in prop::collection::vec(0.5f64..2.0, 60..600),
    ) {
        let samples: Vec<RateSample> = rates
            .iter()
            .enumerate()
            .map(|(i, &r)| RateSample::new(ORIGIN + i as i64 * TimeUtils::MS_IN_MIN, r))
            .collect();
        let candles = build_candles(&samples, &ANALYSIS.candles, ORIGIN + 24 * H);

        prop_assert!(candles.len() <= rates.len() / 48);
        for c in &candles {
            prop_assert!(c.low() <= c.open() && c.open() <= c.high());
            prop_assert!(c.low() <= c.close() && c.close() <= c.high());
            prop_assert_eq!(c.timestamp_ms % H, 0);
        }
        for pair in candles.windows(2) {
            prop_assert!(pair[0].timestamp_ms < pair[1].timestamp_ms);
        }
    }

    #[test]
    fn accepted_consolidations_never_share_candles(
        steps in prop::collection::vec(-0.003f64..0.003, 20..60),
    ) {
        let candles = walk(&steps);
        let settings = &ANALYSIS.consolidation;
        let report = detect_consolidations(&candles, settings, &ANALYSIS.swings);

        for (i, a) in report.candidates.iter().enumerate() {
            for b in &report.candidates[i + 1..] {
                prop_assert_eq!(a.overlap(b), 0);
            }
        }
        prop_assert!(report.windows_accepted <= report.windows_evaluated);
    }

    #[test]
    fn every_candidate_meets_the_window_criteria(
        steps in prop::collection::vec(-0.003f64..0.003, 20..60),
    ) {
        let candles = walk(&steps);
        let settings = &ANALYSIS.consolidation;
        let report = detect_consolidations(&candles, settings, &ANALYSIS.swings);

        for c in &report.candidates {
            let len = c.window_len();
            prop_assert!(len >= settings.min_consolidation_candles);
            prop_assert!(len <= settings.max_window_candles);

            let stats = evaluate_window(&candles[c.start_index..=c.end_index], settings);
            prop_assert!(stats.is_some());
            let stats = stats.unwrap();
            prop_assert_eq!(stats.direction_changes, c.direction_changes);

            prop_assert!(c.breakout_index > c.end_index);
            prop_assert!(c.breakout_index <= c.end_index + settings.breakout_confirmation_candles);
            let close = candles[c.breakout_index].close();
            match c.breakout_direction {
                TrendDirection::Up => prop_assert!(close > c.resistance.value()),
                TrendDirection::Down => prop_assert!(close < c.support.value()),
            }
            prop_assert!(c.quality_score > 0.0 && c.quality_score <= 1.0);
        }
    }

    #[test]
    fn proportional_dedup_caps_shared_candles(
        steps in prop::collection::vec(-0.003f64..0.003, 20..60),
        max_overlap_pct in 0.1f64..0.9,
    ) {
        let candles = walk(&steps);
        let mut settings = ANALYSIS.consolidation.clone();
        settings.dedup = DedupStrategy::Proportional { max_overlap_pct };
        let report = detect_consolidations(&candles, &settings, &ANALYSIS.swings);

        for (i, a) in report.candidates.iter().enumerate() {
            for b in &report.candidates[i + 1..] {
                let shorter = a.window_len().min(b.window_len()) as f64;
                prop_assert!(a.overlap(b) as f64 / shorter <= max_overlap_pct);
            }
        }
    }

    #[test]
    fn price_trap_runs_stay_between_their_levels(
        steps in prop::collection::vec(-0.004f64..0.004, 60..120),
    ) {
        let candles = walk(&steps);
        let levels = breakout_sniper::analysis::significant_levels_or_fallback(&candles, &ANALYSIS.swings);
        let traps = detect_price_traps(&candles, &levels, &ANALYSIS.traps);

        for t in &traps {
            prop_assert!(t.run_len() >= ANALYSIS.traps.min_run_candles);
            prop_assert!(t.lower.value() < t.upper.value());
            for c in &candles[t.start_index..=t.end_index] {
                prop_assert!(c.close() >= t.lower.value() && c.close() <= t.upper.value());
            }
        }
        for pair in traps.windows(2) {
            prop_assert!(pair[0].quality >= pair[1].quality);
        }
    }
}
