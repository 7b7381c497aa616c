use itertools::Itertools;

use crate::config::CandleSettings;
#[cfg(debug_assertions)]
use crate::config::DF;
use crate::domain::{Candle, RateSample};
use crate::utils::{TimeUtils, epoch_ms_to_utc};

/// Aggregates raw samples into fixed-width candles.
///
/// Buckets sit on a grid anchored at the hour containing the first sample. A bucket
/// becomes a candle only when it is complete (its end is not after `now_ms`) and holds
/// at least `min_fill_ratio` of the samples a full bucket would. Empty or thin buckets
/// are skipped, never padded. Flat candles inside the weekend closure are dropped.
pub fn build_candles(samples: &[RateSample], settings: &CandleSettings, now_ms: i64) -> Vec<Candle> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    let bucket_ms = settings.bucket_hours.max(1) * TimeUtils::MS_IN_H;
    let sample_ms = settings.sample_interval_secs.max(1) * TimeUtils::MS_IN_S;
    let expected = bucket_ms as f64 / sample_ms as f64;
    let min_samples = expected * settings.min_fill_ratio;
    let origin = TimeUtils::align_down(first.timestamp_ms, TimeUtils::MS_IN_H);

    let mut candles = Vec::new();
    let buckets = samples
        .iter()
        .chunk_by(|s| (s.timestamp_ms - origin).div_euclid(bucket_ms));

    for (bucket, group) in &buckets {
        let bucket_start = origin + bucket * bucket_ms;
        if bucket_start + bucket_ms > now_ms {
            #[cfg(debug_assertions)]
            if DF.log_candle_builder {
                log::info!("Dropping incomplete bucket {}", epoch_ms_to_utc(bucket_start));
            }
            continue;
        }

        let rates: Vec<f64> = group.map(|s| s.rate).collect();
        if (rates.len() as f64) < min_samples {
            #[cfg(debug_assertions)]
            if DF.log_candle_builder {
                log::info!(
                    "Dropping thin bucket {} ({} of {:.0} samples)",
                    epoch_ms_to_utc(bucket_start),
                    rates.len(),
                    expected
                );
            }
            continue;
        }

        if let Some(candle) = candle_from_rates(bucket_start, &rates) {
            candles.push(candle);
        }
    }

    remove_weekend_flats(candles)
}

fn candle_from_rates(timestamp_ms: i64, rates: &[f64]) -> Option<Candle> {
    let (&open, &close) = (rates.first()?, rates.last()?);
    let (low, high) = match rates.iter().copied().minmax_by(f64::total_cmp) {
        itertools::MinMaxResult::NoElements => return None,
        itertools::MinMaxResult::OneElement(v) => (v, v),
        itertools::MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    Some(Candle::new(timestamp_ms, open, high, low, close))
}

/// Drops candles that start inside the weekend closure and never moved.
pub fn remove_weekend_flats(candles: Vec<Candle>) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| {
            let drop = c.is_flat() && TimeUtils::is_weekend_closure(c.timestamp_ms);
            if drop {
                log::debug!("Weekend flat candle removed at {}", epoch_ms_to_utc(c.timestamp_ms));
            }
            !drop
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const H: i64 = TimeUtils::MS_IN_H;
    const M: i64 = TimeUtils::MS_IN_MIN;

    fn settings() -> CandleSettings {
        CandleSettings {
            sample_interval_secs: 60,
            bucket_hours: 1,
            min_fill_ratio: 0.8,
        }
    }

    fn monday_noon() -> i64 {
        // 2024-06-10 is a Monday
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn minute_samples(start: i64, count: i64, f: impl Fn(i64) -> f64) -> Vec<RateSample> {
        (0..count)
            .map(|i| RateSample::new(start + i * M, f(i)))
            .collect()
    }

    #[test]
    fn empty_input_gives_no_candles() {
        assert!(build_candles(&[], &settings(), monday_noon()).is_empty());
    }

    #[test]
    fn full_bucket_becomes_ohlc() {
        let start = monday_noon();
        let samples = minute_samples(start, 60, |i| 1.10 + (i % 7) as f64 * 0.0001);
        let candles = build_candles(&samples, &settings(), start + 2 * H);

        assert_eq!(candles.len(), 1);
        let c = &candles[0];
        assert_eq!(c.timestamp_ms, start);
        assert_eq!(c.open(), 1.10);
        assert!((c.high() - 1.1006).abs() < 1e-12);
        assert_eq!(c.low(), 1.10);
        assert!((c.close() - (1.10 + (59 % 7) as f64 * 0.0001)).abs() < 1e-12);
    }

    #[test]
    fn first_bucket_aligns_to_hour() {
        let start = monday_noon() + 20 * M;
        // 40 samples in the first hour (67%), 60 in the next
        let samples = minute_samples(start, 100, |_| 1.2);
        let candles = build_candles(&samples, &settings(), start + 3 * H);

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp_ms, monday_noon() + H);
    }

    #[test]
    fn fill_threshold_is_inclusive() {
        let start = monday_noon();
        let exactly_80 = minute_samples(start, 48, |_| 1.3);
        assert_eq!(build_candles(&exactly_80, &settings(), start + H).len(), 1);

        let below = minute_samples(start, 47, |_| 1.3);
        assert!(build_candles(&below, &settings(), start + H).is_empty());
    }

    #[test]
    fn trailing_partial_bucket_is_dropped() {
        let start = monday_noon();
        let samples = minute_samples(start, 110, |_| 1.1);
        let candles = build_candles(&samples, &settings(), start + H + 55 * M);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp_ms, start);
    }

    #[test]
    fn gaps_are_skipped_not_padded() {
        let start = monday_noon();
        let mut samples = minute_samples(start, 60, |_| 1.1);
        samples.extend(minute_samples(start + 3 * H, 60, |_| 1.2));
        let candles = build_candles(&samples, &settings(), start + 5 * H);

        let stamps: Vec<i64> = candles.iter().map(|c| c.timestamp_ms).collect();
        assert_eq!(stamps, vec![start, start + 3 * H]);
    }

    #[test]
    fn weekend_flat_dropped_but_moving_kept() {
        let sat_2am = Utc.with_ymd_and_hms(2024, 6, 15, 2, 0, 0)
            .unwrap()
            .timestamp_millis();
        let flat = Candle::new(sat_2am, 1.1, 1.1, 1.1, 1.1);
        let moving = Candle::new(sat_2am + H, 1.1, 1.1002, 1.1, 1.1);
        let weekday_flat = Candle::new(monday_noon(), 1.1, 1.1, 1.1, 1.1);

        let kept = remove_weekend_flats(vec![flat, moving, weekday_flat]);
        assert_eq!(kept, vec![moving, weekday_flat]);
    }

    #[test]
    fn weekend_flat_buckets_removed_during_build() {
        let sat_2am = Utc.with_ymd_and_hms(2024, 6, 15, 2, 0, 0)
            .unwrap()
            .timestamp_millis();
        let samples = minute_samples(sat_2am, 120, |i| if i < 60 { 1.1 } else { 1.1 + i as f64 * 1e-6 });
        let candles = build_candles(&samples, &settings(), sat_2am + 3 * H);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp_ms, sat_2am + H);
    }
}
