//! Moving averages and the directional movement index.
//!
//! Every function returns None when there is not enough input to produce a stable
//! value. A computed zero is a real reading, not a placeholder.

use crate::domain::Candle;

/// Full EMA series seeded with the SMA of the first `period` values.
/// Element `k` corresponds to input index `period - 1 + k`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let sma = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(sma);
    let mut prev = sma;
    for &v in &values[period..] {
        prev = v * k + prev * (1.0 - k);
        out.push(prev);
    }
    out
}

/// Latest EMA value.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Wilder's ADX. Needs at least `2 * period` candles: `period` moves to seed the
/// smoothed ranges and `period` DX values to seed the average.
pub fn adx(candles: &[Candle], period: usize) -> Option<AdxReading> {
    if period == 0 || candles.len() < 2 * period {
        return None;
    }

    let p = period as f64;
    let moves: Vec<(f64, f64, f64)> = candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let tr = (cur.high() - cur.low())
                .max((cur.high() - prev.close()).abs())
                .max((cur.low() - prev.close()).abs());
            let up = cur.high() - prev.high();
            let down = prev.low() - cur.low();
            let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
            let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
            (tr, plus_dm, minus_dm)
        })
        .collect();

    let (mut tr_s, mut plus_s, mut minus_s) = moves[..period]
        .iter()
        .fold((0.0, 0.0, 0.0), |acc, m| (acc.0 + m.0, acc.1 + m.1, acc.2 + m.2));

    let directional = |tr: f64, plus: f64, minus: f64| -> (f64, f64, f64) {
        if tr <= 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let pdi = 100.0 * plus / tr;
        let mdi = 100.0 * minus / tr;
        let sum = pdi + mdi;
        let dx = if sum > 0.0 { 100.0 * (pdi - mdi).abs() / sum } else { 0.0 };
        (pdi, mdi, dx)
    };

    let mut dx_values = Vec::with_capacity(moves.len() - period + 1);
    let (mut pdi, mut mdi, dx) = directional(tr_s, plus_s, minus_s);
    dx_values.push(dx);

    for &(tr, plus_dm, minus_dm) in &moves[period..] {
        tr_s = tr_s - tr_s / p + tr;
        plus_s = plus_s - plus_s / p + plus_dm;
        minus_s = minus_s - minus_s / p + minus_dm;
        let (pd, md, dx) = directional(tr_s, plus_s, minus_s);
        (pdi, mdi) = (pd, md);
        dx_values.push(dx);
    }

    if dx_values.len() < period {
        return None;
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / p;
    for &dx in &dx_values[period..] {
        adx = (adx * (p - 1.0) + dx) / p;
    }

    Some(AdxReading {
        adx,
        plus_di: pdi,
        minus_di: mdi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_sma() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let series = ema_series(&values, 3);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0], 2.0);
        assert_eq!(series[1], 3.0);
        assert_eq!(series[2], 4.0);
        assert_eq!(ema(&values, 3), Some(4.0));
    }

    #[test]
    fn ema_not_computable_below_period() {
        assert_eq!(ema(&[1.0, 2.0], 3), None);
        assert_eq!(ema(&[1.0, 2.0], 0), None);
    }

    fn ramp(n: usize, step: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 1.0 + step * i as f64;
                Candle::new(i as i64, base, base + 0.002, base - 0.002, base + step / 2.0)
            })
            .collect()
    }

    #[test]
    fn adx_needs_two_periods() {
        assert!(adx(&ramp(27, 0.01), 14).is_none());
        assert!(adx(&ramp(28, 0.01), 14).is_some());
    }

    #[test]
    fn steady_uptrend_reads_strong() {
        let reading = adx(&ramp(60, 0.01), 14).unwrap();
        assert!(reading.adx > 90.0, "adx {}", reading.adx);
        assert!(reading.plus_di > reading.minus_di);
    }

    #[test]
    fn flat_market_is_a_computed_zero() {
        let flat: Vec<Candle> = (0..40).map(|i| Candle::new(i, 1.0, 1.0, 1.0, 1.0)).collect();
        let reading = adx(&flat, 14).unwrap();
        assert_eq!(reading.adx, 0.0);
    }
}
