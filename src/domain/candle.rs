use serde::{Deserialize, Serialize};

use crate::config::{ClosePrice, HighPrice, LowPrice, OpenPrice, PriceLike};

/// One OHLC bucket. `timestamp_ms` marks the bucket start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,

    pub open_price: OpenPrice,
    pub high_price: HighPrice,
    pub low_price: LowPrice,
    pub close_price: ClosePrice,
}

impl Candle {
    /// Builds a candle, widening high/low so they always bracket open and close.
    pub fn new(timestamp_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        let high = high.max(open).max(close);
        let low = low.min(open).min(close);
        Candle {
            timestamp_ms,
            open_price: OpenPrice::new(open),
            high_price: HighPrice::new(high),
            low_price: LowPrice::new(low),
            close_price: ClosePrice::new(close),
        }
    }

    #[inline]
    pub fn high(&self) -> f64 {
        self.high_price.value()
    }

    #[inline]
    pub fn low(&self) -> f64 {
        self.low_price.value()
    }

    #[inline]
    pub fn close(&self) -> f64 {
        self.close_price.value()
    }

    #[inline]
    pub fn open(&self) -> f64 {
        self.open_price.value()
    }

    /// All four prices identical: no trading happened in the bucket.
    pub fn is_flat(&self) -> bool {
        let o = self.open();
        o == self.high() && o == self.low() && o == self.close()
    }

    pub fn is_well_formed(&self) -> bool {
        let (o, h, l, c) = (self.open(), self.high(), self.low(), self.close());
        l <= o && l <= c && o <= h && c <= h
    }
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(Candle::close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_widens_inconsistent_extremes() {
        let c = Candle::new(0, 1.10, 1.05, 1.12, 1.08);
        assert!(c.is_well_formed());
        assert_eq!(c.high(), 1.10);
        assert_eq!(c.low(), 1.08);
    }

    #[test]
    fn flatness() {
        assert!(Candle::new(0, 1.1, 1.1, 1.1, 1.1).is_flat());
        assert!(!Candle::new(0, 1.1, 1.1001, 1.1, 1.1).is_flat());
    }
}
