//! Typed prices and percentages shared by every analysis stage.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Fractional range of a consolidation band: (resistance - support) / support.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RangePct(f64);

impl RangePct {
    pub const fn new(val: f64) -> Self {
        let v = if val < 0.0 { 0.0 } else { val };
        Self(v)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// (high - low) / low. Zero when the floor is not a usable divisor.
    pub fn calculate(high: f64, low: f64) -> Self {
        if low > f64::EPSILON {
            Self::new((high - low) / low)
        } else {
            Self::new(0.0)
        }
    }
}

impl std::fmt::Display for RangePct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}%", self.0 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct VolatilityPct(f64);

impl VolatilityPct {
    pub const fn new(val: f64) -> Self {
        let v = if val < 0.0 { 0.0 } else { val };
        Self(v)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Coefficient of variation: stddev / mean.
    pub fn calculate(stddev: f64, mean: f64) -> Self {
        if mean > f64::EPSILON {
            Self::new(stddev / mean)
        } else {
            Self::new(0.0)
        }
    }
}

impl std::fmt::Display for VolatilityPct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}%", self.0 * 100.0)
    }
}

/// A behavioral contract for anything that behaves like a price.
pub trait PriceLike {
    fn value(&self) -> f64;

    const MIN_EPSILON: f64 = 1e-12;

    fn is_positive(&self) -> bool {
        self.value() > Self::MIN_EPSILON
    }

    /// Formats a rate with FX quoting precision (3 decimals for yen-style quotes, else 5).
    fn format_price(&self) -> String {
        let price = self.value();
        if price == 0.0 {
            return "0.00000".to_string();
        }

        if price.abs() >= 20.0 {
            format!("{:.3}", price)
        } else {
            format!("{:.5}", price)
        }
    }
}

macro_rules! impl_into_price {
    ($from:ident) => {
        impl From<$from> for Price {
            fn from(p: $from) -> Self {
                Price::new(p.value())
            }
        }
    };
}

macro_rules! define_price_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl From<f64> for $name {
            fn from(v: f64) -> Self {
                $name::new(v)
            }
        }

        impl $name {
            pub const fn new(val: f64) -> Self {
                // Absolute prices should not be negative
                let v = if val < 0.0 { 0.0 } else { val };
                Self(v)
            }
        }

        impl Add for $name {
            type Output = f64;

            fn add(self, rhs: Self) -> Self::Output {
                self.value() + rhs.value()
            }
        }

        impl Sub for $name {
            type Output = f64;

            fn sub(self, rhs: Self) -> Self::Output {
                self.value() - rhs.value()
            }
        }

        impl Div for $name {
            type Output = f64;

            fn div(self, rhs: Self) -> Self::Output {
                self.value() / rhs.value()
            }
        }

        impl PriceLike for $name {
            fn value(&self) -> f64 {
                self.0
            }
        }

        impl Mul<f64> for $name {
            type Output = $name;

            fn mul(self, rhs: f64) -> Self::Output {
                $name::new(self.value() * rhs)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.format_price())
            }
        }
    };
}

macro_rules! impl_price_compare {
    ($a:ty, $b:ty) => {
        impl PartialEq<$b> for $a {
            fn eq(&self, other: &$b) -> bool {
                self.value() == other.value()
            }
        }

        impl PartialOrd<$b> for $a {
            fn partial_cmp(&self, other: &$b) -> Option<std::cmp::Ordering> {
                self.value().partial_cmp(&other.value())
            }
        }
    };
}

// Generate the Price Hierarchy
define_price_type!(Price);
define_price_type!(OpenPrice);
define_price_type!(HighPrice);
define_price_type!(LowPrice);
define_price_type!(ClosePrice);
define_price_type!(TargetPrice);
define_price_type!(StopPrice);

impl_into_price!(OpenPrice);
impl_into_price!(HighPrice);
impl_into_price!(LowPrice);
impl_into_price!(ClosePrice);
impl_into_price!(TargetPrice);
impl_into_price!(StopPrice);

impl_price_compare!(LowPrice, HighPrice);
impl_price_compare!(HighPrice, LowPrice);

impl_price_compare!(ClosePrice, Price);
impl_price_compare!(LowPrice, Price);
impl_price_compare!(HighPrice, Price);
impl_price_compare!(Price, LowPrice);
impl_price_compare!(Price, HighPrice);
impl_price_compare!(StopPrice, Price);
impl_price_compare!(TargetPrice, Price);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_prices_clamp_to_zero() {
        assert_eq!(Price::new(-1.0).value(), 0.0);
        assert!(!Price::new(0.0).is_positive());
    }

    #[test]
    fn range_pct_uses_floor_as_divisor() {
        let r = RangePct::calculate(1.01, 1.0);
        assert!((r.value() - 0.01).abs() < 1e-12);
        assert_eq!(RangePct::calculate(1.0, 0.0).value(), 0.0);
    }

    #[test]
    fn format_price_switches_precision_for_yen_quotes() {
        assert_eq!(Price::new(1.0845).format_price(), "1.08450");
        assert_eq!(Price::new(151.2).format_price(), "151.200");
    }

    #[test]
    fn cross_type_comparisons() {
        assert!(ClosePrice::new(1.1) > Price::new(1.0));
        assert!(LowPrice::new(1.0) < HighPrice::new(1.2));
    }
}
