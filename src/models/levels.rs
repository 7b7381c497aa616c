use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::config::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SwingKind {
    High,
    Low,
}

/// A local extremum over a symmetric lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub price: Price,
    /// Index into the candle slice the point was found in
    pub index: usize,
    pub timestamp_ms: Option<i64>,
    pub kind: SwingKind,
}

/// Swing prices merged within tolerance, with the number of candles touching them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub group_count: usize,
    pub touches: usize,
    pub last_touch_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: Vec<PriceLevel>,
    pub resistance: Vec<PriceLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantLevel {
    pub price: Price,
    pub score: f64,
    pub last_touch_ms: Option<i64>,
    pub kind: SwingKind,
    pub group_count: usize,
    pub touches: usize,
}
