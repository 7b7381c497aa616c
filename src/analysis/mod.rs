pub mod candle_builder;
pub mod consolidation;
pub mod indicators;
pub mod price_trap;
pub mod swing_levels;
pub mod trend_classifier;
pub mod zigzag;

pub use candle_builder::build_candles;
pub use consolidation::detect_consolidations;
pub use price_trap::{PriceTrap, detect_price_traps};
pub use swing_levels::{
    find_swing_highs, find_swing_lows, significant_levels_or_fallback, support_resistance_levels,
};
pub use trend_classifier::{classify_trend, trend_window};
