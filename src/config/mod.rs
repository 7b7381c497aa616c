//! Configuration module for the breakout engine.

mod analysis;
mod debug;
mod persistence;
mod types;

// Re-export commonly used items
pub use analysis::{
    ANALYSIS, AnalysisConfig, CandleSettings, ConsolidationSettings, DedupStrategy,
    PriceTrapSettings, SchedulerSettings, SwingSettings, TradeSettings, TrendSettings,
};
pub use debug::{DF, LOG_PERFORMANCE};
pub use persistence::PERSISTENCE;
pub use types::{
    ClosePrice, HighPrice, LowPrice, OpenPrice, Price, PriceLike, RangePct, StopPrice,
    TargetPrice, VolatilityPct,
};
