//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Per-bucket decisions of the candle builder (accepted / dropped / weekend).
    pub log_candle_builder: bool,

    /// EMA / ADX inputs and the resulting verdict for every pair.
    pub log_trend: bool,

    /// Window counts, candidate scores and dedup decisions.
    pub log_consolidation: bool,

    /// Activate trace_time macro (for cool scope-level timing)
    pub log_performance: bool,

    pub log_storage: bool,

    pub log_scheduler: bool,
}

pub const DF: LogFlags = LogFlags {
    log_candle_builder: false,
    log_trend: true,
    log_consolidation: true,
    log_performance: false,
    log_storage: false,
    log_scheduler: true,
};

pub const LOG_PERFORMANCE: bool = DF.log_performance;
