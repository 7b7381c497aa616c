/// Times a block and logs it when it runs longer than the threshold.
/// Compiles down to the bare block when performance logging is off.
#[macro_export]
macro_rules! trace_time {
    // $threshold_micros: 500 for 0.5ms, 1000 for 1ms, etc.
    ($name:expr, $threshold_micros:expr, $block:block) => {{
        if $crate::config::LOG_PERFORMANCE {
            let start = $crate::utils::AppInstant::now();
            let result = $block;
            let micros = start.elapsed().as_micros();
            if micros > $threshold_micros {
                log::warn!(
                    "SLOW [{}]: '{}' took {:.3}ms (threshold {:.3}ms)",
                    if cfg!(debug_assertions) { "DEBUG" } else { "RELEASE" },
                    $name,
                    micros as f64 / 1000.0,
                    $threshold_micros as f64 / 1000.0
                );
            }
            result
        } else {
            $block
        }
    }};
}
