mod maths_utils;
mod perf;
mod time_utils;

pub use time_utils::{AppInstant, TimeUtils, epoch_ms_to_utc, ms_to_datetime};

pub(crate) use maths_utils::{get_max, get_min, mean_and_stddev, saturating_ratio};
