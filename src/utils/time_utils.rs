use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};

pub type AppInstant = std::time::Instant;

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

    /// Floors an epoch-ms timestamp onto a multiple of `bucket_ms`.
    #[inline]
    pub fn align_down(timestamp_ms: i64, bucket_ms: i64) -> i64 {
        if bucket_ms <= 0 {
            return timestamp_ms;
        }
        timestamp_ms.div_euclid(bucket_ms) * bucket_ms
    }

    /// Top of the hour containing `now`.
    pub fn hour_floor(now: DateTime<Utc>) -> DateTime<Utc> {
        let ms = Self::align_down(now.timestamp_millis(), Self::MS_IN_H);
        ms_to_datetime(ms).unwrap_or(now)
    }

    /// Forex market closure: Saturday from 01:00 through Sunday 23:00 inclusive (UTC).
    pub fn is_weekend_closure(timestamp_ms: i64) -> bool {
        let Some(dt) = ms_to_datetime(timestamp_ms) else {
            return false;
        };
        match dt.weekday() {
            Weekday::Sat => dt.hour() >= 1,
            Weekday::Sun => dt.hour() < 23 || (dt.hour() == 23 && dt.minute() == 0),
            _ => false,
        }
    }

    pub fn hours(n: i64) -> Duration {
        Duration::milliseconds(n * Self::MS_IN_H)
    }
}

pub fn ms_to_datetime(epoch_ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(epoch_ms).single()
}

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display purposes
    match ms_to_datetime(epoch_ms) {
        Some(dt) => dt.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
        None => format!("<invalid {}>", epoch_ms),
    }
}
