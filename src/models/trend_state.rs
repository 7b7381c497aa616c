use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    #[strum(serialize = "UP")]
    Up,
    #[strum(serialize = "DOWN")]
    Down,
}

/// Last trend verdict persisted against a pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendState {
    pub is_trending: bool,
    pub direction: Option<TrendDirection>,
    /// ADX at the time of the verdict. Cleared when not trending.
    pub strength: Option<f64>,
    pub detected_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl TrendState {
    /// Direction of the pair when it is trending, otherwise None.
    pub fn trending_direction(&self) -> Option<TrendDirection> {
        if self.is_trending { self.direction } else { None }
    }
}

/// Output of one classification over a frozen candle window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendVerdict {
    pub is_trending: bool,
    pub direction: Option<TrendDirection>,
    pub adx: Option<f64>,
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
    pub latest_close: f64,
    pub candles_used: usize,
}

impl TrendVerdict {
    /// Persisted form: direction and strength are cleared unless trending.
    pub fn to_state(&self, now: DateTime<Utc>) -> TrendState {
        if self.is_trending {
            TrendState {
                is_trending: true,
                direction: self.direction,
                strength: self.adx,
                detected_at: Some(now),
                last_checked_at: Some(now),
            }
        } else {
            TrendState {
                is_trending: false,
                direction: None,
                strength: None,
                detected_at: None,
                last_checked_at: Some(now),
            }
        }
    }
}

/// Not enough candles to classify, even after widening the fetch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientData {
    pub available: usize,
    pub required: usize,
}

impl std::fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Insufficient data: {} candles available, {} required",
            self.available, self.required
        )
    }
}

impl std::error::Error for InsufficientData {}

/// Structured result of a trend check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrendCheck {
    Classified(TrendVerdict),
    InsufficientData(InsufficientData),
}

impl TrendCheck {
    pub fn verdict(&self) -> Option<&TrendVerdict> {
        match self {
            TrendCheck::Classified(v) => Some(v),
            TrendCheck::InsufficientData(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn verdict(is_trending: bool) -> TrendVerdict {
        TrendVerdict {
            is_trending,
            direction: Some(TrendDirection::Up),
            adx: Some(31.0),
            ema_short: Some(1.1),
            ema_long: Some(1.0),
            latest_close: 1.2,
            candles_used: 120,
        }
    }

    #[test]
    fn direction_round_trips_through_text() {
        assert_eq!(TrendDirection::Up.to_string(), "UP");
        assert_eq!(TrendDirection::from_str("DOWN").unwrap(), TrendDirection::Down);
    }

    #[test]
    fn non_trending_state_clears_direction_and_strength() {
        let now = Utc::now();
        let state = verdict(false).to_state(now);
        assert!(!state.is_trending);
        assert_eq!(state.direction, None);
        assert_eq!(state.strength, None);
        assert_eq!(state.last_checked_at, Some(now));

        let state = verdict(true).to_state(now);
        assert_eq!(state.trending_direction(), Some(TrendDirection::Up));
        assert_eq!(state.strength, Some(31.0));
    }
}
