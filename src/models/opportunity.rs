use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::config::{Price, PriceLike, StopPrice, TargetPrice, TradeSettings};
use crate::domain::{Candle, PairId};
use crate::models::TrendDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    #[strum(serialize = "BUY")]
    Buy,
    #[strum(serialize = "SELL")]
    Sell,
}

impl From<TrendDirection> for SignalType {
    fn from(direction: TrendDirection) -> Self {
        match direction {
            TrendDirection::Up => SignalType::Buy,
            TrendDirection::Down => SignalType::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum OpportunityOutcome {
    #[strum(serialize = "TARGET")]
    TargetHit,
    #[strum(serialize = "STOP")]
    StopHit,
    #[strum(serialize = "EXPIRED")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Option<i64>,
    pub pair_id: PairId,
    pub strategy_id: i64,
    pub consolidation_id: Option<i64>,
    pub signal: SignalType,
    pub entry_price: Price,
    pub stop_loss: StopPrice,
    pub take_profit: TargetPrice,
    pub created_at: DateTime<Utc>,
    pub outcome: Option<OpportunityOutcome>,
}

/// Entry, stop and target for a breakout in `direction` off the given band.
pub fn trade_levels(
    direction: TrendDirection,
    support: Price,
    resistance: Price,
    trade: &TradeSettings,
) -> (Price, StopPrice, TargetPrice) {
    let entry = match direction {
        TrendDirection::Up => resistance,
        TrendDirection::Down => support,
    };
    let e = entry.value();
    let stop = match direction {
        TrendDirection::Up => e * (1.0 - trade.stop_loss_pct),
        TrendDirection::Down => e * (1.0 + trade.stop_loss_pct),
    };
    let risk = (e - stop).abs();
    let target = match direction {
        TrendDirection::Up => e + trade.reward_risk_ratio * risk,
        TrendDirection::Down => e - trade.reward_risk_ratio * risk,
    };
    (entry, StopPrice::new(stop), TargetPrice::new(target))
}

impl Opportunity {
    pub fn reward_risk(&self) -> f64 {
        let risk = (self.entry_price.value() - self.stop_loss.value()).abs();
        if risk <= f64::EPSILON {
            return 0.0;
        }
        (self.take_profit.value() - self.entry_price.value()).abs() / risk
    }

    /// Classifies a later candle against the stop and target.
    /// Stop is checked first: a candle spanning both counts as a loss.
    pub fn check_exit_condition(&self, high: Price, low: Price) -> Option<OpportunityOutcome> {
        match self.signal {
            SignalType::Buy => {
                if low <= Price::from(self.stop_loss) {
                    return Some(OpportunityOutcome::StopHit);
                }
                if high >= Price::from(self.take_profit) {
                    return Some(OpportunityOutcome::TargetHit);
                }
            }
            SignalType::Sell => {
                if high >= Price::from(self.stop_loss) {
                    return Some(OpportunityOutcome::StopHit);
                }
                if low <= Price::from(self.take_profit) {
                    return Some(OpportunityOutcome::TargetHit);
                }
            }
        }
        None
    }

    /// First exit reached by `later` candles, oldest first. `None` while still open.
    pub fn outcome_over(&self, later: &[Candle]) -> Option<OpportunityOutcome> {
        later
            .iter()
            .find_map(|c| self.check_exit_condition(Price::new(c.high()), Price::new(c.low())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ANALYSIS;

    fn buy_at(entry: f64) -> Opportunity {
        let (entry, stop, target) = trade_levels(
            TrendDirection::Up,
            Price::new(entry * 0.99),
            Price::new(entry),
            &ANALYSIS.trade,
        );
        Opportunity {
            id: None,
            pair_id: 1,
            strategy_id: 1,
            consolidation_id: None,
            signal: SignalType::Buy,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            created_at: Utc::now(),
            outcome: None,
        }
    }

    #[test]
    fn up_breakout_levels_use_resistance_and_two_to_one() {
        let (entry, stop, target) = trade_levels(
            TrendDirection::Up,
            Price::new(1.0),
            Price::new(1.1),
            &ANALYSIS.trade,
        );
        assert_eq!(entry.value(), 1.1);
        assert!((stop.value() - 1.0945).abs() < 1e-9);
        assert!((target.value() - 1.111).abs() < 1e-9);
    }

    #[test]
    fn down_breakout_levels_use_support() {
        let (entry, stop, target) = trade_levels(
            TrendDirection::Down,
            Price::new(1.0),
            Price::new(1.1),
            &ANALYSIS.trade,
        );
        assert_eq!(entry.value(), 1.0);
        assert!((stop.value() - 1.005).abs() < 1e-9);
        assert!((target.value() - 0.99).abs() < 1e-9);
    }

    #[test]
    fn stop_wins_when_candle_spans_both() {
        let opp = buy_at(1.0);
        assert!((opp.reward_risk() - 2.0).abs() < 1e-9);
        assert_eq!(
            opp.check_exit_condition(Price::new(1.02), Price::new(0.99)),
            Some(OpportunityOutcome::StopHit)
        );
        assert_eq!(
            opp.check_exit_condition(Price::new(1.02), Price::new(0.999)),
            Some(OpportunityOutcome::TargetHit)
        );
        assert_eq!(opp.check_exit_condition(Price::new(1.001), Price::new(0.999)), None);
    }

    #[test]
    fn outcome_is_the_first_exit_reached() {
        let opp = buy_at(1.0);
        let bar = |i: i64, high: f64, low: f64| Candle::new(i, 1.0, high, low, 1.0);

        let open = [bar(0, 1.004, 0.998), bar(1, 1.006, 0.997)];
        assert_eq!(opp.outcome_over(&open), None);

        let target_first = [bar(0, 1.004, 0.998), bar(1, 1.011, 0.999), bar(2, 1.0, 0.99)];
        assert_eq!(opp.outcome_over(&target_first), Some(OpportunityOutcome::TargetHit));

        let stop_first = [bar(0, 1.001, 0.994), bar(1, 1.02, 0.999)];
        assert_eq!(opp.outcome_over(&stop_first), Some(OpportunityOutcome::StopHit));
        assert_eq!(opp.outcome_over(&[]), None);
    }

    #[test]
    fn signal_follows_direction() {
        assert_eq!(SignalType::from(TrendDirection::Down), SignalType::Sell);
        assert_eq!(SignalType::Buy.to_string(), "BUY");
    }
}
