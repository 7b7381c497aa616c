use serde::{Deserialize, Serialize};

use crate::models::TrendState;

pub type PairId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub id: PairId,
    pub base_code: String,
    pub target_code: String,
    pub trend_state: TrendState,
}

impl CurrencyPair {
    pub fn new(id: PairId, base_code: &str, target_code: &str) -> Self {
        Self {
            id,
            base_code: base_code.to_string(),
            target_code: target_code.to_string(),
            trend_state: TrendState::default(),
        }
    }
}

impl std::fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.base_code, self.target_code)
    }
}
