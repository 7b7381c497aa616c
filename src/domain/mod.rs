// Domain types and value objects
mod candle;
mod currency_pair;
mod rate_sample;

pub use candle::{Candle, closes};
pub use currency_pair::{CurrencyPair, PairId};
pub use rate_sample::RateSample;
