mod consolidation;
mod levels;
mod opportunity;
mod strategy;
mod trend_state;

pub use {
    consolidation::{Consolidation, ConsolidationCandidate, ConsolidationReport},
    levels::{PriceLevel, SignificantLevel, SupportResistance, SwingKind, SwingPoint},
    opportunity::{Opportunity, OpportunityOutcome, SignalType, trade_levels},
    strategy::Strategy,
    trend_state::{
        InsufficientData, TrendCheck, TrendDirection, TrendState, TrendVerdict,
    },
};
