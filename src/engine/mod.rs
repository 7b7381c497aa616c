mod consolidation;
mod core;
mod replay;
mod scheduler;
mod trend;

pub use consolidation::{
    PairConsolidations, PlannedRecord, consolidation_from_candidate, opportunity_from_candidate,
    plan_records,
};
pub use core::{CycleSummary, SniperEngine};
pub use replay::{ConsolidationReplay, FullFlowReplay, ReplayOutcome};
pub use scheduler::run_scheduler;
