mod notifier;
mod provider;
mod storage;

pub use {
    notifier::{BroadcastNotifier, LogNotifier, OpportunityNotifier},
    provider::RateSource,
    storage::{
        Collaborators, ConsolidationStore, OpportunityStore, PairRegistry, SqliteStorage,
        StrategyRegistry,
    },
};
