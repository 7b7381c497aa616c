#![allow(clippy::const_is_empty)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod models;
pub mod utils;

mod commands;

// Re-export commonly used types outside of crate
pub use commands::run_cli;
pub use config::{ANALYSIS, AnalysisConfig, PERSISTENCE};
pub use data::SqliteStorage;
pub use engine::SniperEngine;

// CLI argument parsing
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::domain::PairId;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite database holding pairs, rates and derived records
    #[arg(long, default_value = PERSISTENCE.database.path)]
    pub db: PathBuf,

    /// JSON file overriding analysis thresholds
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the trend and consolidation cycles until Ctrl-C
    Run,
    /// One trend pass followed by one consolidation pass
    Cycle,
    /// Trend verdict over a historical range
    ReplayTrend(RangeArgs),
    /// Consolidations over a historical range, ignoring trend gating
    ReplayConsolidation(RangeArgs),
    /// Trend, consolidations and opportunities over a historical range
    ReplayFull(RangeArgs),
    /// Price traps between significant levels over a historical range
    Traps(RangeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    #[arg(long)]
    pub pair: PairId,

    /// Inclusive range start (RFC 3339)
    #[arg(long)]
    pub from: DateTime<Utc>,

    /// Exclusive range end (RFC 3339)
    #[arg(long)]
    pub to: DateTime<Utc>,

    /// Print JSON instead of tables
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
