use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};

#[cfg(debug_assertions)]
use crate::config::DF;
use crate::data::Collaborators;

use super::SniperEngine;

/// Runs the trend and consolidation cycles on their intervals until Ctrl-C.
///
/// Both cycles share one task, so a slow cycle delays the next tick instead of
/// overlapping it, and a trend pass always finishes before a consolidation pass reads
/// the state it wrote.
pub async fn run_scheduler<S: Collaborators>(engine: Arc<SniperEngine<S>>) -> Result<()> {
    let settings = &engine.config().scheduler;

    let mut trend_tick = interval(Duration::from_secs(settings.trend_interval_secs.max(1)));
    trend_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut consolidation_tick =
        interval(Duration::from_secs(settings.consolidation_interval_secs.max(1)));
    consolidation_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!(
        "Scheduler started: trend every {}s, consolidation every {}s",
        settings.trend_interval_secs,
        settings.consolidation_interval_secs
    );

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutdown requested, stopping scheduler");
                break;
            }
            _ = trend_tick.tick() => {
                #[cfg(debug_assertions)]
                if DF.log_scheduler {
                    log::info!("Trend tick");
                }
                if let Err(e) = engine.run_trend_cycle(Utc::now()).await {
                    log::error!("Trend cycle failed: {:#}", e);
                }
            }
            _ = consolidation_tick.tick() => {
                #[cfg(debug_assertions)]
                if DF.log_scheduler {
                    log::info!("Consolidation tick");
                }
                if let Err(e) = engine.run_consolidation_cycle(Utc::now()).await {
                    log::error!("Consolidation cycle failed: {:#}", e);
                }
            }
        }
    }

    Ok(())
}
