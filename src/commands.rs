//! Command dispatch and terminal rendering for the CLI.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::analysis::{PriceTrap, detect_price_traps, significant_levels_or_fallback};
use crate::config::{ANALYSIS, AnalysisConfig};
use crate::data::{LogNotifier, SqliteStorage};
use crate::engine::{
    ConsolidationReplay, CycleSummary, FullFlowReplay, ReplayOutcome, SniperEngine, run_scheduler,
};
use crate::models::{
    Consolidation, ConsolidationCandidate, Opportunity, SignificantLevel, TrendCheck, TrendDirection,
};
use crate::utils::{TimeUtils, ms_to_datetime};
use crate::{Cli, Command, RangeArgs};

/// Entry point for the binary.
pub async fn run_cli(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => ANALYSIS.clone(),
    };

    let db_path = args.db.to_string_lossy();
    let storage = SqliteStorage::new(&db_path)
        .await?
        .with_notifier(Arc::new(LogNotifier));
    let engine = Arc::new(SniperEngine::new(Arc::new(storage), config));

    match args.command {
        Command::Run => run_scheduler(engine).await,
        Command::Cycle => {
            let (trend, consolidation) = engine.run_once(Utc::now()).await?;
            print_cycle(&trend, &consolidation);
            Ok(())
        }
        Command::ReplayTrend(range) => {
            let outcome = engine.replay_trend(range.pair, range.from, range.to).await;
            render(&range, &outcome, print_trend)
        }
        Command::ReplayConsolidation(range) => {
            let outcome = engine
                .replay_consolidation(range.pair, range.from, range.to)
                .await;
            render(&range, &outcome, print_consolidation_replay)
        }
        Command::ReplayFull(range) => {
            let outcome = engine
                .replay_full_flow(range.pair, range.from, range.to)
                .await;
            render(&range, &outcome, print_full_flow)
        }
        Command::Traps(range) => {
            let outcome: ReplayOutcome<TrapReport> = trap_report(&engine, &range).await.into();
            render(&range, &outcome, print_traps)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct TrapReport {
    levels: Vec<SignificantLevel>,
    traps: Vec<PriceTrap>,
}

async fn trap_report(engine: &SniperEngine<SqliteStorage>, range: &RangeArgs) -> Result<TrapReport> {
    if range.to <= range.from {
        anyhow::bail!("Empty range: {} is not before {}", range.from, range.to);
    }
    let candles = engine
        .load_candles(range.pair, range.from, range.to, range.to)
        .await
        .with_context(|| format!("Failed to load candles for pair {}", range.pair))?;

    let config = engine.config();
    let levels = significant_levels_or_fallback(&candles, &config.swings);
    let traps = detect_price_traps(&candles, &levels, &config.traps);
    Ok(TrapReport { levels, traps })
}

fn short_time(ms: i64) -> String {
    ms_to_datetime(ms).map_or_else(|| ms.to_string(), |dt| dt.format("%m-%d %H:%M").to_string())
}

fn render<T: Serialize>(
    range: &RangeArgs,
    outcome: &ReplayOutcome<T>,
    print: impl Fn(&T),
) -> Result<()> {
    if range.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    match (&outcome.result, &outcome.error) {
        (Some(value), _) => print(value),
        (None, Some(error)) => println!("Error: {}", error),
        (None, None) => println!("No result"),
    }
    Ok(())
}

#[derive(Tabled)]
struct SummaryRow {
    cycle: &'static str,
    processed: usize,
    failed: usize,
    skipped: usize,
    trending: usize,
    consolidations: usize,
    opportunities: usize,
}

impl SummaryRow {
    fn new(cycle: &'static str, s: &CycleSummary) -> Self {
        Self {
            cycle,
            processed: s.pairs_processed,
            failed: s.pairs_failed,
            skipped: s.pairs_skipped,
            trending: s.trending,
            consolidations: s.consolidations_created,
            opportunities: s.opportunities_created,
        }
    }
}

fn print_cycle(trend: &CycleSummary, consolidation: &CycleSummary) {
    let rows = [
        SummaryRow::new("trend", trend),
        SummaryRow::new("consolidation", consolidation),
    ];
    println!("{}", Table::new(rows));
}

fn print_trend(check: &TrendCheck) {
    match check {
        TrendCheck::InsufficientData(missing) => println!("{}", missing),
        TrendCheck::Classified(v) => {
            let direction = v.direction.map_or("-".to_string(), |d| d.to_string());
            let fmt = |x: Option<f64>| x.map_or("-".to_string(), |x| format!("{:.5}", x));
            println!(
                "trending: {}  direction: {}  adx: {}  ema short: {}  ema long: {}  close: {:.5}  candles: {}",
                v.is_trending,
                direction,
                v.adx.map_or("-".to_string(), |a| format!("{:.1}", a)),
                fmt(v.ema_short),
                fmt(v.ema_long),
                v.latest_close,
                v.candles_used
            );
        }
    }
}

#[derive(Tabled)]
struct CandidateRow {
    start: String,
    end: String,
    support: String,
    resistance: String,
    range: String,
    volatility: String,
    changes: usize,
    breakout: String,
    at: String,
    score: String,
}

impl From<&ConsolidationCandidate> for CandidateRow {
    fn from(c: &ConsolidationCandidate) -> Self {
        Self {
            start: short_time(c.start_ms),
            end: short_time(c.end_ms),
            support: c.support.to_string(),
            resistance: c.resistance.to_string(),
            range: c.range_pct.to_string(),
            volatility: c.volatility_pct.to_string(),
            changes: c.direction_changes,
            breakout: c.breakout_direction.to_string(),
            at: short_time(c.breakout_ms),
            score: format!("{:.3}", c.quality_score),
        }
    }
}

#[derive(Tabled)]
struct ConsolidationRow {
    start: String,
    end: String,
    support: String,
    resistance: String,
    trend: String,
    breakout: String,
    matches: bool,
}

impl From<&Consolidation> for ConsolidationRow {
    fn from(c: &Consolidation) -> Self {
        let opt = |d: Option<TrendDirection>| d.map_or("-".to_string(), |d| d.to_string());
        Self {
            start: c.start_time.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
            end: c.end_time.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
            support: c.support.to_string(),
            resistance: c.resistance.to_string(),
            trend: opt(c.trend_direction),
            breakout: opt(c.breakout_direction),
            matches: c.breakout_matches_trend,
        }
    }
}

#[derive(Tabled)]
struct OpportunityRow {
    signal: String,
    entry: String,
    stop: String,
    target: String,
    rr: String,
    outcome: String,
    created: String,
}

impl From<&Opportunity> for OpportunityRow {
    fn from(o: &Opportunity) -> Self {
        Self {
            signal: o.signal.to_string(),
            entry: o.entry_price.to_string(),
            stop: o.stop_loss.to_string(),
            target: o.take_profit.to_string(),
            rr: format!("{:.2}", o.reward_risk()),
            outcome: o.outcome.map_or("open".to_string(), |x| x.to_string()),
            created: o.created_at.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
        }
    }
}

fn print_candidates(candidates: &[ConsolidationCandidate], windows: usize, accepted: usize) {
    println!(
        "{} windows evaluated, {} accepted, {} kept after dedup",
        windows,
        accepted,
        candidates.len()
    );
    if !candidates.is_empty() {
        println!("{}", Table::new(candidates.iter().map(CandidateRow::from)));
    }
}

fn print_consolidations(consolidations: &[Consolidation]) {
    if !consolidations.is_empty() {
        println!("{}", Table::new(consolidations.iter().map(ConsolidationRow::from)));
    }
}

fn print_consolidation_replay(replay: &ConsolidationReplay) {
    print_trend(&replay.trend);
    let report = &replay.report;
    print_candidates(&report.candidates, report.windows_evaluated, report.windows_accepted);
    print_consolidations(&replay.consolidations);
}

fn print_full_flow(replay: &FullFlowReplay) {
    print_trend(&replay.trend);
    let Some(report) = &replay.report else {
        println!("Not trending, consolidation search skipped");
        return;
    };
    print_candidates(&report.candidates, report.windows_evaluated, report.windows_accepted);
    print_consolidations(&replay.consolidations);
    if replay.opportunities.is_empty() {
        println!("No opportunities");
    } else {
        println!("{}", Table::new(replay.opportunities.iter().map(OpportunityRow::from)));
    }
}

#[derive(Tabled)]
struct LevelRow {
    price: String,
    kind: String,
    score: String,
    swings: usize,
    touches: usize,
    last_touch: String,
}

#[derive(Tabled)]
struct TrapRow {
    lower: String,
    upper: String,
    distance: String,
    candles: usize,
    start: String,
    end: String,
    breakout: String,
    quality: String,
}

fn print_traps(report: &TrapReport) {
    let levels = report.levels.iter().map(|l| LevelRow {
        price: l.price.to_string(),
        kind: l.kind.to_string(),
        score: format!("{:.2}", l.score),
        swings: l.group_count,
        touches: l.touches,
        last_touch: l
            .last_touch_ms
            .map_or("-".to_string(), short_time),
    });
    println!("{}", Table::new(levels));

    if report.traps.is_empty() {
        println!("No price traps");
        return;
    }
    let traps = report.traps.iter().map(|t| TrapRow {
        lower: t.lower.to_string(),
        upper: t.upper.to_string(),
        distance: t.distance_pct.to_string(),
        candles: t.run_len(),
        start: short_time(t.start_ms),
        end: short_time(t.end_ms),
        breakout: t.breakout.map_or("open".to_string(), |d| d.to_string()),
        quality: format!("{:.3}", t.quality),
    });
    println!("{}", Table::new(traps));
}
