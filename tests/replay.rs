mod common;

use breakout_sniper::data::{ConsolidationStore, PairRegistry, SqliteStorage};
use breakout_sniper::domain::PairId;
use breakout_sniper::models::{SignalType, TrendCheck, TrendDirection, TrendState};
use breakout_sniper::utils::TimeUtils;

use common::*;

const CLIMB_HOURS: i64 = 120;

/// A steady climb that pauses in a 12 hour ripple and then breaks higher.
async fn trending_breakout() -> (SqliteStorage, PairId, i64) {
    let (storage, pair) = storage_with_pair().await;
    let from = now().timestamp_millis() - (CLIMB_HOURS + 15) * H;
    storage
        .insert_rates(pair, &steady_climb(from, CLIMB_HOURS, 0.001))
        .await
        .unwrap();

    let top = P * (1.0 + 0.001 * CLIMB_HOURS as f64);
    let tail: Vec<f64> = (0..12)
        .map(|i| if i % 2 == 0 { top * 1.0001 } else { top * 0.9999 })
        .chain([top * 1.01; 3])
        .collect();
    storage
        .insert_rates(pair, &flat_hours(from + CLIMB_HOURS * H, &tail))
        .await
        .unwrap();
    storage.insert_strategy(STRATEGY, true).await.unwrap();
    (storage, pair, from)
}

async fn assert_untouched(storage: &SqliteStorage, pair: PairId) {
    assert!(storage.find_consolidations_by_pair(pair).await.unwrap().is_empty());
    assert!(storage.list_opportunities(pair).await.unwrap().is_empty());
    let stored = storage.get_pair(pair).await.unwrap().unwrap();
    assert_eq!(stored.trend_state, TrendState::default());
}

#[tokio::test]
async fn replay_trend_classifies_the_range() {
    let (storage, pair, from) = trending_breakout().await;
    let engine = engine(storage);

    let outcome = engine
        .replay_trend(pair, ms(from), now())
        .await;
    assert!(outcome.is_ok());
    let verdict = outcome.result.as_ref().and_then(TrendCheck::verdict).unwrap();
    assert!(verdict.is_trending);
    assert_eq!(verdict.direction, Some(TrendDirection::Up));
    assert_eq!(verdict.candles_used, 120);

    assert_untouched(engine.store(), pair).await;
}

#[tokio::test]
async fn replay_full_flow_emits_without_writing() {
    let (storage, pair, from) = trending_breakout().await;
    let engine = engine(storage);

    let outcome = engine.replay_full_flow(pair, ms(from), now()).await;
    let replay = outcome.result.unwrap();
    assert!(replay.report.is_some());
    assert_eq!(replay.consolidations.len(), 1);
    assert_eq!(replay.opportunities.len(), 1);

    let c = &replay.consolidations[0];
    assert!(c.id.is_none());
    assert!(c.breakout_matches_trend);
    assert_eq!(
        c.broken_at.map(|t| t.timestamp_millis()),
        Some(from + (CLIMB_HOURS + 12) * H)
    );
    let o = &replay.opportunities[0];
    assert_eq!(o.signal, SignalType::Buy);
    // The two candles after the breakout stay between stop and target
    assert_eq!(o.outcome, None);

    assert_untouched(engine.store(), pair).await;
}

#[tokio::test]
async fn replay_full_flow_stops_when_not_trending() {
    let (storage, pair) = storage_with_pair().await;
    storage
        .insert_rates(pair, &flat_hours(lookback_start(), &range_then_breakout(P * 1.01)))
        .await
        .unwrap();
    let engine = engine(storage);

    let replay = engine
        .replay_full_flow(pair, ms(lookback_start()), now())
        .await
        .result
        .unwrap();
    assert!(matches!(replay.trend, TrendCheck::InsufficientData(_)));
    assert!(replay.report.is_none());
    assert!(replay.consolidations.is_empty());
    assert!(replay.opportunities.is_empty());
}

#[tokio::test]
async fn replay_consolidation_ignores_trend_and_stored_records() {
    let (storage, pair) = storage_with_pair().await;
    storage
        .insert_rates(pair, &flat_hours(lookback_start(), &range_then_breakout(P * 0.99)))
        .await
        .unwrap();
    let engine = engine(storage);

    let replay = engine
        .replay_consolidation(pair, ms(lookback_start()), now())
        .await
        .result
        .unwrap();
    assert!(matches!(replay.trend, TrendCheck::InsufficientData(_)));
    assert_eq!(replay.report.candidates.len(), 1);
    assert_eq!(replay.consolidations.len(), 1);

    let c = &replay.consolidations[0];
    assert_eq!(c.breakout_direction, Some(TrendDirection::Down));
    assert_eq!(c.trend_direction, None);
    assert!(!c.breakout_matches_trend);

    // Running twice gives the same answer: nothing was stored in between
    let again = engine
        .replay_consolidation(pair, ms(lookback_start()), now())
        .await
        .result
        .unwrap();
    assert_eq!(again.consolidations.len(), 1);
    assert_untouched(engine.store(), pair).await;
}

#[tokio::test]
async fn replay_reports_bad_input_as_errors() {
    let (storage, pair) = storage_with_pair().await;
    let engine = engine(storage);

    let empty = engine.replay_trend(pair, now(), now()).await;
    assert!(!empty.is_ok());
    assert!(empty.result.is_none());
    assert!(empty.error.unwrap().contains("Empty replay range"));

    let from = now() - TimeUtils::hours(24);
    let unknown = engine.replay_consolidation(pair + 100, from, now()).await;
    assert!(unknown.error.unwrap().contains("Unknown pair"));
}

fn ms(epoch_ms: i64) -> chrono::DateTime<chrono::Utc> {
    breakout_sniper::utils::ms_to_datetime(epoch_ms).unwrap()
}
