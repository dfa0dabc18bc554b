//! 일봉 동기화 통합 테스트.

mod common;

use chrono::Duration;
use common::{daily_bars, date, Behavior, FakeMarket, Harness};
use tidewatch_collector::modules::{KlineSyncService, StalenessDetector, SyncOptions};
use tidewatch_collector::CollectorError;
use tidewatch_core::config::SyncScope;
use tidewatch_core::{Instrument, Timeframe, TrackedSymbol, UpdateStatus};
use tidewatch_data::{BarStore, InstrumentStore};

fn watchlist(codes: &[&str]) -> Vec<Instrument> {
    codes
        .iter()
        .map(|c| Instrument::new(*c, *c, Timeframe::D1))
        .collect()
}

#[tokio::test]
async fn test_due_symbols_batch() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.instruments.set_instruments(watchlist(&["A", "B", "C"])).await;
    h.bars
        .upsert_batch("A", &daily_bars("A", today - Duration::days(2), 3, 10))
        .await
        .unwrap();
    h.bars
        .upsert_batch("B", &daily_bars("B", today, 3, 10))
        .await
        .unwrap();

    let detector = StalenessDetector::new(h.ctx.instruments.clone(), h.ctx.bars.clone(), h.ctx.clock.clone());
    let mut due = detector.due_symbols(SyncScope::Watchlist, 1).await.unwrap();
    due.sort();
    assert_eq!(due, vec!["A".to_string(), "C".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_one_hanging_symbol_does_not_fail_batch() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    let codes = ["S1", "S2", "S3", "S4", "S5"];
    h.instruments.set_instruments(watchlist(&codes)).await;

    // S5에는 이전 일봉이 있음
    let prior = daily_bars("S5", today - Duration::days(3), 5, 50);
    h.bars.upsert_batch("S5", &prior).await.unwrap();

    for code in &codes[..4] {
        h.market.set(code, Behavior::Bars(daily_bars(code, today, 10, 10)));
    }
    h.market.set("S5", Behavior::Hang);

    let stats = KlineSyncService::new(&h.ctx)
        .sync(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.success(), 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.status(), UpdateStatus::Partial);

    // 실패한 종목의 기존 데이터는 그대로
    let s5 = h.bars.read("S5", 100).await.unwrap();
    assert_eq!(s5, prior);
    assert_eq!(h.bars.count("S1").await, 10);
    assert_eq!(h.bars.upsert_all_calls(), 1);
}

#[tokio::test]
async fn test_transport_error_is_isolated() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.instruments.set_instruments(watchlist(&["OK", "BAD"])).await;
    h.market.set("OK", Behavior::Bars(daily_bars("OK", today, 5, 1)));
    h.market.set("BAD", Behavior::Fail);

    let stats = KlineSyncService::new(&h.ctx)
        .sync(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.new_data, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.timed_out, 0);
    assert_eq!(h.bars.count("OK").await, 5);
    assert_eq!(h.bars.count("BAD").await, 0);
}

#[tokio::test]
async fn test_incremental_start_date() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.instruments
        .set_instruments(watchlist(&["OLD", "FRESH", "NEW"]))
        .await;

    let last = today - Duration::days(4);
    h.bars
        .upsert_batch("OLD", &daily_bars("OLD", last, 5, 10))
        .await
        .unwrap();
    h.bars
        .upsert_batch("FRESH", &daily_bars("FRESH", today, 5, 10))
        .await
        .unwrap();

    let stats = KlineSyncService::new(&h.ctx)
        .sync(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(h.market.calls_for("OLD"), vec![(last + Duration::days(1), today)]);
    assert_eq!(h.market.calls_for("NEW"), vec![(date(2020, 1, 1), today)]);
    // 오늘까지 데이터가 있으면 대상에서 빠지고 외부 호출도 없음
    assert!(h.market.calls_for("FRESH").is_empty());
    assert_eq!(stats.total, 2);
    assert_eq!(stats.no_new_data, 2);
    assert_eq!(stats.status(), UpdateStatus::Success);
}

#[tokio::test]
async fn test_stale_days_controls_due_set() {
    let mut config = common::test_config();
    config.sync.stale_days = 3;
    let h = Harness::with_config(FakeMarket::new(), config);
    let today = h.today();
    h.instruments.set_instruments(watchlist(&["TWO", "FIVE"])).await;
    h.bars
        .upsert_batch("TWO", &daily_bars("TWO", today - Duration::days(2), 3, 10))
        .await
        .unwrap();
    h.bars
        .upsert_batch("FIVE", &daily_bars("FIVE", today - Duration::days(5), 3, 10))
        .await
        .unwrap();

    let stats = KlineSyncService::new(&h.ctx)
        .sync(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 1);
    assert!(h.market.calls_for("TWO").is_empty());
    assert_eq!(h.market.calls_for("FIVE").len(), 1);
}

#[tokio::test]
async fn test_force_refetches_full_history() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.instruments.set_instruments(watchlist(&["A"])).await;
    h.bars
        .upsert_batch("A", &daily_bars("A", today, 5, 10))
        .await
        .unwrap();

    KlineSyncService::new(&h.ctx)
        .sync(SyncOptions {
            force: true,
            scope: SyncScope::Watchlist,
        })
        .await
        .unwrap();

    assert_eq!(h.market.calls_for("A"), vec![(date(2020, 1, 1), today)]);
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.instruments.set_instruments(watchlist(&["A"])).await;
    h.market.set("A", Behavior::Bars(daily_bars("A", today, 30, 10)));

    let service = KlineSyncService::new(&h.ctx);
    let force = SyncOptions {
        force: true,
        scope: SyncScope::Watchlist,
    };
    service.sync(force).await.unwrap();
    let first = h.bars.read("A", 100).await.unwrap();
    service.sync(force).await.unwrap();
    let second = h.bars.read("A", 100).await.unwrap();

    assert_eq!(first.len(), 30);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_storage_failure_aborts_batch() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.instruments.set_instruments(watchlist(&["A"])).await;
    h.market.set("A", Behavior::Bars(daily_bars("A", today, 5, 10)));
    h.bars.set_fail_writes(true);

    let result = KlineSyncService::new(&h.ctx)
        .sync(SyncOptions::default())
        .await;
    assert!(matches!(result, Err(CollectorError::Storage(_))));
}

#[tokio::test]
async fn test_universe_is_processed_in_pages() {
    let mut config = common::test_config();
    config.sync.concurrency = 4;
    let h = Harness::with_config(FakeMarket::new(), config);
    let today = h.today();

    let universe: Vec<TrackedSymbol> = (0..10)
        .map(|i| TrackedSymbol::new(format!("U{:02}", i), format!("u{}", i)))
        .collect();
    h.instruments.set_universe(universe).await;
    for i in 0..10 {
        let code = format!("U{:02}", i);
        let behavior = if i == 3 {
            Behavior::Fail
        } else {
            Behavior::Bars(daily_bars(&code, today, 3, 10))
        };
        h.market.set(&code, behavior);
    }

    let stats = KlineSyncService::new(&h.ctx)
        .sync(SyncOptions {
            force: false,
            scope: SyncScope::Universe,
        })
        .await
        .unwrap();

    assert_eq!(stats.total, 10);
    assert_eq!(stats.failed, 1);
    assert_eq!(h.market.calls().len(), 10);
    // 4 + 4 + 2 페이지, 배치마다 한 번씩 저장
    assert_eq!(h.bars.upsert_all_calls(), 3);

    // 실패한 종목도 처리 시각이 찍혀 다음 실행까지 대기
    let pending = h
        .instruments
        .pending_update(100, Duration::hours(12))
        .await
        .unwrap();
    assert!(pending.is_empty());

    let tracked = h.instruments.tracked_symbols().await.unwrap();
    assert!(tracked.iter().all(|s| s.last_update.is_some()));
}
