//! 갱신 작업과 업데이트 로그 통합 테스트.

mod common;

use chrono::Duration;
use common::{daily_bars, Behavior, FakeMarket, Harness};
use rust_decimal_macros::dec;
use tidewatch_collector::modules::{
    trigger_refresh, RefreshJob, RefreshReason, StalenessDetector, SyncOptions, UpdateLogService,
};
use tidewatch_core::{Instrument, Timeframe, UpdateStatus};
use tidewatch_data::{BarStore, UpdateLogStore};

#[tokio::test]
async fn test_refresh_job_records_success() {
    let market = FakeMarket::new().with_quote("A", dec!(30));
    let h = Harness::new(market);
    let today = h.today();
    h.market.set("A", Behavior::Bars(daily_bars("A", today, 220, 10)));
    h.instruments
        .set_instruments(vec![Instrument::new("A", "a", Timeframe::D1)])
        .await;

    let report = RefreshJob::new(&h.ctx)
        .run(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.status, UpdateStatus::Success);
    assert_eq!(report.stats.new_data, 1);
    assert_eq!(report.snapshots, 1);
    assert_eq!(report.log.update_date, today);

    let service = UpdateLogService::new(&h.ctx);
    assert!(service.has_updated_today().await.unwrap());
    let last = service.last_update_info().await.unwrap().unwrap();
    assert_eq!((last.success_count, last.total_count), (1, 1));
}

#[tokio::test]
async fn test_partial_run_is_not_updated_today() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.market.set("A", Behavior::Bars(daily_bars("A", today, 5, 10)));
    h.market.set("B", Behavior::Fail);
    h.instruments
        .set_instruments(vec![
            Instrument::new("A", "a", Timeframe::D1),
            Instrument::new("B", "b", Timeframe::D1),
        ])
        .await;

    let report = RefreshJob::new(&h.ctx)
        .run(SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(report.status, UpdateStatus::Partial);
    assert!(!UpdateLogService::new(&h.ctx)
        .has_updated_today()
        .await
        .unwrap());

    // 같은 날 재실행은 덮어씀. A는 이미 최신이라 B만 다시 시도
    h.market.set("B", Behavior::Bars(daily_bars("B", today, 5, 10)));
    RefreshJob::new(&h.ctx)
        .run(SyncOptions::default())
        .await
        .unwrap();
    let log = h.update_log.get(today).await.unwrap().unwrap();
    assert_eq!(log.status, UpdateStatus::Success);
    assert_eq!((log.success_count, log.total_count), (1, 1));
    assert_eq!(h.market.calls_for("A").len(), 1);
}

#[tokio::test]
async fn test_up_to_date_symbol_is_not_counted() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.market.set("STALE", Behavior::Bars(daily_bars("STALE", today, 5, 10)));
    h.instruments
        .set_instruments(vec![
            Instrument::new("FRESH", "fresh", Timeframe::D1),
            Instrument::new("STALE", "stale", Timeframe::D1),
        ])
        .await;
    h.bars
        .upsert_batch("FRESH", &daily_bars("FRESH", today, 5, 10))
        .await
        .unwrap();

    let report = RefreshJob::new(&h.ctx)
        .run(SyncOptions::default())
        .await
        .unwrap();

    assert_eq!((report.log.success_count, report.log.total_count), (1, 1));
    assert_eq!(report.status, UpdateStatus::Success);
    assert!(h.market.calls_for("FRESH").is_empty());
}

#[tokio::test]
async fn test_trigger_refresh_runs_in_background() {
    let h = Harness::new(FakeMarket::new());
    let today = h.today();
    h.market.set("A", Behavior::Bars(daily_bars("A", today, 3, 10)));
    h.instruments
        .set_instruments(vec![Instrument::new("A", "a", Timeframe::D1)])
        .await;

    let handle = trigger_refresh(RefreshJob::new(&h.ctx), SyncOptions::default());
    let report = handle.await.unwrap().unwrap();

    assert_eq!(report.stats.total, 1);
    assert_eq!(h.bars.count("A").await, 3);
}

#[tokio::test]
async fn test_should_refresh_decisions() {
    let h = Harness::new(FakeMarket::new());
    let detector = StalenessDetector::new(
        h.ctx.instruments.clone(),
        h.ctx.bars.clone(),
        h.ctx.clock.clone(),
    );

    let decision = detector.should_refresh().await.unwrap();
    assert!(!decision.due);
    assert_eq!(decision.reason, RefreshReason::NoInstruments);

    h.instruments
        .set_instruments(vec![Instrument::new("A", "a", Timeframe::D1)])
        .await;
    let decision = detector.should_refresh().await.unwrap();
    assert_eq!(decision.reason, RefreshReason::ColdStart);

    // 기준 시각은 장 마감 후(15:30)이고 오늘 일봉이 있음
    let today = h.today();
    h.bars
        .upsert_batch("A", &daily_bars("A", today, 3, 10))
        .await
        .unwrap();
    assert!(!detector.should_refresh().await.unwrap().due);

    // 다음 날 현지 10:00: 장중인데 오늘 일봉 없음
    h.clock.advance(Duration::hours(18) + Duration::minutes(30));
    let decision = detector.should_refresh().await.unwrap();
    assert_eq!(decision.reason, RefreshReason::SessionCatchUp);
}
