//! 모니터 데이터/스냅샷 캐시 통합 테스트.

mod common;

use chrono::Duration;
use common::{daily_bars, Behavior, FakeMarket, Harness};
use rust_decimal_macros::dec;
use tidewatch_collector::modules::MonitorService;
use tidewatch_core::{Instrument, SnapshotKey, TechnicalStatus, Timeframe, Trend, ValuationStatus};
use tidewatch_data::{BarStore, SnapshotStore};

#[tokio::test]
async fn test_monitor_rows_are_computed_then_cached() {
    let market = FakeMarket::new().with_quote("600000", dec!(150));
    let h = Harness::new(market);
    let today = h.today();
    h.instruments
        .set_instruments(vec![Instrument::new("600000", "浦发银行", Timeframe::D1)])
        .await;
    // 종가 1..=200 상승 추세
    h.bars
        .upsert_batch("600000", &daily_bars("600000", today, 200, 1))
        .await
        .unwrap();

    let service = MonitorService::new(&h.ctx);

    let rows = service.get_monitor_data().await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(!row.from_cache);
    assert_eq!(row.current_price, dec!(150));
    assert!(row.ema144.is_some() && row.ema188.is_some());
    assert_eq!(row.trend, Trend::Bullish);
    assert_eq!(row.valuation_status, ValuationStatus::Unknown);
    assert_eq!(row.trend_emas.len(), 3);
    assert_eq!(row.trend_emas[0].name, "ema5");

    // 29분 뒤: 캐시 적중
    h.clock.advance(Duration::minutes(29));
    let rows = service.get_monitor_data().await.unwrap();
    assert!(rows[0].from_cache);

    // 31분 뒤: 만료되어 재계산
    h.clock.advance(Duration::minutes(2));
    let rows = service.get_monitor_data().await.unwrap();
    assert!(!rows[0].from_cache);
}

#[tokio::test]
async fn test_technical_status_from_ema_band() {
    // 종가가 계속 오르면 EMA144/188은 현재 종가보다 한참 아래
    let market = FakeMarket::new()
        .with_quote("HIGH", dec!(1000))
        .with_quote("LOW", dec!(1));
    let h = Harness::new(market);
    let today = h.today();
    h.instruments
        .set_instruments(vec![
            Instrument::new("HIGH", "high", Timeframe::D1),
            Instrument::new("LOW", "low", Timeframe::D1),
        ])
        .await;
    for code in ["HIGH", "LOW"] {
        h.bars
            .upsert_batch(code, &daily_bars(code, today, 200, 100))
            .await
            .unwrap();
    }

    let rows = MonitorService::new(&h.ctx).get_monitor_data().await.unwrap();
    let status = |code: &str| {
        rows.iter()
            .find(|r| r.code == code)
            .map(|r| r.technical_status)
            .unwrap()
    };
    assert_eq!(status("HIGH"), TechnicalStatus::NoSignal);
    assert_eq!(status("LOW"), TechnicalStatus::Breakdown);
}

#[tokio::test]
async fn test_insufficient_history_and_missing_quote_are_excluded() {
    let market = FakeMarket::new()
        .with_quote("SHORT", dec!(10))
        .with_quote("FULL", dec!(10));
    let mut config = common::test_config();
    config.monitor.sync_on_miss = false;
    let h = Harness::with_config(market, config);
    let today = h.today();

    h.instruments
        .set_instruments(vec![
            Instrument::new("SHORT", "short", Timeframe::D1),
            Instrument::new("FULL", "full", Timeframe::D1),
            Instrument::new("NOQUOTE", "no quote", Timeframe::D1),
        ])
        .await;
    h.bars
        .upsert_batch("SHORT", &daily_bars("SHORT", today, 187, 10))
        .await
        .unwrap();
    h.bars
        .upsert_batch("FULL", &daily_bars("FULL", today, 188, 10))
        .await
        .unwrap();
    h.bars
        .upsert_batch("NOQUOTE", &daily_bars("NOQUOTE", today, 200, 10))
        .await
        .unwrap();

    let rows = MonitorService::new(&h.ctx).get_monitor_data().await.unwrap();
    let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["FULL"]);
    assert!(h.market.calls().is_empty());
}

#[tokio::test]
async fn test_cache_miss_syncs_missing_history() {
    let market = FakeMarket::new().with_quote("NEW", dec!(20));
    let h = Harness::new(market);
    let today = h.today();
    h.market
        .set("NEW", Behavior::Bars(daily_bars("NEW", today, 250, 10)));
    h.instruments
        .set_instruments(vec![Instrument::new("NEW", "new", Timeframe::D1)])
        .await;

    let rows = MonitorService::new(&h.ctx).get_monitor_data().await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(h.bars.count("NEW").await, 250);
    assert!(h
        .snapshots
        .get(&SnapshotKey::new("NEW", Timeframe::D1), Duration::minutes(30))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_refresh_snapshots_ignores_cache() {
    let market = FakeMarket::new().with_quote("A", dec!(50));
    let h = Harness::new(market);
    let today = h.today();
    h.instruments
        .set_instruments(vec![Instrument::new("A", "a", Timeframe::D1)])
        .await;
    h.bars
        .upsert_batch("A", &daily_bars("A", today, 200, 10))
        .await
        .unwrap();

    let service = MonitorService::new(&h.ctx);
    assert_eq!(service.refresh_snapshots().await.unwrap(), 1);
    h.clock.advance(Duration::minutes(5));
    assert_eq!(service.refresh_snapshots().await.unwrap(), 1);

    let snapshot = h
        .snapshots
        .get(&SnapshotKey::new("A", Timeframe::D1), Duration::minutes(1))
        .await
        .unwrap();
    assert!(snapshot.is_some());
}
