//! 시세 재시도/기본값 통합 테스트.

mod common;

use common::{FakeMarket, Harness};
use rust_decimal_macros::dec;
use tidewatch_collector::modules::QuoteFetcher;
use tokio::time::Instant;

/// 재시도 간격 2초, 최대 3회.
fn harness(market: FakeMarket) -> Harness {
    let mut config = common::test_config();
    config.quote.backoff_secs = 2;
    config.quote.max_attempts = 3;
    Harness::with_config(market, config)
}

#[tokio::test(start_paused = true)]
async fn test_quote_succeeds_on_third_attempt() {
    let market = FakeMarket::new()
        .with_quote("600000", dec!(10.5))
        .with_quote_failures("600000", 2);
    let h = harness(market);

    let started = Instant::now();
    let quote = QuoteFetcher::new(&h.ctx).fetch("600000").await;

    assert_eq!(quote.map(|q| q.price), Some(dec!(10.5)));
    assert_eq!(h.market.quote_calls_for("600000"), 3);
    // 실패 두 번 사이마다 한 번씩 대기
    assert!(started.elapsed() >= std::time::Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_quote_falls_back_to_default() {
    let market = FakeMarket::new()
        .with_quote("600000", dec!(10.5))
        .with_quote_failures("600000", 3);
    let h = harness(market);

    let price = QuoteFetcher::new(&h.ctx)
        .price_or("600000", Some(dec!(9.99)))
        .await;

    assert_eq!(price, Some(dec!(9.99)));
    assert_eq!(h.market.quote_calls_for("600000"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_quote_without_default_is_absent() {
    let h = harness(FakeMarket::new());

    let price = QuoteFetcher::new(&h.ctx).price_or("000001", None).await;

    assert_eq!(price, None);
    assert_eq!(h.market.quote_calls_for("000001"), 3);
}
