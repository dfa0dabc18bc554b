//! 통합 테스트 공용 도구: 메모리 저장소와 가짜 시세 소스.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tidewatch_collector::{CollectorContext, ConcurrencyLimiter};
use tidewatch_core::{AppConfig, Clock, ManualClock, OhlcvBar, Quote};
use tidewatch_data::{
    MarketDataProvider, MemoryBarStore, MemoryEpsCacheStore, MemoryInstrumentStore,
    MemorySnapshotStore, MemoryUpdateLogStore, ProviderError,
};

/// 종목별 일봉 응답 방식.
#[derive(Clone)]
pub enum Behavior {
    /// 요청 구간에 해당하는 일봉만 반환
    Bars(Vec<OhlcvBar>),
    Fail,
    /// 응답하지 않음
    Hang,
}

#[derive(Default)]
pub struct FakeMarket {
    behaviors: Mutex<HashMap<String, Behavior>>,
    quotes: Mutex<HashMap<String, Decimal>>,
    /// 남은 시세 조회 실패 횟수
    quote_failures: Mutex<HashMap<String, u32>>,
    quote_calls: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.set(symbol, Behavior::Bars(bars));
        self
    }

    pub fn with_behavior(self, symbol: &str, behavior: Behavior) -> Self {
        self.set(symbol, behavior);
        self
    }

    pub fn with_quote(self, symbol: &str, price: Decimal) -> Self {
        self.quotes.lock().unwrap().insert(symbol.to_string(), price);
        self
    }

    /// 처음 `times`번은 시세 조회가 실패합니다.
    pub fn with_quote_failures(self, symbol: &str, times: u32) -> Self {
        self.quote_failures
            .lock()
            .unwrap()
            .insert(symbol.to_string(), times);
        self
    }

    pub fn quote_calls_for(&self, symbol: &str) -> usize {
        self.quote_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| *s == symbol)
            .count()
    }

    pub fn set(&self, symbol: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(symbol.to_string(), behavior);
    }

    /// 일봉 요청 기록 (symbol, start, end).
    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<(NaiveDate, NaiveDate)> {
        self.calls()
            .into_iter()
            .filter(|(s, _, _)| s == symbol)
            .map(|(_, start, end)| (start, end))
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));

        let behavior = self.behaviors.lock().unwrap().get(symbol).cloned();
        match behavior {
            Some(Behavior::Bars(bars)) => Ok(bars
                .into_iter()
                .filter(|b| b.date >= start && b.date <= end)
                .collect()),
            Some(Behavior::Fail) => Err(ProviderError::Network("connection reset".into())),
            Some(Behavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        self.quote_calls.lock().unwrap().push(symbol.to_string());

        if let Some(remaining) = self.quote_failures.lock().unwrap().get_mut(symbol) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ProviderError::Network("quote unavailable".into()));
            }
        }

        match self.quotes.lock().unwrap().get(symbol) {
            Some(price) => Ok(Quote::price_only(symbol, *price)),
            None => Err(ProviderError::NotFound(symbol.to_string())),
        }
    }
}

/// 테스트 기준 시각: 2024-03-08(금) 15:30 현지.
pub fn default_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 8, 7, 30, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `end`로 끝나는 `n`개의 연속 일봉. 종가는 `base`부터 1씩 증가.
pub fn daily_bars(symbol: &str, end: NaiveDate, n: usize, base: i64) -> Vec<OhlcvBar> {
    (0..n)
        .map(|i| {
            let date = end - Duration::days((n - 1 - i) as i64);
            OhlcvBar::flat(symbol, date, Decimal::from(base + i as i64))
        })
        .collect()
}

pub struct Harness {
    pub ctx: CollectorContext,
    pub clock: Arc<ManualClock>,
    pub bars: Arc<MemoryBarStore>,
    pub instruments: Arc<MemoryInstrumentStore>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub update_log: Arc<MemoryUpdateLogStore>,
    pub market: Arc<FakeMarket>,
}

impl Harness {
    pub fn new(market: FakeMarket) -> Self {
        Self::with_config(market, test_config())
    }

    pub fn with_config(market: FakeMarket, config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(default_now()));
        let bars = Arc::new(MemoryBarStore::new());
        let instruments = Arc::new(MemoryInstrumentStore::new(clock.clone()));
        let snapshots = Arc::new(MemorySnapshotStore::new(clock.clone()));
        let update_log = Arc::new(MemoryUpdateLogStore::new());
        let eps_cache = Arc::new(MemoryEpsCacheStore::new(clock.clone()));
        let market = Arc::new(market);

        let ctx = CollectorContext {
            limiter: ConcurrencyLimiter::new(config.sync.concurrency),
            config: Arc::new(config),
            clock: clock.clone(),
            bars: bars.clone(),
            snapshots: snapshots.clone(),
            update_log: update_log.clone(),
            instruments: instruments.clone(),
            eps_cache,
            market: market.clone(),
            eps: None,
        };

        Self {
            ctx,
            clock,
            bars,
            instruments,
            snapshots,
            update_log,
            market,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.market_today()
    }
}

/// 재시도 대기 없이 빠르게 도는 설정.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.quote.backoff_secs = 0;
    config.eps.enabled = false;
    config
}
