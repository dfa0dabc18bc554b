//! 실시간 시세 조회 (재시도 포함).

use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tidewatch_core::config::QuoteConfig;
use tidewatch_core::Quote;
use tidewatch_data::MarketDataProvider;
use tracing::{debug, warn};

use crate::context::CollectorContext;
use crate::limiter::ConcurrencyLimiter;

/// 시세 조회기.
///
/// 시도마다 제한기 허가를 얻고 시도별 타임아웃을 적용합니다. 실패하면
/// `backoff`만큼 쉬고 `max_attempts`까지 재시도합니다.
#[derive(Clone)]
pub struct QuoteFetcher {
    market: Arc<dyn MarketDataProvider>,
    limiter: ConcurrencyLimiter,
    config: QuoteConfig,
}

impl QuoteFetcher {
    pub fn new(ctx: &CollectorContext) -> Self {
        Self {
            market: ctx.market.clone(),
            limiter: ctx.limiter.clone(),
            config: ctx.config.quote.clone(),
        }
    }

    /// 재시도 후에도 실패하면 `None`.
    pub async fn fetch(&self, symbol: &str) -> Option<Quote> {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let result = match self.limiter.acquire().await {
                Ok(_permit) => {
                    tokio::time::timeout(self.config.timeout(), self.market.fetch_quote(symbol))
                        .await
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "제한기 허가 획득 실패");
                    return None;
                }
            };

            match result {
                Ok(Ok(quote)) => {
                    debug!(symbol = %symbol, attempt = attempt, price = %quote.price, "시세 조회");
                    return Some(quote);
                }
                Ok(Err(e)) => {
                    warn!(symbol = %symbol, attempt = attempt, error = %e, "시세 조회 실패");
                }
                Err(_) => {
                    warn!(symbol = %symbol, attempt = attempt, "시세 조회 타임아웃");
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.backoff()).await;
            }
        }
        None
    }

    /// 현재가. 조회에 실패하면 `default`를 돌려줍니다.
    pub async fn price_or(&self, symbol: &str, default: Option<Decimal>) -> Option<Decimal> {
        self.fetch(symbol).await.map(|q| q.price).or(default)
    }

    /// 여러 종목을 동시에 조회합니다. 실패한 종목은 결과에서 빠집니다.
    pub async fn fetch_bulk(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let results = join_all(symbols.iter().map(|s| async move { (s.clone(), self.fetch(s).await) })).await;

        let quotes: HashMap<String, Quote> = results
            .into_iter()
            .filter_map(|(s, q)| q.map(|q| (s, q)))
            .collect();

        debug!(requested = symbols.len(), received = quotes.len(), "시세 일괄 조회");
        quotes
    }
}
