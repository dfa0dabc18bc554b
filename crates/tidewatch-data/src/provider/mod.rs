//! 외부 데이터 Provider.
//!
//! ## 일봉
//! - `TencentKlineClient`: 텐센트 `fqkline` 엔드포인트 (전복권 `qfqday`)
//!
//! ## 실시간 시세
//! - `XueqiuQuoteClient`: 쉐추 `v5/stock/quote.json` (`xq_a_token` 쿠키 필요)
//!
//! ## EPS 예측
//! - `ThsEpsClient`: 동화순 컨센서스 표 크롤러 (blocking 클라이언트)
//! - `CachedEpsProvider`: EPS 캐시 래퍼, 모든 실패를 `None`으로 변환

pub mod cached_eps;
pub mod tencent;
pub mod ths_eps;
pub mod xueqiu;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use tidewatch_core::{OhlcvBar, Quote};

pub use cached_eps::CachedEpsProvider;
pub use tencent::TencentKlineClient;
pub use ths_eps::{BlockingPool, ThsEpsClient};
pub use xueqiu::XueqiuQuoteClient;

/// 외부 API 오류.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP 요청 실패: {0}")]
    Network(String),

    #[error("요청 시간 초과: {0}")]
    Timeout(String),

    #[error("API 오류 (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("응답 파싱 실패: {0}")]
    Parse(String),

    #[error("데이터 없음: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

/// 일봉과 실시간 시세를 제공하는 데이터 소스.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider 이름 (로그용).
    fn name(&self) -> &str;

    /// `[start, end]` 구간의 일봉. 오래된 순으로 반환합니다.
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ProviderError>;

    /// 현재가.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError>;
}

/// EPS 예측치 제공자.
#[async_trait]
pub trait EpsForecastProvider: Send + Sync {
    /// 당해 연도 컨센서스 EPS. 커버리지가 없으면 `None`.
    async fn fetch_eps(&self, code: &str) -> Result<Option<Decimal>, ProviderError>;

    /// 여러 종목을 조회합니다. 값이 없는 종목은 결과에서 빠집니다.
    async fn fetch_eps_batch(&self, codes: &[String]) -> HashMap<String, Decimal> {
        let mut out = HashMap::new();
        for code in codes {
            if let Ok(Some(eps)) = self.fetch_eps(code).await {
                out.insert(code.clone(), eps);
            }
        }
        out
    }
}

/// 일봉과 시세 소스를 하나로 묶습니다.
pub struct CompositeMarketData<K, Q> {
    klines: K,
    quotes: Q,
}

impl<K, Q> CompositeMarketData<K, Q> {
    pub fn new(klines: K, quotes: Q) -> Self {
        Self { klines, quotes }
    }
}

#[async_trait]
impl<K, Q> MarketDataProvider for CompositeMarketData<K, Q>
where
    K: MarketDataProvider,
    Q: MarketDataProvider,
{
    fn name(&self) -> &str {
        "composite"
    }

    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        self.klines.fetch_daily_bars(symbol, start, end).await
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        self.quotes.fetch_quote(symbol).await
    }
}

/// 숫자 문자열 또는 JSON 숫자를 Decimal로 변환합니다.
pub(crate) fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok().or_else(|| {
            n.as_f64().and_then(|f| Decimal::try_from(f).ok())
        }),
        _ => None,
    }
}
