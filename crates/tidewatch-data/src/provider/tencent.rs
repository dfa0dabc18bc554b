//! 텐센트 증권 일봉 클라이언트.
//!
//! `GET /appstock/app/fqkline/get?param=sh600000,day,2024-01-01,2024-12-31,640,qfq`
//!
//! 응답의 `data.<prefixed code>.qfqday` 배열은 `[date, open, close, high, low, volume, ...]`
//! 형식입니다. 요청 한 번에 최대 640개까지만 돌려주므로 연도 단위로 나눠 요청합니다.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tidewatch_core::{bare_code, prefixed_lower, OhlcvBar, Quote};
use tracing::{debug, instrument};

use super::{json_decimal, MarketDataProvider, ProviderError};

/// 요청당 최대 봉 수.
const MAX_BARS_PER_REQUEST: usize = 640;

/// 텐센트 일봉 클라이언트.
#[derive(Debug, Clone)]
pub struct TencentKlineClient {
    client: Client,
    base_url: String,
}

impl TencentKlineClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://web.ifzq.gtimg.cn";

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 연도 경계로 구간을 나눕니다.
    fn year_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
        let mut chunks = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            let year_end = NaiveDate::from_ymd_opt(cursor.year(), 12, 31).unwrap_or(end);
            let chunk_end = year_end.min(end);
            chunks.push((cursor, chunk_end));
            match chunk_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        chunks
    }

    async fn fetch_chunk(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        let code = prefixed_lower(symbol);
        let url = format!("{}/appstock/app/fqkline/get", self.base_url);
        let param = format!(
            "{},day,{},{},{},qfq",
            code,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            MAX_BARS_PER_REQUEST
        );

        let response = self
            .client
            .get(&url)
            .query(&[("param", param.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        parse_kline_response(symbol, &code, &body)
    }
}

/// `fqkline` 응답을 일봉으로 변환합니다.
pub(crate) fn parse_kline_response(
    symbol: &str,
    prefixed: &str,
    body: &Value,
) -> Result<Vec<OhlcvBar>, ProviderError> {
    if let Some(code) = body.get("code").and_then(Value::as_i64) {
        if code != 0 {
            let msg = body.get("msg").and_then(Value::as_str).unwrap_or_default();
            return Err(ProviderError::Api {
                status: 200,
                message: format!("code={} {}", code, msg),
            });
        }
    }

    let Some(entry) = body.get("data").and_then(|d| d.get(prefixed)) else {
        return Err(ProviderError::NotFound(symbol.to_string()));
    };

    // 복권 데이터가 없는 종목은 `day`만 내려옵니다
    let rows = entry
        .get("qfqday")
        .or_else(|| entry.get("day"))
        .and_then(Value::as_array);

    let Some(rows) = rows else {
        return Ok(Vec::new());
    };

    let code = bare_code(symbol);
    rows.iter()
        .map(|row| parse_kline_row(code, row))
        .collect()
}

fn parse_kline_row(symbol: &str, row: &Value) -> Result<OhlcvBar, ProviderError> {
    let fields = row
        .as_array()
        .filter(|f| f.len() >= 6)
        .ok_or_else(|| ProviderError::Parse(format!("잘못된 일봉 행: {}", row)))?;

    let date = fields[0]
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| ProviderError::Parse(format!("잘못된 날짜: {}", fields[0])))?;

    let num = |i: usize| {
        json_decimal(&fields[i])
            .ok_or_else(|| ProviderError::Parse(format!("잘못된 숫자: {} ({})", fields[i], date)))
    };

    let open = num(1)?;
    let close = num(2)?;
    let high = num(3)?;
    let low = num(4)?;
    let volume = num(5)?;
    // 거래대금은 이 엔드포인트가 주지 않음
    Ok(OhlcvBar::new(
        symbol,
        date,
        open,
        close,
        high,
        low,
        volume,
        Decimal::ZERO,
    ))
}

#[async_trait]
impl MarketDataProvider for TencentKlineClient {
    fn name(&self) -> &str {
        "tencent"
    }

    #[instrument(skip(self), fields(provider = "tencent"))]
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        let mut merged = BTreeMap::new();
        for (chunk_start, chunk_end) in Self::year_chunks(start, end) {
            for bar in self.fetch_chunk(symbol, chunk_start, chunk_end).await? {
                if bar.date >= start && bar.date <= end {
                    merged.insert(bar.date, bar);
                }
            }
        }

        debug!(symbol = %symbol, bars = merged.len(), "일봉 수신");
        Ok(merged.into_values().collect())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        Err(ProviderError::NotFound(format!(
            "tencent 클라이언트는 시세를 제공하지 않음: {}",
            symbol
        )))
    }
}
