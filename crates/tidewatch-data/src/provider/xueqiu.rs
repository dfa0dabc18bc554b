//! 쉐추(雪球) 실시간 시세 클라이언트.
//!
//! `GET /v5/stock/quote.json?symbol=SH600000&extend=detail`, `xq_a_token` 쿠키 필요.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tidewatch_core::{bare_code, prefixed_upper, OhlcvBar, Quote};
use tracing::{debug, instrument};

use super::{json_decimal, MarketDataProvider, ProviderError};

#[derive(Debug, Clone)]
pub struct XueqiuQuoteClient {
    client: Client,
    base_url: String,
}

impl XueqiuQuoteClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://stock.xueqiu.com";

    pub fn new(
        base_url: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&format!("xq_a_token={};", token))
            .map_err(|e| ProviderError::Parse(format!("잘못된 토큰: {}", e)))?;
        headers.insert(COOKIE, cookie);
        headers.insert(REFERER, HeaderValue::from_static("https://xueqiu.com/"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// `data.quote`에서 시세를 꺼냅니다. 가격이 0 이하이면 오류입니다.
pub(crate) fn parse_quote_response(symbol: &str, body: &Value) -> Result<Quote, ProviderError> {
    let quote = body
        .get("data")
        .and_then(|d| d.get("quote"))
        .filter(|q| !q.is_null())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    let price = quote
        .get("current")
        .and_then(json_decimal)
        .ok_or_else(|| ProviderError::Parse(format!("현재가 없음: {}", symbol)))?;

    if price <= Decimal::ZERO {
        return Err(ProviderError::Parse(format!(
            "유효하지 않은 현재가: {} ({})",
            price, symbol
        )));
    }

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        dividend_ttm: quote.get("dividend").and_then(json_decimal),
        dividend_yield_ttm: quote.get("dividend_yield").and_then(json_decimal),
    })
}

#[async_trait]
impl MarketDataProvider for XueqiuQuoteClient {
    fn name(&self) -> &str {
        "xueqiu"
    }

    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        Err(ProviderError::NotFound(format!(
            "xueqiu 클라이언트는 일봉을 제공하지 않음: {}",
            symbol
        )))
    }

    #[instrument(skip(self), fields(provider = "xueqiu"))]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let url = format!("{}/v5/stock/quote.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", prefixed_upper(symbol).as_str()), ("extend", "detail")])
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
        let quote = parse_quote_response(bare_code(symbol), &body)?;
        debug!(symbol = %symbol, price = %quote.price, "시세 수신");
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_quote() {
        let body = json!({
            "data": {"quote": {"current": 7.25, "dividend": 0.41, "dividend_yield": 5.66}},
            "error_code": 0
        });
        let quote = parse_quote_response("600000", &body).unwrap();
        assert_eq!(quote.price, dec!(7.25));
        assert_eq!(quote.dividend_ttm, Some(dec!(0.41)));
        assert_eq!(quote.dividend_yield_ttm, Some(dec!(5.66)));
    }

    #[test]
    fn test_non_positive_price_is_error() {
        let body = json!({"data": {"quote": {"current": 0}}});
        assert!(parse_quote_response("600000", &body).is_err());

        let body = json!({"data": {"quote": null}});
        assert!(matches!(
            parse_quote_response("600000", &body),
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_quote_sends_token_and_prefix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v5/stock/quote.json")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("symbol".into(), "SZ000001".into()),
                mockito::Matcher::UrlEncoded("extend".into(), "detail".into()),
            ]))
            .match_header("cookie", "xq_a_token=abc;")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"data": {"quote": {"current": 10.5}}}).to_string())
            .create_async()
            .await;

        let client = XueqiuQuoteClient::new(server.url(), "abc", Duration::from_secs(5)).unwrap();
        let quote = client.fetch_quote("000001").await.unwrap();

        mock.assert_async().await;
        assert_eq!(quote.symbol, "000001");
        assert_eq!(quote.price, dec!(10.5));
        assert_eq!(quote.dividend_ttm, None);
    }
}
