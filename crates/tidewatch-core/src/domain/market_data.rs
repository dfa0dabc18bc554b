//! 시장 데이터 구조체.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 일봉 (OHLCV).
///
/// (symbol, date) 당 하나만 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// 종목 코드
    pub symbol: String,
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 종가
    pub close: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 거래량
    pub volume: Decimal,
    /// 거래대금
    pub amount: Decimal,
}

impl OhlcvBar {
    /// 새 일봉을 생성합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: Decimal,
        close: Decimal,
        high: Decimal,
        low: Decimal,
        volume: Decimal,
        amount: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open,
            close,
            high,
            low,
            volume,
            amount,
        }
    }

    /// 시가=고가=저가=종가인 단순 봉 (테스트/보간용).
    pub fn flat(symbol: impl Into<String>, date: NaiveDate, price: Decimal) -> Self {
        Self::new(
            symbol,
            date,
            price,
            price,
            price,
            price,
            Decimal::ZERO,
            Decimal::ZERO,
        )
    }
}

/// 실시간 시세.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    /// 현재가
    pub price: Decimal,
    /// 최근 12개월 주당 배당금
    pub dividend_ttm: Option<Decimal>,
    /// 최근 12개월 배당수익률 (%)
    pub dividend_yield_ttm: Option<Decimal>,
}

impl Quote {
    /// 가격만 있는 시세.
    pub fn price_only(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            dividend_ttm: None,
            dividend_yield_ttm: None,
        }
    }
}
