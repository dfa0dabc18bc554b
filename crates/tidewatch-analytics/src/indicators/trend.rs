//! 추세 지표 (EMA).
//!
//! EMA는 첫 값을 시드로 하는 재귀식으로 계산합니다.
//!
//! ```text
//! alpha  = 2 / (period + 1)
//! ema[0] = price[0]
//! ema[t] = price[t] * alpha + ema[t-1] * (1 - alpha)
//! ```
//!
//! 부동소수점 대신 `Decimal`을 사용하므로 같은 입력이면 항상 같은 결과가 나옵니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};

/// 출력 소수 자릿수.
pub const OUTPUT_SCALE: u32 = 2;

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl EmaParams {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// 평활 계수 `2 / (period + 1)`.
    pub fn alpha(&self) -> Decimal {
        dec!(2) / Decimal::from(self.period + 1)
    }
}

/// 추세 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendIndicators;

impl TrendIndicators {
    pub fn new() -> Self {
        Self
    }

    /// 전체 EMA 시계열 (반올림 없음).
    ///
    /// 입력과 같은 길이의 벡터를 반환하며, 첫 원소는 첫 가격과 같습니다.
    pub fn ema_series(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Vec<Decimal>> {
        if params.period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        let alpha = params.alpha();
        let keep = Decimal::ONE - alpha;

        let mut result = Vec::with_capacity(prices.len());
        let mut iter = prices.iter();
        let Some(first) = iter.next() else {
            return Ok(result);
        };

        let mut prev = *first;
        result.push(prev);
        for price in iter {
            prev = *price * alpha + prev * keep;
            result.push(prev);
        }

        Ok(result)
    }

    /// 마지막 EMA 값 (소수 둘째 자리 반올림).
    ///
    /// 데이터 수가 기간보다 적으면 `None`을 반환합니다. 에러가 아닙니다.
    pub fn ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Option<Decimal>> {
        if params.period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if prices.len() < params.period {
            return Ok(None);
        }

        let series = self.ema_series(prices, params)?;
        Ok(series.last().map(|v| v.round_dp(OUTPUT_SCALE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_ema_seeded_from_first_value() {
        let ti = TrendIndicators::new();
        let series = ti
            .ema_series(&prices(&[1, 2, 3, 4, 5]), EmaParams::new(5))
            .unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], dec!(1));
        // alpha = 1/3 → 1 + (2-1)/3
        assert_eq!(series[1].round_dp(4), dec!(1.3333));
    }

    #[test]
    fn test_ema_last_value_rounded() {
        let ti = TrendIndicators::new();
        // 1, 1.3333, 1.8889, 2.5926, 3.3951
        let ema = ti.ema(&prices(&[1, 2, 3, 4, 5]), EmaParams::new(5)).unwrap();
        assert_eq!(ema, Some(dec!(3.40)));
    }

    #[test]
    fn test_ema_period_one_is_last_price() {
        let ti = TrendIndicators::new();
        let ema = ti
            .ema(&[dec!(10.123), dec!(11.456)], EmaParams::new(1))
            .unwrap();
        assert_eq!(ema, Some(dec!(11.46)));
    }

    #[test]
    fn test_ema_insufficient_data_is_absent() {
        let ti = TrendIndicators::new();
        assert_eq!(ti.ema(&prices(&[1, 2, 3]), EmaParams::new(5)).unwrap(), None);
        assert_eq!(ti.ema(&[], EmaParams::new(1)).unwrap(), None);
    }

    #[test]
    fn test_ema_zero_period_is_error() {
        let ti = TrendIndicators::new();
        assert!(ti.ema(&prices(&[1, 2]), EmaParams::new(0)).is_err());
    }

    #[test]
    fn test_ema_constant_series() {
        let ti = TrendIndicators::new();
        let flat = vec![dec!(12.5); 200];
        assert_eq!(ti.ema(&flat, EmaParams::new(188)).unwrap(), Some(dec!(12.50)));
    }
}
