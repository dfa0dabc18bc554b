//! 기술적 지표 모듈.
//!
//! # 사용 예시
//!
//! ```ignore
//! use tidewatch_analytics::IndicatorEngine;
//!
//! let engine = IndicatorEngine::new();
//! let ema144 = engine.ema(&closes, 144);
//! let triad = engine.trend_emas(&closes, Timeframe::D2);
//! ```

pub mod trend;

use rust_decimal::Decimal;
use thiserror::Error;
use tidewatch_core::{Timeframe, TrendEmas};

pub use trend::{EmaParams, TrendIndicators};

/// 지표 계산 오류.
///
/// 데이터 부족은 오류가 아니라 `None`으로 표현합니다.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 통합 지표 엔진.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndicatorEngine {
    trend: TrendIndicators,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 마지막 EMA 값. 데이터가 부족하거나 기간이 0이면 `None`.
    pub fn ema(&self, prices: &[Decimal], period: usize) -> Option<Decimal> {
        self.trend
            .ema(prices, EmaParams::new(period))
            .ok()
            .flatten()
    }

    /// 타임프레임별 추세 EMA 3종.
    ///
    /// 장기 기간 이상의 데이터가 있을 때만 계산하고, 아니면 모두 `None`입니다.
    pub fn trend_emas(&self, prices: &[Decimal], timeframe: Timeframe) -> TrendEmas {
        if prices.len() < timeframe.trend_min_points() {
            return TrendEmas::default();
        }

        let [short, medium, long] = timeframe.trend_periods();
        TrendEmas {
            short: self.ema(prices, short),
            medium: self.ema(prices, medium),
            long: self.ema(prices, long),
        }
    }
}
