//! 지표 스냅샷과 분류 결과.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Timeframe;

/// 타임프레임별 추세 EMA 3종 (단기, 중기, 장기).
///
/// 기간은 [`Timeframe::trend_periods`]를 따릅니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendEmas {
    pub short: Option<Decimal>,
    pub medium: Option<Decimal>,
    pub long: Option<Decimal>,
}

impl TrendEmas {
    /// 세 값이 모두 존재하는지 여부.
    pub fn is_complete(&self) -> bool {
        self.short.is_some() && self.medium.is_some() && self.long.is_some()
    }
}

/// 이름이 붙은 EMA 값 (예: `ema21`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEma {
    pub name: String,
    pub period: usize,
    pub value: Option<Decimal>,
}

/// (symbol, timeframe) 단위 지표 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub current_price: Decimal,
    pub ema144: Option<Decimal>,
    pub ema188: Option<Decimal>,
    pub trend: TrendEmas,
    pub eps_forecast: Option<Decimal>,
    /// 계산 시각 (UTC). 캐시 신선도 판단 기준.
    pub created_at: DateTime<Utc>,
}

impl MonitorSnapshot {
    /// 캐시 키.
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey::new(self.symbol.clone(), self.timeframe)
    }

    /// 타임프레임 기간으로 이름 붙인 추세 EMA 목록.
    pub fn named_trend_emas(&self) -> Vec<NamedEma> {
        let [s, m, l] = self.timeframe.trend_periods();
        [(s, self.trend.short), (m, self.trend.medium), (l, self.trend.long)]
            .into_iter()
            .map(|(period, value)| NamedEma {
                name: format!("ema{}", period),
                period,
                value,
            })
            .collect()
    }

    /// 기준 시각에 대한 스냅샷 경과 시간.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// 스냅샷 캐시 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl SnapshotKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.timeframe)
    }
}

/// 밸류에이션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationStatus {
    /// 저평가
    Undervalued,
    /// 적정
    Normal,
    /// 고평가
    Overvalued,
    /// 알 수 없음 (EPS 없음)
    Unknown,
}

impl ValuationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undervalued => "undervalued",
            Self::Normal => "normal",
            Self::Overvalued => "overvalued",
            Self::Unknown => "unknown",
        }
    }
}

/// 기술적 상태 (EMA144/EMA188 밴드 기준).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalStatus {
    /// 밴드 하단 이탈
    Breakdown,
    /// 밴드 내부 (분할 매수 구간)
    Accumulate,
    /// 신호 없음
    NoSignal,
}

impl TechnicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakdown => "breakdown",
            Self::Accumulate => "accumulate",
            Self::NoSignal => "no_signal",
        }
    }
}

/// 추세.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// 정배열 (단기 > 중기 > 장기)
    Bullish,
    /// 역배열 (단기 < 중기 < 장기)
    Bearish,
    /// 횡보
    Choppy,
    /// 알 수 없음 (값 누락)
    Unknown,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Choppy => "choppy",
            Self::Unknown => "unknown",
        }
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(ValuationStatus, TechnicalStatus, Trend);

/// 합리 가격 구간 `[eps * pe_min, eps * pe_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// 대시보드용 모니터링 행.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRow {
    pub code: String,
    pub name: String,
    pub timeframe: Timeframe,
    pub current_price: Decimal,
    pub ema144: Option<Decimal>,
    pub ema188: Option<Decimal>,
    pub trend_emas: Vec<NamedEma>,
    pub eps_forecast: Option<Decimal>,
    pub reasonable_pe_min: Decimal,
    pub reasonable_pe_max: Decimal,
    pub reasonable_price: Option<PriceRange>,
    pub valuation_status: ValuationStatus,
    pub technical_status: TechnicalStatus,
    pub trend: Trend,
    pub snapshot_at: DateTime<Utc>,
    /// 캐시에서 읽었는지 여부
    pub from_cache: bool,
}
