//! 모니터링 대상 종목.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Timeframe;

/// 기본 합리 PER 하한.
pub const DEFAULT_PE_MIN: Decimal = dec!(15);
/// 기본 합리 PER 상한.
pub const DEFAULT_PE_MAX: Decimal = dec!(20);

/// 관심 종목 (watch-list 항목).
///
/// 코어에서는 읽기 전용입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// 거래소 구분이 포함된 종목 코드 (유일)
    pub code: String,
    /// 종목명
    pub name: String,
    /// 지표 계산 타임프레임
    pub timeframe: Timeframe,
    /// 합리 PER 하한
    pub reasonable_pe_min: Decimal,
    /// 합리 PER 상한
    pub reasonable_pe_max: Decimal,
    /// 활성화 여부
    pub enabled: bool,
}

impl Instrument {
    /// 기본 PER 구간으로 활성 종목을 생성합니다.
    pub fn new(code: impl Into<String>, name: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            timeframe,
            reasonable_pe_min: DEFAULT_PE_MIN,
            reasonable_pe_max: DEFAULT_PE_MAX,
            enabled: true,
        }
    }

    /// PER 구간을 지정합니다.
    pub fn with_pe_band(mut self, min: Decimal, max: Decimal) -> Self {
        self.reasonable_pe_min = min;
        self.reasonable_pe_max = max;
        self
    }

    /// 비활성 상태로 만듭니다.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// 전체 종목 유니버스의 한 항목.
///
/// `last_update`는 동기화 페이지가 마지막으로 이 종목을 처리한 시각입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSymbol {
    pub code: String,
    pub name: String,
    pub last_update: Option<DateTime<Utc>>,
}

impl TrackedSymbol {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            last_update: None,
        }
    }
}
