//! 모니터링 타임프레임 정의.
//!
//! 타임프레임은 샘플링 주기가 아니라 추세 EMA 조합을 고르는 구분값입니다.
//! 지표는 항상 저장된 일봉으로 계산합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 모니터링 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1일 구분 (EMA 5/10/20)
    #[serde(rename = "1d")]
    D1,
    /// 2일 구분 (EMA 10/30/60)
    #[serde(rename = "2d")]
    D2,
    /// 3일 구분 (EMA 7/21/42)
    #[serde(rename = "3d")]
    D3,
}

impl Timeframe {
    /// 모든 타임프레임.
    pub const ALL: [Timeframe; 3] = [Timeframe::D1, Timeframe::D2, Timeframe::D3];

    /// 문자열 표현 ("1d", "2d", "3d").
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::D1 => "1d",
            Timeframe::D2 => "2d",
            Timeframe::D3 => "3d",
        }
    }

    /// 추세 판단용 EMA 기간 (단기, 중기, 장기).
    pub fn trend_periods(&self) -> [usize; 3] {
        match self {
            Timeframe::D1 => [5, 10, 20],
            Timeframe::D2 => [10, 30, 60],
            Timeframe::D3 => [7, 21, 42],
        }
    }

    /// 추세 EMA 계산에 필요한 최소 데이터 수 (장기 기간과 동일).
    pub fn trend_min_points(&self) -> usize {
        self.trend_periods()[2]
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::D1
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Timeframe::D1),
            "2d" => Ok(Timeframe::D2),
            "3d" => Ok(Timeframe::D3),
            other => Err(CoreError::InvalidInput(format!("Invalid timeframe: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse_roundtrip() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
        assert_eq!("2D".parse::<Timeframe>().unwrap(), Timeframe::D2);
        assert!("5d".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_trend_periods() {
        assert_eq!(Timeframe::D1.trend_periods(), [5, 10, 20]);
        assert_eq!(Timeframe::D2.trend_min_points(), 60);
        assert_eq!(Timeframe::D3.trend_min_points(), 42);
    }

    #[test]
    fn test_serde_representation() {
        let json = serde_json::to_string(&Timeframe::D3).unwrap();
        assert_eq!(json, "\"3d\"");
        let tf: Timeframe = serde_json::from_str("\"2d\"").unwrap();
        assert_eq!(tf, Timeframe::D2);
    }
}
