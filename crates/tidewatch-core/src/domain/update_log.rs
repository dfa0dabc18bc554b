//! 일일 업데이트 로그.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 업데이트 결과 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// 전체 성공
    Success,
    /// 일부 실패
    Partial,
}

impl UpdateStatus {
    /// 성공 수 / 전체 수로 상태 결정.
    pub fn from_counts(success_count: usize, total_count: usize) -> Self {
        if success_count == total_count {
            Self::Success
        } else {
            Self::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            other => Err(CoreError::Parse(format!("Unknown update status: {}", other))),
        }
    }
}

/// 하루 한 건의 업데이트 기록.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLog {
    /// 시장 현지 기준 날짜 (유일)
    pub update_date: NaiveDate,
    pub success_count: usize,
    pub total_count: usize,
    pub status: UpdateStatus,
    pub created_at: DateTime<Utc>,
}
