//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tidewatch_core::UpdateStatus;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 시도 횟수
    pub total: usize,
    /// 새 일봉을 받은 종목 수
    pub new_data: usize,
    /// 이미 최신이거나 새 일봉이 없는 종목 수
    pub no_new_data: usize,
    /// 실패 횟수 (타임아웃 포함)
    pub failed: usize,
    /// 실패 중 타임아웃
    pub timed_out: usize,
    /// 저장된 총 일봉 수
    pub total_klines: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공 = 새 데이터 + 변경 없음.
    pub fn success(&self) -> usize {
        self.new_data + self.no_new_data
    }

    pub fn status(&self) -> UpdateStatus {
        UpdateStatus::from_counts(self.success(), self.total)
    }

    /// 다른 페이지의 통계를 합칩니다.
    pub fn merge(&mut self, other: &CollectionStats) {
        self.total += other.total;
        self.new_data += other.new_data;
        self.no_new_data += other.no_new_data;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        self.total_klines += other.total_klines;
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success() as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            new_data = self.new_data,
            no_new_data = self.no_new_data,
            failed = self.failed,
            timed_out = self.timed_out,
            total_klines = self.total_klines,
            status = %self.status(),
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_counts() {
        let mut stats = CollectionStats {
            total: 5,
            new_data: 3,
            no_new_data: 1,
            failed: 1,
            timed_out: 1,
            ..Default::default()
        };
        assert_eq!(stats.success(), 4);
        assert_eq!(stats.status(), UpdateStatus::Partial);

        stats.merge(&CollectionStats {
            total: 1,
            new_data: 1,
            ..Default::default()
        });
        assert_eq!(stats.total, 6);
        assert_eq!(stats.success(), 5);
    }

    #[test]
    fn test_empty_batch_is_success() {
        let stats = CollectionStats::new();
        assert_eq!(stats.status(), UpdateStatus::Success);
        assert_eq!(stats.success_rate(), 0.0);
    }
}
