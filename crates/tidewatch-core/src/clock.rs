//! 시계 추상화.
//!
//! 신선도 판단과 장중 판단은 모두 주입된 시계를 통해 현재 시각을 얻습니다.
//! 테스트에서는 [`ManualClock`]으로 시간을 고정하거나 진행시킵니다.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::market;

/// 현재 시각 제공자.
pub trait Clock: Send + Sync + fmt::Debug {
    /// 현재 UTC 시각.
    fn now(&self) -> DateTime<Utc>;

    /// 시장 현지 기준 오늘 날짜.
    fn market_today(&self) -> NaiveDate {
        market::local_date(self.now())
    }
}

/// 공유 시계 핸들.
pub type SharedClock = Arc<dyn Clock>;

/// 시스템 시계.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// 공유 핸들로 생성합니다.
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작하는 시계.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(now.timestamp_millis()),
        }
    }

    /// 시각을 지정합니다.
    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }

    /// 시각을 앞으로 진행시킵니다.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(31));
        assert_eq!(clock.now(), start + Duration::minutes(31));

        // 01:31 UTC = 09:31 Asia/Shanghai
        assert_eq!(clock.market_today(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }
}
