//! 갱신 필요 여부 판단.
//!
//! 모든 판단은 `latest_dates_batch` 한 번의 조회로 계산합니다.

use chrono::Duration;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tidewatch_core::config::SyncScope;
use tidewatch_core::{market, SharedClock, TrackedSymbol};
use tidewatch_data::{BarStore, InstrumentStore};
use tracing::{debug, info};

use crate::Result;

/// 정기 갱신을 할지 여부와 이유.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshDecision {
    pub due: bool,
    pub reason: RefreshReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshReason {
    /// 활성 종목 없음
    NoInstruments,
    /// 어떤 종목에도 일봉이 없음
    ColdStart,
    /// 가장 오래된 종목의 마지막 일봉이 24시간 이상 지남
    Stale { hours: f64 },
    /// 장중인데 오늘 일봉이 아직 없음
    SessionCatchUp,
    /// 최근 데이터 있음
    Fresh { hours: f64 },
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInstruments => write!(f, "활성화된 관심 종목 없음"),
            Self::ColdStart => write!(f, "일봉 데이터 없음, 초기화 필요"),
            Self::Stale { hours } => write!(f, "마지막 일봉 이후 {:.1}시간 경과", hours),
            Self::SessionCatchUp => write!(f, "장중, 오늘 일봉 미수집"),
            Self::Fresh { hours } => write!(f, "{:.1}시간 이내 갱신됨", hours),
        }
    }
}

impl RefreshDecision {
    fn due(reason: RefreshReason) -> Self {
        Self { due: true, reason }
    }

    fn skip(reason: RefreshReason) -> Self {
        Self { due: false, reason }
    }
}

/// 종목별 최신 일봉 날짜로 갱신 대상을 고릅니다.
#[derive(Clone)]
pub struct StalenessDetector {
    instruments: Arc<dyn InstrumentStore>,
    bars: Arc<dyn BarStore>,
    clock: SharedClock,
}

impl StalenessDetector {
    pub fn new(
        instruments: Arc<dyn InstrumentStore>,
        bars: Arc<dyn BarStore>,
        clock: SharedClock,
    ) -> Self {
        Self {
            instruments,
            bars,
            clock,
        }
    }

    /// 범위에 해당하는 종목 코드.
    pub async fn universe(&self, scope: SyncScope) -> Result<Vec<String>> {
        let codes = match scope {
            SyncScope::Watchlist => self
                .instruments
                .enabled_instruments()
                .await?
                .into_iter()
                .map(|i| i.code)
                .collect(),
            SyncScope::Universe => self
                .instruments
                .tracked_symbols()
                .await?
                .into_iter()
                .map(|s: TrackedSymbol| s.code)
                .collect(),
        };
        Ok(codes)
    }

    /// 일봉이 없거나 마지막 일봉이 `days`일 이상 뒤처진 종목.
    pub async fn due_symbols(&self, scope: SyncScope, days: i64) -> Result<Vec<String>> {
        let codes = self.universe(scope).await?;
        let latest = self.bars.latest_dates_batch(&codes).await?;
        let today = self.clock.market_today();

        let due: Vec<String> = codes
            .into_iter()
            .filter(|code| match latest.get(code) {
                None => true,
                Some(date) => (today - *date).num_days() >= days,
            })
            .collect();

        debug!(scope = ?scope, days = days, due = due.len(), "갱신 대상 선정");
        Ok(due)
    }

    /// 정기 작업에서 갱신을 실행할지 판단합니다.
    pub async fn should_refresh(&self) -> Result<RefreshDecision> {
        let codes = self.universe(SyncScope::Watchlist).await?;
        if codes.is_empty() {
            return Ok(RefreshDecision::skip(RefreshReason::NoInstruments));
        }

        let latest = self.bars.latest_dates_batch(&codes).await?;
        let decision = decide(&latest, self.clock.now());
        info!(due = decision.due, reason = %decision.reason, "갱신 필요 여부");
        Ok(decision)
    }
}

fn decide(
    latest: &HashMap<String, chrono::NaiveDate>,
    now: chrono::DateTime<chrono::Utc>,
) -> RefreshDecision {
    let Some(most_stale) = latest.values().min().copied() else {
        return RefreshDecision::due(RefreshReason::ColdStart);
    };
    let freshest = latest.values().max().copied().unwrap_or(most_stale);

    if market::is_session_hour(now) && freshest < market::local_date(now) {
        return RefreshDecision::due(RefreshReason::SessionCatchUp);
    }

    let age = now - market::local_midnight_utc(most_stale);
    let hours = age.num_minutes() as f64 / 60.0;
    if age >= Duration::hours(24) {
        return RefreshDecision::due(RefreshReason::Stale { hours });
    }

    RefreshDecision::skip(RefreshReason::Fresh { hours })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn latest(entries: &[(&str, NaiveDate)]) -> HashMap<String, NaiveDate> {
        entries.iter().map(|(c, d)| (c.to_string(), *d)).collect()
    }

    #[test]
    fn test_cold_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap();
        assert_eq!(
            decide(&HashMap::new(), now),
            RefreshDecision::due(RefreshReason::ColdStart)
        );
    }

    #[test]
    fn test_most_stale_over_24h() {
        // 현지 2024-03-05 20:00, 가장 오래된 종목은 03-04 → 44시간
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let decision = decide(&latest(&[("A", d(4)), ("B", d(5))]), now);
        assert!(decision.due);
        assert!(matches!(decision.reason, RefreshReason::Stale { .. }));
    }

    #[test]
    fn test_session_catch_up() {
        // 현지 2024-03-05 10:00, 최신 일봉이 어제
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap();
        let decision = decide(&latest(&[("A", d(4)), ("B", d(4))]), now);
        assert_eq!(decision, RefreshDecision::due(RefreshReason::SessionCatchUp));
    }

    #[test]
    fn test_stale_outside_session() {
        // 현지 2024-03-05 08:00, 03-04 0시 기준 32시간
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let decision = decide(&latest(&[("A", d(4))]), now);
        assert_eq!(decision, RefreshDecision::due(RefreshReason::Stale { hours: 32.0 }));
    }

    #[test]
    fn test_fresh_outside_session() {
        // 현지 2024-03-05 20:00, 모두 오늘 일봉 보유
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let decision = decide(&latest(&[("A", d(5)), ("B", d(5))]), now);
        assert!(!decision.due);
        assert!(matches!(decision.reason, RefreshReason::Fresh { .. }));
    }

    #[test]
    fn test_fresh_during_session() {
        // 현지 2024-03-05 10:00, 오늘 일봉 이미 수집
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap();
        assert!(!decide(&latest(&[("A", d(5))]), now).due);
    }
}
