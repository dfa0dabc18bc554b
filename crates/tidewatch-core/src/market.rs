//! 시장 현지 시간 헬퍼.
//!
//! 모든 신선도 타임스탬프는 UTC로 저장/비교하고, 현지 시간(Asia/Shanghai)은
//! 장중 판단과 일자 키 계산에만 사용합니다. 휴장일과 반일장은 고려하지 않습니다.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// 시장 시간대.
pub const MARKET_TZ: Tz = chrono_tz::Asia::Shanghai;

/// 장중으로 보는 현지 시각(시) 범위, 양끝 포함.
pub const SESSION_HOURS: std::ops::RangeInclusive<u32> = 9..=14;

/// UTC 시각을 시장 현지 날짜로 변환합니다.
pub fn local_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&MARKET_TZ).date_naive()
}

/// UTC 시각의 시장 현지 시(hour).
pub fn local_hour(now: DateTime<Utc>) -> u32 {
    now.with_timezone(&MARKET_TZ).hour()
}

/// 현지 시각이 장중 범위(9~14시)에 있는지 여부.
pub fn is_session_hour(now: DateTime<Utc>) -> bool {
    SESSION_HOURS.contains(&local_hour(now))
}

/// 현지 날짜의 0시를 UTC로 변환합니다.
pub fn local_midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    // Asia/Shanghai에는 서머타임이 없어 항상 단일 값
    MARKET_TZ
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc())
}

/// 주말 여부.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
