//! 저장소 추상화와 구현.
//!
//! 서비스 계층은 trait 객체(`Arc<dyn BarStore>` 등)만 알고, 실제 백엔드는
//! 시작 시 설정에 따라 고릅니다.
//!
//! | trait | PostgreSQL | Redis | 메모리 |
//! |-------|-----------|-------|--------|
//! | [`BarStore`] | [`PgBarStore`] | - | [`MemoryBarStore`] |
//! | [`SnapshotStore`] | [`PgSnapshotStore`] | [`RedisSnapshotStore`] | [`MemorySnapshotStore`] |
//! | [`UpdateLogStore`] | [`PgUpdateLogStore`] | - | [`MemoryUpdateLogStore`] |
//! | [`InstrumentStore`] | [`PgInstrumentStore`] | - | [`MemoryInstrumentStore`] |
//! | [`EpsCacheStore`] | [`PgEpsCacheStore`] | - | [`MemoryEpsCacheStore`] |

pub mod database;
pub mod eps;
pub mod instrument;
pub mod memory;
pub mod ohlcv;
pub mod redis;
pub mod snapshot;
pub mod update_log;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tidewatch_core::{
    Instrument, MonitorSnapshot, OhlcvBar, SnapshotKey, TrackedSymbol, UpdateLog,
};

use crate::error::Result;

pub use database::{Database, DatabaseConfig};
pub use eps::PgEpsCacheStore;
pub use instrument::PgInstrumentStore;
pub use memory::{
    MemoryBarStore, MemoryEpsCacheStore, MemoryInstrumentStore, MemorySnapshotStore,
    MemoryUpdateLogStore,
};
pub use ohlcv::PgBarStore;
pub use redis::{RedisCache, RedisSnapshotStore};
pub use snapshot::PgSnapshotStore;
pub use update_log::PgUpdateLogStore;

/// `upsert_all` 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// 1개 이상 봉을 저장한 종목 수
    pub symbols_written: usize,
    /// 제출된 종목 수 (빈 배열 포함)
    pub symbols_submitted: usize,
    /// 저장한 총 봉 수
    pub total_bars: usize,
}

/// 일봉 시계열 저장소.
///
/// (symbol, date) 당 한 행이며, 같은 날짜를 다시 넣으면 값 컬럼을 모두 덮어씁니다.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// 한 종목의 일봉을 upsert하고 처리한 행 수를 반환합니다.
    async fn upsert_batch(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<usize>;

    /// 여러 종목의 일봉을 한 번에 upsert합니다.
    async fn upsert_all(&self, batches: &HashMap<String, Vec<OhlcvBar>>) -> Result<UpsertSummary>;

    /// 종목의 마지막 일봉 날짜.
    async fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>>;

    /// 여러 종목의 마지막 일봉 날짜. 데이터가 없는 종목은 결과에 없습니다.
    async fn latest_dates_batch(&self, symbols: &[String]) -> Result<HashMap<String, NaiveDate>>;

    /// 최근 `limit`개 일봉 (오래된 것부터).
    async fn read(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>>;

    /// 여러 종목의 최근 `limit`개 일봉 (종목별 오래된 것부터).
    async fn read_batch(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<HashMap<String, Vec<OhlcvBar>>>;

    /// 날짜 범위 조회 (양끝 포함, 오래된 것부터).
    async fn read_range(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>>;
}

/// 지표 스냅샷 캐시.
///
/// `now - created_at <= max_age`인 행만 유효합니다. 오래된 행은 에러가 아니라 미스입니다.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &SnapshotKey, max_age: Duration) -> Result<Option<MonitorSnapshot>>;

    async fn get_batch(
        &self,
        keys: &[SnapshotKey],
        max_age: Duration,
    ) -> Result<HashMap<SnapshotKey, MonitorSnapshot>>;

    /// 키당 한 행으로 upsert하며 `created_at`은 저장 시각으로 갱신합니다.
    async fn save_batch(&self, snapshots: &[MonitorSnapshot]) -> Result<usize>;

    /// 보존 기간보다 오래된 행을 삭제합니다.
    async fn clean_old(&self, retention: Duration) -> Result<u64>;
}

/// 일일 업데이트 로그 저장소.
#[async_trait]
pub trait UpdateLogStore: Send + Sync {
    /// `update_date` 기준 upsert.
    async fn upsert(&self, log: &UpdateLog) -> Result<()>;

    async fn get(&self, date: NaiveDate) -> Result<Option<UpdateLog>>;

    /// 가장 최근 날짜의 기록.
    async fn latest(&self) -> Result<Option<UpdateLog>>;
}

/// 종목 목록 저장소 (읽기 전용 관심 종목 + 전체 유니버스).
#[async_trait]
pub trait InstrumentStore: Send + Sync {
    /// 활성화된 관심 종목.
    async fn enabled_instruments(&self) -> Result<Vec<Instrument>>;

    /// 전체 유니버스.
    async fn tracked_symbols(&self) -> Result<Vec<TrackedSymbol>>;

    /// 갱신 대기 종목 (미갱신 우선, 이후 오래된 순).
    ///
    /// `last_update`가 없거나 `older_than`보다 오래된 종목만 포함합니다.
    async fn pending_update(&self, limit: usize, older_than: Duration) -> Result<Vec<TrackedSymbol>>;

    /// 처리한 종목의 `last_update`를 현재 시각으로 갱신합니다.
    async fn mark_updated(&self, codes: &[String]) -> Result<u64>;
}

/// EPS 예측값 캐시.
#[async_trait]
pub trait EpsCacheStore: Send + Sync {
    /// TTL 이내의 값만 반환합니다.
    async fn get_batch(&self, codes: &[String], ttl: Duration) -> Result<HashMap<String, Decimal>>;

    async fn set(&self, code: &str, eps: Decimal) -> Result<()>;

    async fn clean_old(&self, ttl: Duration) -> Result<u64>;
}

impl UpsertSummary {
    /// 제출 맵으로부터 요약을 계산합니다.
    pub fn from_batches(batches: &HashMap<String, Vec<OhlcvBar>>) -> Self {
        Self {
            symbols_written: batches.values().filter(|b| !b.is_empty()).count(),
            symbols_submitted: batches.len(),
            total_bars: batches.values().map(Vec::len).sum(),
        }
    }
}
