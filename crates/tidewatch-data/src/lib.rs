//! 데이터 저장 및 외부 데이터 소스.
//!
//! 이 crate는 다음을 제공합니다:
//! - PostgreSQL 저장소 (일봉, 스냅샷, 업데이트 로그, 종목 목록, EPS 캐시)
//! - Redis 스냅샷 캐시
//! - 테스트용 메모리 저장소
//! - 텐센트/쉐추/동화순 클라이언트

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    BlockingPool, CachedEpsProvider, CompositeMarketData, EpsForecastProvider,
    MarketDataProvider, ProviderError, TencentKlineClient, ThsEpsClient, XueqiuQuoteClient,
};

pub use storage::{
    BarStore, Database, DatabaseConfig, EpsCacheStore, InstrumentStore, MemoryBarStore,
    MemoryEpsCacheStore, MemoryInstrumentStore, MemorySnapshotStore, MemoryUpdateLogStore,
    PgBarStore, PgEpsCacheStore, PgInstrumentStore, PgSnapshotStore, PgUpdateLogStore,
    RedisCache, RedisSnapshotStore, SnapshotStore, UpdateLogStore, UpsertSummary,
};
