//! 서비스 의존성 묶음.
//!
//! 저장소와 Provider는 모두 trait 객체로 보관하며, 실제 백엔드는 시작 시
//! 설정(`cache.backend`)에 따라 고릅니다.

use std::sync::Arc;
use tidewatch_core::config::{AppConfig, CacheBackend};
use tidewatch_core::{SharedClock, SystemClock};
use tidewatch_data::{
    BarStore, BlockingPool, CachedEpsProvider, CompositeMarketData, Database, DatabaseConfig,
    EpsCacheStore, EpsForecastProvider, InstrumentStore, MarketDataProvider, MemorySnapshotStore,
    PgBarStore, PgEpsCacheStore, PgInstrumentStore, PgSnapshotStore, PgUpdateLogStore,
    RedisCache, RedisSnapshotStore, SnapshotStore, TencentKlineClient, ThsEpsClient,
    UpdateLogStore, XueqiuQuoteClient,
};
use tracing::info;

use crate::error::Result;
use crate::limiter::ConcurrencyLimiter;

/// Collector 서비스들이 공유하는 의존성.
#[derive(Clone)]
pub struct CollectorContext {
    pub config: Arc<AppConfig>,
    pub clock: SharedClock,
    pub bars: Arc<dyn BarStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub update_log: Arc<dyn UpdateLogStore>,
    pub instruments: Arc<dyn InstrumentStore>,
    pub eps_cache: Arc<dyn EpsCacheStore>,
    pub market: Arc<dyn MarketDataProvider>,
    /// `eps.enabled = false`이면 `None`
    pub eps: Option<Arc<dyn EpsForecastProvider>>,
    pub limiter: ConcurrencyLimiter,
}

impl CollectorContext {
    /// 데이터베이스에 연결하고 설정에 맞는 백엔드로 컨텍스트를 구성합니다.
    pub async fn connect(config: AppConfig) -> Result<(Self, Database)> {
        let clock = SystemClock::shared();
        let db = Database::connect(&DatabaseConfig::from(&config.database)).await?;
        let pool = db.pool().clone();

        let snapshots: Arc<dyn SnapshotStore> = match config.cache.backend {
            CacheBackend::Postgres => Arc::new(PgSnapshotStore::new(pool.clone(), clock.clone())),
            CacheBackend::Redis => {
                let cache = RedisCache::connect(&config.redis.url).await?;
                Arc::new(RedisSnapshotStore::new(
                    cache,
                    clock.clone(),
                    config.cache.retention(),
                ))
            }
            CacheBackend::Memory => Arc::new(MemorySnapshotStore::new(clock.clone())),
        };
        info!(backend = ?config.cache.backend, "스냅샷 캐시 백엔드 선택");

        let provider = &config.provider;
        let klines = TencentKlineClient::new(&provider.kline_base_url, provider.http_timeout())?;
        let quotes = XueqiuQuoteClient::new(
            &provider.quote_base_url,
            &provider.quote_token,
            provider.http_timeout(),
        )?;
        let market: Arc<dyn MarketDataProvider> =
            Arc::new(CompositeMarketData::new(klines, quotes));

        let eps_cache: Arc<dyn EpsCacheStore> =
            Arc::new(PgEpsCacheStore::new(pool.clone(), clock.clone()));

        let eps: Option<Arc<dyn EpsForecastProvider>> = if config.eps.enabled {
            let pool_size = config.eps.workers;
            let ths = ThsEpsClient::new(
                &provider.eps_base_url,
                provider.http_timeout(),
                BlockingPool::new(pool_size),
            );
            Some(Arc::new(CachedEpsProvider::new(
                Arc::new(ths),
                eps_cache.clone(),
                config.eps.ttl(),
                pool_size,
            )))
        } else {
            None
        };

        let ctx = Self {
            limiter: ConcurrencyLimiter::new(config.sync.concurrency),
            bars: Arc::new(PgBarStore::new(pool.clone())),
            update_log: Arc::new(PgUpdateLogStore::new(pool.clone())),
            instruments: Arc::new(PgInstrumentStore::new(pool, clock.clone())),
            snapshots,
            eps_cache,
            market,
            eps,
            clock,
            config: Arc::new(config),
        };

        Ok((ctx, db))
    }
}
