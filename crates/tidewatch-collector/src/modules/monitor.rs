//! 대시보드 모니터 데이터.
//!
//! 스냅샷 캐시를 먼저 읽고, 미스인 종목만 일봉/시세로 다시 계산합니다.

use std::collections::HashMap;
use std::sync::Arc;
use tidewatch_analytics::{to_monitor_row, SnapshotBuilder, MIN_SNAPSHOT_POINTS};
use tidewatch_core::config::{CacheConfig, MonitorConfig};
use tidewatch_core::{Instrument, MonitorRow, MonitorSnapshot, SharedClock, SnapshotKey};
use tidewatch_data::{BarStore, EpsForecastProvider, InstrumentStore, SnapshotStore};
use tracing::{debug, info, warn};

use super::kline_sync::KlineSyncService;
use super::quote::QuoteFetcher;
use crate::context::CollectorContext;
use crate::Result;

#[derive(Clone)]
pub struct MonitorService {
    instruments: Arc<dyn InstrumentStore>,
    bars: Arc<dyn BarStore>,
    snapshots: Arc<dyn SnapshotStore>,
    eps: Option<Arc<dyn EpsForecastProvider>>,
    sync: KlineSyncService,
    quotes: QuoteFetcher,
    builder: SnapshotBuilder,
    clock: SharedClock,
    cache: CacheConfig,
    monitor: MonitorConfig,
}

impl MonitorService {
    pub fn new(ctx: &CollectorContext) -> Self {
        Self {
            instruments: ctx.instruments.clone(),
            bars: ctx.bars.clone(),
            snapshots: ctx.snapshots.clone(),
            eps: ctx.eps.clone(),
            sync: KlineSyncService::new(ctx),
            quotes: QuoteFetcher::new(ctx),
            builder: SnapshotBuilder::new(),
            clock: ctx.clock.clone(),
            cache: ctx.config.cache.clone(),
            monitor: ctx.config.monitor.clone(),
        }
    }

    /// 활성 종목 전체의 모니터 행.
    ///
    /// 캐시에 신선한 스냅샷이 있으면 그대로 쓰고, 나머지는 계산 후 저장합니다.
    /// 데이터가 부족하거나 시세를 얻지 못한 종목은 결과에서 빠집니다.
    pub async fn get_monitor_data(&self) -> Result<Vec<MonitorRow>> {
        let removed = self.snapshots.clean_old(self.cache.retention()).await?;
        if removed > 0 {
            debug!(removed = removed, "오래된 스냅샷 정리");
        }

        let instruments = self.instruments.enabled_instruments().await?;
        if instruments.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<SnapshotKey> = instruments
            .iter()
            .map(|i| SnapshotKey::new(i.code.clone(), i.timeframe))
            .collect();
        let cached = self.snapshots.get_batch(&keys, self.cache.max_age()).await?;

        let misses: Vec<Instrument> = instruments
            .iter()
            .filter(|i| !cached.contains_key(&SnapshotKey::new(i.code.clone(), i.timeframe)))
            .cloned()
            .collect();

        let computed: HashMap<SnapshotKey, MonitorSnapshot> = self
            .compute_snapshots(&misses, self.monitor.sync_on_miss)
            .await?
            .into_iter()
            .map(|s| (s.key(), s))
            .collect();

        info!(
            instruments = instruments.len(),
            cache_hits = cached.len(),
            computed = computed.len(),
            "모니터 데이터 조회"
        );

        let rows = instruments
            .iter()
            .zip(keys.iter())
            .filter_map(|(instrument, key)| {
                if let Some(snapshot) = cached.get(key) {
                    Some(to_monitor_row(instrument, snapshot, true))
                } else {
                    computed
                        .get(key)
                        .map(|snapshot| to_monitor_row(instrument, snapshot, false))
                }
            })
            .collect();

        Ok(rows)
    }

    /// 캐시와 관계없이 활성 종목 전체의 스냅샷을 다시 계산해 저장합니다.
    pub async fn refresh_snapshots(&self) -> Result<usize> {
        let instruments = self.instruments.enabled_instruments().await?;
        let snapshots = self.compute_snapshots(&instruments, false).await?;
        Ok(snapshots.len())
    }

    /// 스냅샷을 계산하고 캐시에 저장합니다.
    async fn compute_snapshots(
        &self,
        instruments: &[Instrument],
        sync_missing: bool,
    ) -> Result<Vec<MonitorSnapshot>> {
        if instruments.is_empty() {
            return Ok(Vec::new());
        }

        let codes: Vec<String> = instruments.iter().map(|i| i.code.clone()).collect();
        let limit = self.monitor.bar_read_limit;
        let mut bars = self.bars.read_batch(&codes, limit).await?;

        if sync_missing {
            let insufficient: Vec<String> = instruments
                .iter()
                .filter(|i| bars.get(&i.code).map_or(0, Vec::len) < MIN_SNAPSHOT_POINTS)
                .map(|i| i.code.clone())
                .collect();

            if !insufficient.is_empty() {
                info!(symbols = insufficient.len(), "이력 부족 종목 동기화");
                let stats = self.sync.sync_symbols(&insufficient, false).await?;
                if stats.new_data > 0 {
                    bars.extend(self.bars.read_batch(&insufficient, limit).await?);
                }
            }
        }

        let quotes = self.quotes.fetch_bulk(&codes).await;
        let now = self.clock.now();

        let mut snapshots: Vec<MonitorSnapshot> = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            let Some(quote) = quotes.get(&instrument.code) else {
                warn!(symbol = %instrument.code, "현재가 없음, 종목 제외");
                continue;
            };
            let Some(daily) = bars.get(&instrument.code) else {
                debug!(symbol = %instrument.code, "일봉 없음, 종목 제외");
                continue;
            };
            if let Some(snapshot) =
                self.builder
                    .build(&instrument.code, instrument.timeframe, daily, quote.price, now)
            {
                snapshots.push(snapshot);
            }
        }

        if let Some(eps) = &self.eps {
            let targets: Vec<String> = snapshots.iter().map(|s| s.symbol.clone()).collect();
            let forecasts = eps.fetch_eps_batch(&targets).await;
            for snapshot in &mut snapshots {
                snapshot.eps_forecast = forecasts.get(&snapshot.symbol).copied();
            }
        }

        if !snapshots.is_empty() {
            self.snapshots.save_batch(&snapshots).await?;
        }
        debug!(requested = instruments.len(), computed = snapshots.len(), "스냅샷 계산");
        Ok(snapshots)
    }
}
