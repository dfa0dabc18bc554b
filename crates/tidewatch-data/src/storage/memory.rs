//! 메모리 저장소.
//!
//! PostgreSQL 없이 파이프라인 전체를 돌려볼 수 있도록 모든 저장소 trait을
//! 구현합니다. 테스트와 `memory` 캐시 백엔드에서 사용합니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tidewatch_core::{
    Instrument, MonitorSnapshot, OhlcvBar, SharedClock, SnapshotKey, TrackedSymbol, UpdateLog,
};
use tokio::sync::RwLock;

use super::{
    BarStore, EpsCacheStore, InstrumentStore, SnapshotStore, UpdateLogStore, UpsertSummary,
};
use crate::error::{DataError, Result};

// =============================================================================
// 일봉
// =============================================================================

/// 메모리 일봉 저장소.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    bars: RwLock<HashMap<String, BTreeMap<NaiveDate, OhlcvBar>>>,
    fail_writes: AtomicBool,
    upsert_all_calls: AtomicUsize,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 쓰기 실패를 흉내 냅니다.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// `upsert_all` 호출 횟수.
    pub fn upsert_all_calls(&self) -> usize {
        self.upsert_all_calls.load(Ordering::SeqCst)
    }

    /// 저장된 일봉 수.
    pub async fn count(&self, symbol: &str) -> usize {
        self.bars.read().await.get(symbol).map_or(0, BTreeMap::len)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DataError::write("memory", "simulated write failure"));
        }
        Ok(())
    }
}

/// 키 종목명으로 덮어써 저장합니다 (PostgreSQL 저장소와 동일).
fn insert_series(
    bars: &mut HashMap<String, BTreeMap<NaiveDate, OhlcvBar>>,
    symbol: &str,
    incoming: &[OhlcvBar],
) {
    let series = bars.entry(symbol.to_string()).or_default();
    for bar in incoming {
        let mut bar = bar.clone();
        bar.symbol = symbol.to_string();
        series.insert(bar.date, bar);
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn upsert_batch(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<usize> {
        self.check_writable()?;
        let mut guard = self.bars.write().await;
        insert_series(&mut guard, symbol, bars);
        Ok(bars.len())
    }

    async fn upsert_all(&self, batches: &HashMap<String, Vec<OhlcvBar>>) -> Result<UpsertSummary> {
        self.upsert_all_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        let mut guard = self.bars.write().await;
        for (symbol, bars) in batches.iter().filter(|(_, b)| !b.is_empty()) {
            insert_series(&mut guard, symbol, bars);
        }
        Ok(UpsertSummary::from_batches(batches))
    }

    async fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .bars
            .read()
            .await
            .get(symbol)
            .and_then(|s| s.keys().next_back().copied()))
    }

    async fn latest_dates_batch(&self, symbols: &[String]) -> Result<HashMap<String, NaiveDate>> {
        let guard = self.bars.read().await;
        Ok(symbols
            .iter()
            .filter_map(|s| {
                guard
                    .get(s)
                    .and_then(|series| series.keys().next_back())
                    .map(|d| (s.clone(), *d))
            })
            .collect())
    }

    async fn read(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>> {
        let guard = self.bars.read().await;
        let Some(series) = guard.get(symbol) else {
            return Ok(Vec::new());
        };
        let skip = series.len().saturating_sub(limit);
        Ok(series.values().skip(skip).cloned().collect())
    }

    async fn read_batch(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<HashMap<String, Vec<OhlcvBar>>> {
        let mut out = HashMap::new();
        for symbol in symbols {
            let bars = self.read(symbol, limit).await?;
            if !bars.is_empty() {
                out.insert(symbol.clone(), bars);
            }
        }
        Ok(out)
    }

    async fn read_range(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>> {
        let guard = self.bars.read().await;
        let Some(series) = guard.get(symbol) else {
            return Ok(Vec::new());
        };
        Ok(series
            .values()
            .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
            .cloned()
            .collect())
    }
}

// =============================================================================
// 스냅샷
// =============================================================================

/// 메모리 스냅샷 캐시.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    rows: RwLock<HashMap<SnapshotKey, MonitorSnapshot>>,
    clock: SharedClock,
}

impl MemorySnapshotStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn is_fresh(snapshot: &MonitorSnapshot, now: DateTime<Utc>, max_age: Duration) -> bool {
    snapshot.age(now) <= max_age
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &SnapshotKey, max_age: Duration) -> Result<Option<MonitorSnapshot>> {
        let now = self.clock.now();
        Ok(self
            .rows
            .read()
            .await
            .get(key)
            .filter(|s| is_fresh(s, now, max_age))
            .cloned())
    }

    async fn get_batch(
        &self,
        keys: &[SnapshotKey],
        max_age: Duration,
    ) -> Result<HashMap<SnapshotKey, MonitorSnapshot>> {
        let now = self.clock.now();
        let guard = self.rows.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| {
                guard
                    .get(k)
                    .filter(|s| is_fresh(s, now, max_age))
                    .map(|s| (k.clone(), s.clone()))
            })
            .collect())
    }

    async fn save_batch(&self, snapshots: &[MonitorSnapshot]) -> Result<usize> {
        let now = self.clock.now();
        let mut guard = self.rows.write().await;
        for s in snapshots {
            let mut stored = s.clone();
            stored.created_at = now;
            guard.insert(stored.key(), stored);
        }
        Ok(snapshots.len())
    }

    async fn clean_old(&self, retention: Duration) -> Result<u64> {
        let now = self.clock.now();
        let mut guard = self.rows.write().await;
        let before = guard.len();
        guard.retain(|_, s| s.age(now) <= retention);
        Ok((before - guard.len()) as u64)
    }
}

// =============================================================================
// 업데이트 로그
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryUpdateLogStore {
    rows: RwLock<BTreeMap<NaiveDate, UpdateLog>>,
}

impl MemoryUpdateLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpdateLogStore for MemoryUpdateLogStore {
    async fn upsert(&self, log: &UpdateLog) -> Result<()> {
        self.rows.write().await.insert(log.update_date, log.clone());
        Ok(())
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<UpdateLog>> {
        Ok(self.rows.read().await.get(&date).cloned())
    }

    async fn latest(&self) -> Result<Option<UpdateLog>> {
        Ok(self.rows.read().await.values().next_back().cloned())
    }
}

// =============================================================================
// 종목 목록
// =============================================================================

#[derive(Debug)]
pub struct MemoryInstrumentStore {
    instruments: RwLock<Vec<Instrument>>,
    universe: RwLock<BTreeMap<String, TrackedSymbol>>,
    clock: SharedClock,
}

impl MemoryInstrumentStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            instruments: RwLock::new(Vec::new()),
            universe: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    /// 관심 종목을 설정합니다.
    pub async fn set_instruments(&self, instruments: Vec<Instrument>) {
        *self.instruments.write().await = instruments;
    }

    /// 유니버스를 설정합니다.
    pub async fn set_universe(&self, symbols: Vec<TrackedSymbol>) {
        *self.universe.write().await = symbols.into_iter().map(|s| (s.code.clone(), s)).collect();
    }
}

#[async_trait]
impl InstrumentStore for MemoryInstrumentStore {
    async fn enabled_instruments(&self) -> Result<Vec<Instrument>> {
        Ok(self
            .instruments
            .read()
            .await
            .iter()
            .filter(|i| i.enabled)
            .cloned()
            .collect())
    }

    async fn tracked_symbols(&self) -> Result<Vec<TrackedSymbol>> {
        Ok(self.universe.read().await.values().cloned().collect())
    }

    async fn pending_update(&self, limit: usize, older_than: Duration) -> Result<Vec<TrackedSymbol>> {
        let cutoff = self.clock.now() - older_than;
        let mut pending: Vec<TrackedSymbol> = self
            .universe
            .read()
            .await
            .values()
            .filter(|s| s.last_update.map_or(true, |t| t < cutoff))
            .cloned()
            .collect();

        // None이 Some보다 먼저 정렬됨
        pending.sort_by(|a, b| a.last_update.cmp(&b.last_update).then(a.code.cmp(&b.code)));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_updated(&self, codes: &[String]) -> Result<u64> {
        let now = self.clock.now();
        let mut guard = self.universe.write().await;
        let mut updated = 0;
        for code in codes {
            if let Some(s) = guard.get_mut(code) {
                s.last_update = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

// =============================================================================
// EPS 캐시
// =============================================================================

#[derive(Debug)]
pub struct MemoryEpsCacheStore {
    rows: RwLock<HashMap<String, (Decimal, DateTime<Utc>)>>,
    clock: SharedClock,
}

impl MemoryEpsCacheStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl EpsCacheStore for MemoryEpsCacheStore {
    async fn get_batch(&self, codes: &[String], ttl: Duration) -> Result<HashMap<String, Decimal>> {
        let cutoff = self.clock.now() - ttl;
        let guard = self.rows.read().await;
        Ok(codes
            .iter()
            .filter_map(|c| {
                guard
                    .get(c)
                    .filter(|(_, at)| *at >= cutoff)
                    .map(|(eps, _)| (c.clone(), *eps))
            })
            .collect())
    }

    async fn set(&self, code: &str, eps: Decimal) -> Result<()> {
        let now = self.clock.now();
        self.rows.write().await.insert(code.to_string(), (eps, now));
        Ok(())
    }

    async fn clean_old(&self, ttl: Duration) -> Result<u64> {
        let cutoff = self.clock.now() - ttl;
        let mut guard = self.rows.write().await;
        let before = guard.len();
        guard.retain(|_, (_, at)| *at >= cutoff);
        Ok((before - guard.len()) as u64)
    }
}
