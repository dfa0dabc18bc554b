//! Redis 캐시 구현.
//!
//! 스냅샷을 JSON으로 저장하고 보존 기간을 만료 시간으로 설정합니다.
//! 신선도는 만료와 별개로 `created_at`으로 판단합니다.

use async_trait::async_trait;
use chrono::Duration;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tidewatch_core::{MonitorSnapshot, SharedClock, SnapshotKey};
use tracing::{debug, info, instrument};

use super::SnapshotStore;
use crate::error::{DataError, Result};

/// `SCAN` 한 번에 요청하는 키 수.
const SCAN_BATCH: usize = 200;

/// Redis 연결 래퍼.
///
/// `ConnectionManager`가 연결이 끊기면 다시 연결합니다.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// 새 Redis 연결을 생성합니다.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Redis 연결 중...");

        let client = Client::open(url).map_err(|e| DataError::Cache(e.to_string()))?;
        let connection = client.get_connection_manager().await?;

        info!("Redis 연결 성공");
        Ok(Self { connection })
    }

    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let result: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(result == "PONG")
    }

    /// 값을 가져옵니다.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        value
            .map(|json| serde_json::from_str(&json).map_err(DataError::from))
            .transpose()
    }

    /// 여러 키를 한 번에 가져옵니다. 결과 순서는 `keys`와 같습니다.
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<Option<T>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;

        values
            .into_iter()
            .map(|v| {
                v.map(|json| serde_json::from_str(&json).map_err(DataError::from))
                    .transpose()
            })
            .collect()
    }

    /// TTL(초)과 함께 값을 저장합니다.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, json, ttl_secs.max(1)).await?;
        Ok(())
    }

    /// 패턴과 일치하는 키 목록.
    ///
    /// 서버를 막지 않도록 `KEYS` 대신 `SCAN` 커서로 나눠 조회합니다.
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN은 같은 키를 두 번 돌려줄 수 있음
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// 키들을 삭제합니다.
    pub async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(keys).await?;
        Ok(deleted as usize)
    }
}

/// Redis 스냅샷 캐시.
#[derive(Clone)]
pub struct RedisSnapshotStore {
    cache: RedisCache,
    clock: SharedClock,
    /// 저장 시 만료 시간
    retention: Duration,
}

impl RedisSnapshotStore {
    const PREFIX: &'static str = "tidewatch:snapshot";

    pub fn new(cache: RedisCache, clock: SharedClock, retention: Duration) -> Self {
        Self {
            cache,
            clock,
            retention,
        }
    }

    fn key(key: &SnapshotKey) -> String {
        format!("{}:{}:{}", Self::PREFIX, key.symbol, key.timeframe)
    }

    fn is_fresh(&self, snapshot: &MonitorSnapshot, max_age: Duration) -> bool {
        snapshot.age(self.clock.now()) <= max_age
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &SnapshotKey, max_age: Duration) -> Result<Option<MonitorSnapshot>> {
        let snapshot: Option<MonitorSnapshot> = self.cache.get(&Self::key(key)).await?;
        Ok(snapshot.filter(|s| self.is_fresh(s, max_age)))
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn get_batch(
        &self,
        keys: &[SnapshotKey],
        max_age: Duration,
    ) -> Result<HashMap<SnapshotKey, MonitorSnapshot>> {
        let redis_keys: Vec<String> = keys.iter().map(Self::key).collect();
        let values: Vec<Option<MonitorSnapshot>> = self.cache.get_many(&redis_keys).await?;

        let hits: HashMap<SnapshotKey, MonitorSnapshot> = keys
            .iter()
            .cloned()
            .zip(values)
            .filter_map(|(k, v)| v.filter(|s| self.is_fresh(s, max_age)).map(|s| (k, s)))
            .collect();

        debug!(requested = keys.len(), hits = hits.len(), "스냅샷 캐시 조회 (redis)");
        Ok(hits)
    }

    #[instrument(skip(self, snapshots), fields(count = snapshots.len()))]
    async fn save_batch(&self, snapshots: &[MonitorSnapshot]) -> Result<usize> {
        let now = self.clock.now();
        let ttl = self.retention.num_seconds().max(1) as u64;

        for s in snapshots {
            let mut stored = s.clone();
            stored.created_at = now;
            self.cache.set_with_ttl(&Self::key(&s.key()), &stored, ttl).await?;
        }
        Ok(snapshots.len())
    }

    /// 만료 시간으로 대부분 정리되지만, 더 짧은 보존 기간이 요청되면 직접 삭제합니다.
    #[instrument(skip(self))]
    async fn clean_old(&self, retention: Duration) -> Result<u64> {
        let keys = self.cache.scan_keys(&format!("{}:*", Self::PREFIX)).await?;
        let values: Vec<Option<MonitorSnapshot>> = self.cache.get_many(&keys).await?;
        let expired = expired_keys(keys, values, self.clock.now(), retention);

        let deleted = self.cache.delete_many(&expired).await?;
        if deleted > 0 {
            info!(deleted = deleted, "보존 기간이 지난 스냅샷 삭제 (redis)");
        }
        Ok(deleted as u64)
    }
}

/// 보존 기간이 지난 스냅샷의 키. 이미 만료되어 값이 없는 키는 제외합니다.
fn expired_keys(
    keys: Vec<String>,
    values: Vec<Option<MonitorSnapshot>>,
    now: DateTime<Utc>,
    retention: Duration,
) -> Vec<String> {
    keys.into_iter()
        .zip(values)
        .filter(|(_, v)| v.as_ref().map_or(false, |s| s.age(now) > retention))
        .map(|(k, _)| k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use tidewatch_core::{Timeframe, TrendEmas};

    fn snapshot(symbol: &str, created_at: DateTime<Utc>) -> MonitorSnapshot {
        MonitorSnapshot {
            symbol: symbol.to_string(),
            timeframe: Timeframe::D1,
            current_price: Decimal::from(10),
            ema144: None,
            ema188: None,
            trend: TrendEmas::default(),
            eps_forecast: None,
            created_at,
        }
    }

    #[test]
    fn test_expired_keys_by_created_at() {
        let now = Utc.with_ymd_and_hms(2024, 3, 8, 7, 30, 0).unwrap();
        let keys = vec![
            "tidewatch:snapshot:OLD:1d".to_string(),
            "tidewatch:snapshot:NEW:1d".to_string(),
            "tidewatch:snapshot:GONE:1d".to_string(),
        ];
        let values = vec![
            Some(snapshot("OLD", now - Duration::minutes(61))),
            Some(snapshot("NEW", now - Duration::minutes(59))),
            None,
        ];

        let expired = expired_keys(keys, values, now, Duration::hours(1));
        assert_eq!(expired, vec!["tidewatch:snapshot:OLD:1d".to_string()]);
    }

    #[test]
    fn test_snapshot_key_layout() {
        let key = SnapshotKey::new("600000", Timeframe::D2);
        assert_eq!(RedisSnapshotStore::key(&key), "tidewatch:snapshot:600000:2d");
    }
}
