//! PostgreSQL 스냅샷 캐시.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::HashMap;
use tidewatch_core::{MonitorSnapshot, SharedClock, SnapshotKey, Timeframe, TrendEmas};
use tracing::{debug, info, instrument, warn};

use super::SnapshotStore;
use crate::error::{DataError, Result};

/// 스냅샷 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRecord {
    pub symbol: String,
    pub timeframe: String,
    pub current_price: Decimal,
    pub ema144: Option<Decimal>,
    pub ema188: Option<Decimal>,
    pub ema_short: Option<Decimal>,
    pub ema_medium: Option<Decimal>,
    pub ema_long: Option<Decimal>,
    pub eps_forecast: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRecord> for MonitorSnapshot {
    type Error = DataError;

    fn try_from(r: SnapshotRecord) -> Result<Self> {
        let timeframe: Timeframe = r.timeframe.parse()?;
        Ok(MonitorSnapshot {
            symbol: r.symbol,
            timeframe,
            current_price: r.current_price,
            ema144: r.ema144,
            ema188: r.ema188,
            trend: TrendEmas {
                short: r.ema_short,
                medium: r.ema_medium,
                long: r.ema_long,
            },
            eps_forecast: r.eps_forecast,
            created_at: r.created_at,
        })
    }
}

/// PostgreSQL 스냅샷 캐시.
#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
    clock: SharedClock,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    fn convert(records: Vec<SnapshotRecord>) -> Vec<MonitorSnapshot> {
        records
            .into_iter()
            .filter_map(|r| {
                let symbol = r.symbol.clone();
                match MonitorSnapshot::try_from(r) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "잘못된 스냅샷 행 무시");
                        None
                    }
                }
            })
            .collect()
    }
}

const SELECT_COLUMNS: &str = "symbol, timeframe, current_price, ema144, ema188, \
     ema_short, ema_medium, ema_long, eps_forecast, created_at";

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &SnapshotKey, max_age: Duration) -> Result<Option<MonitorSnapshot>> {
        let cutoff = self.clock.now() - max_age;

        let record: Option<SnapshotRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM monitor_snapshot \
             WHERE symbol = $1 AND timeframe = $2 AND created_at >= $3"
        ))
        .bind(&key.symbol)
        .bind(key.timeframe.as_str())
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(MonitorSnapshot::try_from).transpose()?)
    }

    #[instrument(skip(self, keys), fields(count = keys.len()))]
    async fn get_batch(
        &self,
        keys: &[SnapshotKey],
        max_age: Duration,
    ) -> Result<HashMap<SnapshotKey, MonitorSnapshot>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let cutoff = self.clock.now() - max_age;
        let symbols: Vec<&str> = keys.iter().map(|k| k.symbol.as_str()).collect();
        let timeframes: Vec<&str> = keys.iter().map(|k| k.timeframe.as_str()).collect();

        let records: Vec<SnapshotRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM monitor_snapshot \
             WHERE (symbol, timeframe) IN (SELECT * FROM UNNEST($1::text[], $2::text[])) \
               AND created_at >= $3"
        ))
        .bind(&symbols)
        .bind(&timeframes)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let hits: HashMap<SnapshotKey, MonitorSnapshot> = Self::convert(records)
            .into_iter()
            .map(|s| (s.key(), s))
            .collect();

        debug!(requested = keys.len(), hits = hits.len(), "스냅샷 캐시 조회");
        Ok(hits)
    }

    #[instrument(skip(self, snapshots), fields(count = snapshots.len()))]
    async fn save_batch(&self, snapshots: &[MonitorSnapshot]) -> Result<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            sqlx::query(
                r#"
                INSERT INTO monitor_snapshot
                    (symbol, timeframe, current_price, ema144, ema188,
                     ema_short, ema_medium, ema_long, eps_forecast, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (symbol, timeframe) DO UPDATE SET
                    current_price = EXCLUDED.current_price,
                    ema144 = EXCLUDED.ema144,
                    ema188 = EXCLUDED.ema188,
                    ema_short = EXCLUDED.ema_short,
                    ema_medium = EXCLUDED.ema_medium,
                    ema_long = EXCLUDED.ema_long,
                    eps_forecast = EXCLUDED.eps_forecast,
                    created_at = EXCLUDED.created_at
                "#,
            )
            .bind(&s.symbol)
            .bind(s.timeframe.as_str())
            .bind(s.current_price)
            .bind(s.ema144)
            .bind(s.ema188)
            .bind(s.trend.short)
            .bind(s.trend.medium)
            .bind(s.trend.long)
            .bind(s.eps_forecast)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| DataError::write("monitor_snapshot", e))?;
        }
        tx.commit().await?;

        Ok(snapshots.len())
    }

    #[instrument(skip(self))]
    async fn clean_old(&self, retention: Duration) -> Result<u64> {
        let cutoff = self.clock.now() - retention;
        let result = sqlx::query("DELETE FROM monitor_snapshot WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::write("monitor_snapshot", e))?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(deleted = deleted, "오래된 스냅샷 삭제");
        }
        Ok(deleted)
    }
}
