//! PostgreSQL 종목 목록 저장소.
//!
//! - `monitor_stocks`: 관심 종목 (읽기 전용)
//! - `stock_list`: 전체 유니버스와 마지막 동기화 시각

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tidewatch_core::{Instrument, SharedClock, TrackedSymbol};
use tracing::{instrument, warn};

use super::InstrumentStore;
use crate::error::Result;

#[derive(Debug, Clone, FromRow)]
struct InstrumentRecord {
    code: String,
    name: String,
    timeframe: String,
    reasonable_pe_min: Decimal,
    reasonable_pe_max: Decimal,
    enabled: bool,
}

#[derive(Debug, Clone, FromRow)]
struct TrackedSymbolRecord {
    code: String,
    name: String,
    last_update: Option<DateTime<Utc>>,
}

impl From<TrackedSymbolRecord> for TrackedSymbol {
    fn from(r: TrackedSymbolRecord) -> Self {
        TrackedSymbol {
            code: r.code,
            name: r.name,
            last_update: r.last_update,
        }
    }
}

#[derive(Clone)]
pub struct PgInstrumentStore {
    pool: PgPool,
    clock: SharedClock,
}

impl PgInstrumentStore {
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl InstrumentStore for PgInstrumentStore {
    #[instrument(skip(self))]
    async fn enabled_instruments(&self) -> Result<Vec<Instrument>> {
        let records: Vec<InstrumentRecord> = sqlx::query_as(
            r#"
            SELECT code, name, timeframe, reasonable_pe_min, reasonable_pe_max, enabled
            FROM monitor_stocks
            WHERE enabled = TRUE
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .filter_map(|r| match r.timeframe.parse() {
                Ok(timeframe) => Some(Instrument {
                    code: r.code,
                    name: r.name,
                    timeframe,
                    reasonable_pe_min: r.reasonable_pe_min,
                    reasonable_pe_max: r.reasonable_pe_max,
                    enabled: r.enabled,
                }),
                Err(e) => {
                    warn!(code = %r.code, error = %e, "알 수 없는 타임프레임, 종목 제외");
                    None
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn tracked_symbols(&self) -> Result<Vec<TrackedSymbol>> {
        let records: Vec<TrackedSymbolRecord> =
            sqlx::query_as("SELECT code, name, last_update FROM stock_list ORDER BY code")
                .fetch_all(&self.pool)
                .await?;
        Ok(records.into_iter().map(TrackedSymbol::from).collect())
    }

    #[instrument(skip(self))]
    async fn pending_update(&self, limit: usize, older_than: Duration) -> Result<Vec<TrackedSymbol>> {
        let cutoff = self.clock.now() - older_than;

        let records: Vec<TrackedSymbolRecord> = sqlx::query_as(
            r#"
            SELECT code, name, last_update
            FROM stock_list
            WHERE last_update IS NULL OR last_update < $1
            ORDER BY last_update ASC NULLS FIRST, code
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(TrackedSymbol::from).collect())
    }

    #[instrument(skip(self, codes), fields(count = codes.len()))]
    async fn mark_updated(&self, codes: &[String]) -> Result<u64> {
        if codes.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("UPDATE stock_list SET last_update = $1 WHERE code = ANY($2)")
            .bind(self.clock.now())
            .bind(codes)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
