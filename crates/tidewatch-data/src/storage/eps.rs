//! PostgreSQL EPS 예측 캐시.

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use std::collections::HashMap;
use tidewatch_core::SharedClock;
use tracing::{debug, instrument};

use super::EpsCacheStore;
use crate::error::Result;

#[derive(Clone)]
pub struct PgEpsCacheStore {
    pool: PgPool,
    clock: SharedClock,
}

impl PgEpsCacheStore {
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl EpsCacheStore for PgEpsCacheStore {
    #[instrument(skip(self, codes), fields(count = codes.len()))]
    async fn get_batch(&self, codes: &[String], ttl: Duration) -> Result<HashMap<String, Decimal>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, Decimal)> = sqlx::query_as(
            r#"
            SELECT code, eps_value
            FROM eps_cache
            WHERE code = ANY($1) AND updated_at >= $2
            "#,
        )
        .bind(codes)
        .bind(self.clock.now() - ttl)
        .fetch_all(&self.pool)
        .await?;

        debug!(requested = codes.len(), hits = rows.len(), "EPS 캐시 조회");
        Ok(rows.into_iter().collect())
    }

    async fn set(&self, code: &str, eps: Decimal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO eps_cache (code, eps_value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET
                eps_value = EXCLUDED.eps_value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(code)
        .bind(eps)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clean_old(&self, ttl: Duration) -> Result<u64> {
        let result = sqlx::query("DELETE FROM eps_cache WHERE updated_at < $1")
            .bind(self.clock.now() - ttl)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
