//! PostgreSQL 업데이트 로그 저장소.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tidewatch_core::UpdateLog;
use tracing::instrument;

use super::UpdateLogStore;
use crate::error::{DataError, Result};

#[derive(Debug, Clone, FromRow)]
struct UpdateLogRecord {
    update_date: NaiveDate,
    success_count: i32,
    total_count: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UpdateLogRecord> for UpdateLog {
    type Error = DataError;

    fn try_from(r: UpdateLogRecord) -> Result<Self> {
        Ok(UpdateLog {
            update_date: r.update_date,
            success_count: r.success_count.max(0) as usize,
            total_count: r.total_count.max(0) as usize,
            status: r.status.parse()?,
            created_at: r.created_at,
        })
    }
}

/// `kline_update_log` 테이블.
#[derive(Clone)]
pub struct PgUpdateLogStore {
    pool: PgPool,
}

impl PgUpdateLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UpdateLogStore for PgUpdateLogStore {
    #[instrument(skip(self, log), fields(date = %log.update_date, status = %log.status))]
    async fn upsert(&self, log: &UpdateLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kline_update_log (update_date, success_count, total_count, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (update_date) DO UPDATE SET
                success_count = EXCLUDED.success_count,
                total_count = EXCLUDED.total_count,
                status = EXCLUDED.status,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(log.update_date)
        .bind(log.success_count as i32)
        .bind(log.total_count as i32)
        .bind(log.status.as_str())
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, date: NaiveDate) -> Result<Option<UpdateLog>> {
        let record: Option<UpdateLogRecord> = sqlx::query_as(
            r#"
            SELECT update_date, success_count, total_count, status, created_at
            FROM kline_update_log
            WHERE update_date = $1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        record.map(UpdateLog::try_from).transpose()
    }

    async fn latest(&self) -> Result<Option<UpdateLog>> {
        let record: Option<UpdateLogRecord> = sqlx::query_as(
            r#"
            SELECT update_date, success_count, total_count, status, created_at
            FROM kline_update_log
            ORDER BY update_date DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        record.map(UpdateLog::try_from).transpose()
    }
}
