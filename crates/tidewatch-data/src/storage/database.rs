//! PostgreSQL 연결 풀.

use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::{DataError, Result};

/// 데이터베이스 연결 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl From<&tidewatch_core::config::DatabaseConfig> for DatabaseConfig {
    fn from(cfg: &tidewatch_core::config::DatabaseConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            max_connections: cfg.max_connections,
            connect_timeout_secs: cfg.connect_timeout_secs,
        }
    }
}

/// 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("데이터베이스 연결 중...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DataError::Connection(e.to_string()))?;

        info!("데이터베이스 연결 성공");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 스키마 마이그레이션을 적용합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("마이그레이션 실행 중...");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("마이그레이션 완료");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
