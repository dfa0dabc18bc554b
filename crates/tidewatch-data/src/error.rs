//! 저장소 오류 타입.

use thiserror::Error;

/// 저장소/캐시 오류.
///
/// 이 오류가 발생하면 호출자는 배치 전체를 실패로 처리합니다.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query error: {0}")]
    Query(String),

    /// 일봉/스냅샷 쓰기 실패
    #[error("Write error ({table}): {message}")]
    Write { table: &'static str, message: String },

    #[error("Migration error: {0}")]
    Migration(String),

    /// Redis 오류
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 저장된 값을 도메인 타입으로 바꿀 수 없음
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl DataError {
    pub fn write(table: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Write {
            table,
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => DataError::Query(db_err.message().to_string()),
            other => DataError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DataError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DataError::Migration(err.to_string())
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        DataError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

impl From<tidewatch_core::CoreError> for DataError {
    fn from(err: tidewatch_core::CoreError) -> Self {
        DataError::InvalidData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_names_table() {
        let err = DataError::write("ohlcv_daily", "disk full");
        assert_eq!(err.to_string(), "Write error (ohlcv_daily): disk full");
    }
}
