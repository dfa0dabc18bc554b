//! 외부 호출 동시성 제한.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{CollectorError, Result};

/// 외부 API 동시 호출 수를 제한하는 세마포어.
///
/// 일봉 수집과 대량 시세 조회가 같은 인스턴스를 공유합니다.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 사용 가능한 허가 수.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 허가를 얻습니다. 태스크로 옮길 수 있도록 owned 허가를 반환합니다.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CollectorError::Other(Box::new(e)))
    }
}
