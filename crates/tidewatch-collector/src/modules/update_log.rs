//! 일일 업데이트 로그.

use std::sync::Arc;
use tidewatch_core::{SharedClock, UpdateLog, UpdateStatus};
use tidewatch_data::UpdateLogStore;
use tracing::info;

use crate::context::CollectorContext;
use crate::Result;

#[derive(Clone)]
pub struct UpdateLogService {
    store: Arc<dyn UpdateLogStore>,
    clock: SharedClock,
}

impl UpdateLogService {
    pub fn new(ctx: &CollectorContext) -> Self {
        Self {
            store: ctx.update_log.clone(),
            clock: ctx.clock.clone(),
        }
    }

    /// 오늘(시장 현지 날짜) 결과를 기록합니다. 같은 날 재실행하면 덮어씁니다.
    pub async fn record(
        &self,
        success_count: usize,
        total_count: usize,
        status: UpdateStatus,
    ) -> Result<UpdateLog> {
        let log = UpdateLog {
            update_date: self.clock.market_today(),
            success_count,
            total_count,
            status,
            created_at: self.clock.now(),
        };
        self.store.upsert(&log).await?;

        info!(
            date = %log.update_date,
            success = success_count,
            total = total_count,
            status = %status,
            "업데이트 로그 기록"
        );
        Ok(log)
    }

    /// 오늘 `success` 기록이 있을 때만 true.
    pub async fn has_updated_today(&self) -> Result<bool> {
        let today = self.clock.market_today();
        Ok(self
            .store
            .get(today)
            .await?
            .is_some_and(|log| log.status == UpdateStatus::Success))
    }

    /// 가장 최근 기록.
    pub async fn last_update_info(&self) -> Result<Option<UpdateLog>> {
        Ok(self.store.latest().await?)
    }
}
