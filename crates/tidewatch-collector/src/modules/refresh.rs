//! 갱신 작업 (동기화 → 스냅샷 재계산 → 업데이트 로그).

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tidewatch_core::{UpdateLog, UpdateStatus};
use tidewatch_data::SnapshotStore;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument as _};
use uuid::Uuid;

use super::kline_sync::{KlineSyncService, SyncOptions};
use super::monitor::MonitorService;
use super::update_log::UpdateLogService;
use crate::context::CollectorContext;
use crate::stats::CollectionStats;
use crate::Result;

/// 갱신 작업 결과
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run_id: Uuid,
    pub stats: CollectionStats,
    pub status: UpdateStatus,
    pub snapshots: usize,
    pub log: UpdateLog,
}

/// 정기/수동 갱신 작업.
#[derive(Clone)]
pub struct RefreshJob {
    snapshots: Arc<dyn SnapshotStore>,
    retention: chrono::Duration,
    sync: KlineSyncService,
    monitor: MonitorService,
    update_log: UpdateLogService,
}

impl RefreshJob {
    pub fn new(ctx: &CollectorContext) -> Self {
        Self {
            snapshots: ctx.snapshots.clone(),
            retention: ctx.config.cache.retention(),
            sync: KlineSyncService::new(ctx),
            monitor: MonitorService::new(ctx),
            update_log: UpdateLogService::new(ctx),
        }
    }

    /// 작업을 실행합니다.
    pub async fn run(&self, options: SyncOptions) -> Result<RefreshReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("refresh", run_id = %run_id);
        self.run_inner(run_id, options).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, options: SyncOptions) -> Result<RefreshReport> {
        let started = Instant::now();
        info!(scope = ?options.scope, force = options.force, "=== 갱신 작업 시작 ===");

        let removed = self.snapshots.clean_old(self.retention).await?;
        info!(removed = removed, "Step 1/4: 오래된 스냅샷 정리");

        info!("Step 2/4: 일봉 동기화");
        let stats = self.sync.sync(options).await?;
        stats.log_summary("일봉 동기화");

        info!("Step 3/4: 스냅샷 재계산");
        let snapshots = self.monitor.refresh_snapshots().await?;

        info!("Step 4/4: 업데이트 로그 기록");
        let status = stats.status();
        let log = self
            .update_log
            .record(stats.success(), stats.total, status)
            .await?;

        info!(
            status = %status,
            snapshots = snapshots,
            elapsed = format!("{:.1}s", started.elapsed().as_secs_f64()),
            "=== 갱신 작업 완료 ==="
        );

        Ok(RefreshReport {
            run_id,
            stats,
            status,
            snapshots,
            log,
        })
    }
}

/// 갱신 작업을 백그라운드로 시작합니다.
///
/// 호출자는 반환된 핸들을 기다리지 않아도 됩니다. 실패는 로그로만 남습니다.
pub fn trigger_refresh(job: RefreshJob, options: SyncOptions) -> JoinHandle<Result<RefreshReport>> {
    tokio::spawn(async move {
        let result = job.run(options).await;
        if let Err(e) = &result {
            error!(error = %e, "백그라운드 갱신 실패");
        }
        result
    })
}
