//! 수집/계산 모듈.

pub mod export;
pub mod kline_sync;
pub mod monitor;
pub mod quote;
pub mod refresh;
pub mod staleness;
pub mod update_log;

pub use export::export_bars;
pub use kline_sync::{KlineSyncService, SyncOptions};
pub use monitor::MonitorService;
pub use quote::QuoteFetcher;
pub use refresh::{trigger_refresh, RefreshJob, RefreshReport};
pub use staleness::{RefreshDecision, RefreshReason, StalenessDetector};
pub use update_log::UpdateLogService;
