//! 도메인 모델.

pub mod instrument;
pub mod market_data;
pub mod snapshot;
pub mod update_log;

pub use instrument::{Instrument, TrackedSymbol, DEFAULT_PE_MAX, DEFAULT_PE_MIN};
pub use market_data::{OhlcvBar, Quote};
pub use snapshot::{
    MonitorRow, MonitorSnapshot, NamedEma, PriceRange, SnapshotKey, TechnicalStatus, Trend,
    TrendEmas, ValuationStatus,
};
pub use update_log::{UpdateLog, UpdateStatus};
