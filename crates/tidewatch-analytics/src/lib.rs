//! 지표 계산 엔진.
//!
//! 순수 계산만 담당합니다 (I/O 없음):
//! - 종가 시계열의 EMA
//! - 밸류에이션 / 기술적 / 추세 분류
//! - 종목별 지표 스냅샷 생성

pub mod indicators;
pub mod signals;
pub mod snapshot;

pub use indicators::{EmaParams, IndicatorEngine, IndicatorError, IndicatorResult, TrendIndicators};
pub use signals::{classify_technical, classify_trend, classify_valuation, reasonable_price_range};
pub use snapshot::{to_monitor_row, SnapshotBuilder, MIN_SNAPSHOT_POINTS};
