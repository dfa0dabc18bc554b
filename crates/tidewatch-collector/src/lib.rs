//! TideWatch 일봉 동기화 및 지표 스냅샷 파이프라인.
//!
//! 이 crate는 다음을 제공합니다:
//! - 갱신 필요 여부 판단 및 대상 종목 선정
//! - 동시성 제한/타임아웃이 걸린 일봉 증분 동기화
//! - 스냅샷 캐시를 거치는 대시보드 모니터 데이터
//! - 일일 업데이트 로그
//! - CLI (`tidewatch-collector`)

pub mod context;
pub mod error;
pub mod limiter;
pub mod modules;
pub mod stats;

pub use context::CollectorContext;
pub use error::{CollectorError, Result};
pub use limiter::ConcurrencyLimiter;
pub use stats::CollectionStats;
