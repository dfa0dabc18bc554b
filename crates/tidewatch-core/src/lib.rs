//! # TideWatch Core
//!
//! 시세 동기화 파이프라인 전반에서 사용되는 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! - 종목(Instrument) 및 추적 심볼
//! - 일봉(OHLCV) 및 실시간 시세
//! - 지표 스냅샷과 분류 결과
//! - 일일 업데이트 로그
//! - 시장 시간 / 시계 추상화
//! - 설정 관리
//! - 로깅 인프라

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod market;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::AppConfig;
pub use domain::*;
pub use error::*;
pub use types::*;
