//! 공통 타입.

pub mod symbol;
pub mod timeframe;

pub use symbol::{bare_code, exchange_of, prefixed_lower, prefixed_upper, Exchange};
pub use timeframe::Timeframe;
