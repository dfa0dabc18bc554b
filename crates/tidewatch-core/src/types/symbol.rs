//! 종목 코드와 거래소 구분.
//!
//! 저장소에는 6자리 코드(`600000`) 또는 접두어가 붙은 코드(`sh600000`)가
//! 섞여 들어올 수 있으므로, 외부 API 호출 전에 정규화합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 상장 거래소.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// 상하이 증권거래소
    Shanghai,
    /// 선전 증권거래소
    Shenzhen,
}

impl Exchange {
    /// 소문자 접두어 ("sh", "sz").
    pub fn prefix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "sh",
            Exchange::Shenzhen => "sz",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// 종목 코드에서 거래소를 판별합니다.
///
/// `sh`/`sz` 접두어가 있으면 그대로 따르고, 없으면 `6`으로 시작하는
/// 코드를 상하이, 나머지를 선전으로 봅니다.
pub fn exchange_of(code: &str) -> Exchange {
    let lower = code.trim().to_ascii_lowercase();
    if lower.starts_with("sh") {
        Exchange::Shanghai
    } else if lower.starts_with("sz") {
        Exchange::Shenzhen
    } else if lower.starts_with('6') {
        Exchange::Shanghai
    } else {
        Exchange::Shenzhen
    }
}

/// 접두어를 제거한 숫자 코드.
pub fn bare_code(code: &str) -> &str {
    let trimmed = code.trim();
    let lower = trimmed.get(..2).map(|p| p.to_ascii_lowercase());
    match lower.as_deref() {
        Some("sh") | Some("sz") => &trimmed[2..],
        _ => trimmed,
    }
}

/// 소문자 접두어 형식 (`sh600000`).
pub fn prefixed_lower(code: &str) -> String {
    format!("{}{}", exchange_of(code).prefix(), bare_code(code))
}

/// 대문자 접두어 형식 (`SH600000`).
pub fn prefixed_upper(code: &str) -> String {
    prefixed_lower(code).to_ascii_uppercase()
}
