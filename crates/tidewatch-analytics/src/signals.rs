//! 분류 규칙 (밸류에이션 / 기술적 / 추세).

use rust_decimal::Decimal;
use tidewatch_core::{PriceRange, TechnicalStatus, Trend, TrendEmas, ValuationStatus};

/// 합리 가격 구간 `[eps * pe_min, eps * pe_max]` (소수 둘째 자리 반올림).
///
/// EPS가 없으면 `None`.
pub fn reasonable_price_range(
    eps: Option<Decimal>,
    pe_min: Decimal,
    pe_max: Decimal,
) -> Option<PriceRange> {
    let eps = eps?;
    Some(PriceRange {
        min: (eps * pe_min).round_dp(2),
        max: (eps * pe_max).round_dp(2),
    })
}

/// 밸류에이션 상태.
///
/// 구간 아래면 저평가, 위면 고평가, 경계 포함 구간 내부면 적정입니다.
pub fn classify_valuation(
    price: Decimal,
    eps: Option<Decimal>,
    pe_min: Decimal,
    pe_max: Decimal,
) -> ValuationStatus {
    match reasonable_price_range(eps, pe_min, pe_max) {
        None => ValuationStatus::Unknown,
        Some(range) if price < range.min => ValuationStatus::Undervalued,
        Some(range) if price > range.max => ValuationStatus::Overvalued,
        Some(_) => ValuationStatus::Normal,
    }
}

/// 기술적 상태 (EMA144/EMA188 밴드).
pub fn classify_technical(
    price: Decimal,
    ema144: Option<Decimal>,
    ema188: Option<Decimal>,
) -> TechnicalStatus {
    let (Some(a), Some(b)) = (ema144, ema188) else {
        return TechnicalStatus::NoSignal;
    };

    let lower = a.min(b);
    let upper = a.max(b);

    if price < lower {
        TechnicalStatus::Breakdown
    } else if price <= upper {
        TechnicalStatus::Accumulate
    } else {
        TechnicalStatus::NoSignal
    }
}

/// 추세 판단.
pub fn classify_trend(emas: &TrendEmas) -> Trend {
    let (Some(short), Some(medium), Some(long)) = (emas.short, emas.medium, emas.long) else {
        return Trend::Unknown;
    };

    if short > medium && medium > long {
        Trend::Bullish
    } else if short < medium && medium < long {
        Trend::Bearish
    } else {
        Trend::Choppy
    }
}
