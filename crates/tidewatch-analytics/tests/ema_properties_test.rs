//! EMA 회귀/속성 테스트

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tidewatch_analytics::IndicatorEngine;

fn cents(values: &[u32]) -> Vec<Decimal> {
    values.iter().map(|v| Decimal::new(*v as i64, 2)).collect()
}

/// 5일 주기로 출렁이며 10일마다 1씩 오르는 종가.
fn wave(n: usize) -> Vec<Decimal> {
    const BASE: [i64; 5] = [10, 12, 14, 13, 15];
    (0..n)
        .map(|i| Decimal::from(BASE[i % 5] + (i / 10) as i64))
        .collect()
}

#[test]
fn test_long_emas_fixed_values() {
    let engine = IndicatorEngine::new();
    let closes = wave(188);

    assert_eq!(engine.ema(&closes, 144), Some(dec!(24.26)));
    assert_eq!(engine.ema(&closes, 188), Some(dec!(22.66)));
}

#[test]
fn test_ema188_needs_188_points() {
    let engine = IndicatorEngine::new();
    let closes = wave(187);

    assert_eq!(engine.ema(&closes, 188), None);
    assert!(engine.ema(&closes, 144).is_some());
}

proptest! {
    /// EMA는 입력의 최소/최대 범위를 벗어나지 않는다
    #[test]
    fn ema_stays_within_price_range(values in prop::collection::vec(1u32..1_000_000, 1..300), period in 1usize..200) {
        let prices = cents(&values);
        let engine = IndicatorEngine::new();
        let ema = engine.ema(&prices, period);

        if prices.len() < period {
            prop_assert!(ema.is_none());
        } else {
            let ema = ema.unwrap();
            let min = prices.iter().min().copied().unwrap();
            let max = prices.iter().max().copied().unwrap();
            prop_assert!(ema >= min.round_dp(2) && ema <= max.round_dp(2));
        }
    }

    /// 같은 값을 충분히 덧붙이면 EMA는 그 값으로 수렴한다
    #[test]
    fn ema_converges_to_repeated_price(values in prop::collection::vec(1u32..100_000, 1..50), target in 1u32..100_000) {
        let mut prices = cents(&values);
        let target = Decimal::new(target as i64, 2);
        prices.extend(std::iter::repeat(target).take(400));

        let engine = IndicatorEngine::new();
        prop_assert_eq!(engine.ema(&prices, 5), Some(target.round_dp(2)));
    }
}
