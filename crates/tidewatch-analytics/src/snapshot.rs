//! 종목별 지표 스냅샷 생성.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tidewatch_core::{Instrument, MonitorRow, MonitorSnapshot, OhlcvBar, Timeframe};
use tracing::debug;

use crate::indicators::IndicatorEngine;
use crate::signals::{classify_technical, classify_trend, classify_valuation, reasonable_price_range};

/// 스냅샷 계산에 필요한 최소 저장 일봉 수.
pub const MIN_SNAPSHOT_POINTS: usize = 188;

/// 스냅샷 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotBuilder {
    engine: IndicatorEngine,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 일봉으로부터 스냅샷을 계산합니다.
    ///
    /// 일봉은 날짜 오름차순이어야 하며 188개 미만이면 `None`을 반환합니다.
    /// 모든 EMA는 저장된 일봉 종가로 계산하고, 타임프레임은 추세 EMA 조합만
    /// 고릅니다. EPS는 비워 둡니다.
    pub fn build(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        daily_bars: &[OhlcvBar],
        current_price: Decimal,
        now: DateTime<Utc>,
    ) -> Option<MonitorSnapshot> {
        if daily_bars.len() < MIN_SNAPSHOT_POINTS {
            debug!(
                symbol = symbol,
                timeframe = %timeframe,
                points = daily_bars.len(),
                "데이터 부족, 스냅샷 생략"
            );
            return None;
        }

        let closes: Vec<Decimal> = daily_bars.iter().map(|b| b.close).collect();

        Some(MonitorSnapshot {
            symbol: symbol.to_string(),
            timeframe,
            current_price: current_price.round_dp(2),
            ema144: self.engine.ema(&closes, 144),
            ema188: self.engine.ema(&closes, 188),
            trend: self.engine.trend_emas(&closes, timeframe),
            eps_forecast: None,
            created_at: now,
        })
    }
}

/// 스냅샷에 분류 결과를 붙여 대시보드 행을 만듭니다.
pub fn to_monitor_row(
    instrument: &Instrument,
    snapshot: &MonitorSnapshot,
    from_cache: bool,
) -> MonitorRow {
    let price = snapshot.current_price;
    let (pe_min, pe_max) = (instrument.reasonable_pe_min, instrument.reasonable_pe_max);

    MonitorRow {
        code: instrument.code.clone(),
        name: instrument.name.clone(),
        timeframe: snapshot.timeframe,
        current_price: price,
        ema144: snapshot.ema144,
        ema188: snapshot.ema188,
        trend_emas: snapshot.named_trend_emas(),
        eps_forecast: snapshot.eps_forecast,
        reasonable_pe_min: pe_min,
        reasonable_pe_max: pe_max,
        reasonable_price: reasonable_price_range(snapshot.eps_forecast, pe_min, pe_max),
        valuation_status: classify_valuation(price, snapshot.eps_forecast, pe_min, pe_max),
        technical_status: classify_technical(price, snapshot.ema144, snapshot.ema188),
        trend: classify_trend(&snapshot.trend),
        snapshot_at: snapshot.created_at,
        from_cache,
    }
}
