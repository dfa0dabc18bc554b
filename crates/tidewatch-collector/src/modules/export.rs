//! 저장된 일봉 내보내기 (JSON Lines).

use chrono::NaiveDate;
use std::io::Write;
use tidewatch_data::BarStore;
use tracing::info;

use crate::error::CollectorError;
use crate::Result;

/// `[start, end]` 구간의 일봉을 한 줄에 하나씩 JSON으로 씁니다.
pub async fn export_bars<W: Write>(
    bars: &dyn BarStore,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    out: &mut W,
) -> Result<usize> {
    let rows = bars.read_range(symbol, start, end).await?;

    for bar in &rows {
        serde_json::to_writer(&mut *out, bar).map_err(|e| CollectorError::Other(Box::new(e)))?;
        out.write_all(b"\n")
            .map_err(|e| CollectorError::Other(Box::new(e)))?;
    }
    out.flush().map_err(|e| CollectorError::Other(Box::new(e)))?;

    info!(symbol = symbol, rows = rows.len(), "일봉 내보내기");
    Ok(rows.len())
}
