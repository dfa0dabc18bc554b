//! PostgreSQL 일봉 저장소.
//!
//! # 동작 방식
//!
//! 1. 동기화 배치가 끝나면 종목별 일봉을 `upsert_all`로 한 트랜잭션에 저장
//! 2. (symbol, date) 충돌 시 모든 값 컬럼을 덮어쓰고 `updated_at` 갱신
//! 3. 조회는 최신 N개를 가져온 뒤 오래된 순으로 뒤집어 반환

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use tidewatch_core::OhlcvBar;
use tracing::{debug, info, instrument};

use super::{BarStore, UpsertSummary};
use crate::error::{DataError, Result};

/// UNNEST 일괄 삽입 청크 크기.
const INSERT_CHUNK: usize = 500;

/// 일봉 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct BarRecord {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    pub amount: Decimal,
}

impl From<BarRecord> for OhlcvBar {
    fn from(r: BarRecord) -> Self {
        OhlcvBar {
            symbol: r.symbol,
            date: r.date,
            open: r.open,
            close: r.close,
            high: r.high,
            low: r.low,
            volume: r.volume,
            amount: r.amount,
        }
    }
}

/// 날짜 중복을 제거합니다 (같은 날짜는 마지막 값 유지, 날짜순 정렬).
///
/// 한 INSERT 문 안에 같은 키가 두 번 나오면 `ON CONFLICT DO UPDATE`가 실패합니다.
pub fn dedupe_by_date(bars: &[OhlcvBar]) -> Vec<OhlcvBar> {
    let by_date: BTreeMap<NaiveDate, &OhlcvBar> = bars.iter().map(|b| (b.date, b)).collect();
    by_date.into_values().cloned().collect()
}

/// PostgreSQL 일봉 저장소.
#[derive(Clone)]
pub struct PgBarStore {
    pool: PgPool,
}

impl PgBarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 한 종목의 일봉을 주어진 연결(풀 연결 또는 트랜잭션)로 upsert합니다.
    async fn insert_bars(conn: &mut PgConnection, symbol: &str, bars: &[OhlcvBar]) -> Result<usize> {
        let bars = dedupe_by_date(bars);
        let mut written = 0usize;

        for chunk in bars.chunks(INSERT_CHUNK) {
            let dates: Vec<NaiveDate> = chunk.iter().map(|b| b.date).collect();
            let opens: Vec<Decimal> = chunk.iter().map(|b| b.open).collect();
            let closes: Vec<Decimal> = chunk.iter().map(|b| b.close).collect();
            let highs: Vec<Decimal> = chunk.iter().map(|b| b.high).collect();
            let lows: Vec<Decimal> = chunk.iter().map(|b| b.low).collect();
            let volumes: Vec<Decimal> = chunk.iter().map(|b| b.volume).collect();
            let amounts: Vec<Decimal> = chunk.iter().map(|b| b.amount).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO ohlcv_daily (symbol, date, open, close, high, low, volume, amount)
                SELECT $1, t.date, t.open, t.close, t.high, t.low, t.volume, t.amount
                FROM UNNEST(
                    $2::date[], $3::numeric[], $4::numeric[], $5::numeric[],
                    $6::numeric[], $7::numeric[], $8::numeric[]
                ) AS t(date, open, close, high, low, volume, amount)
                ON CONFLICT (symbol, date) DO UPDATE SET
                    open = EXCLUDED.open,
                    close = EXCLUDED.close,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    volume = EXCLUDED.volume,
                    amount = EXCLUDED.amount,
                    updated_at = NOW()
                "#,
            )
            .bind(symbol)
            .bind(&dates)
            .bind(&opens)
            .bind(&closes)
            .bind(&highs)
            .bind(&lows)
            .bind(&volumes)
            .bind(&amounts)
            .execute(&mut *conn)
            .await
            .map_err(|e| DataError::write("ohlcv_daily", e))?;

            written += result.rows_affected() as usize;
        }

        Ok(written)
    }
}

#[async_trait]
impl BarStore for PgBarStore {
    #[instrument(skip(self, bars), fields(count = bars.len()))]
    async fn upsert_batch(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.acquire().await?;
        let written = Self::insert_bars(&mut conn, symbol, bars).await?;
        debug!(symbol = symbol, written = written, "일봉 저장");
        Ok(written)
    }

    #[instrument(skip(self, batches), fields(symbols = batches.len()))]
    async fn upsert_all(&self, batches: &HashMap<String, Vec<OhlcvBar>>) -> Result<UpsertSummary> {
        let summary = UpsertSummary::from_batches(batches);
        if summary.total_bars == 0 {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await?;
        for (symbol, bars) in batches.iter().filter(|(_, b)| !b.is_empty()) {
            Self::insert_bars(&mut *tx, symbol, bars).await?;
        }
        tx.commit().await?;

        info!(
            symbols_written = summary.symbols_written,
            symbols_submitted = summary.symbols_submitted,
            total_bars = summary.total_bars,
            "일봉 일괄 저장 완료"
        );
        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let row: Option<(Option<NaiveDate>,)> =
            sqlx::query_as("SELECT MAX(date) FROM ohlcv_daily WHERE symbol = $1")
                .bind(symbol)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(d,)| d))
    }

    #[instrument(skip(self, symbols), fields(count = symbols.len()))]
    async fn latest_dates_batch(&self, symbols: &[String]) -> Result<HashMap<String, NaiveDate>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, NaiveDate)> = sqlx::query_as(
            r#"
            SELECT symbol, MAX(date)
            FROM ohlcv_daily
            WHERE symbol = ANY($1)
            GROUP BY symbol
            "#,
        )
        .bind(symbols)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn read(&self, symbol: &str, limit: usize) -> Result<Vec<OhlcvBar>> {
        let records: Vec<BarRecord> = sqlx::query_as(
            r#"
            SELECT symbol, date, open, close, high, low, volume, amount
            FROM ohlcv_daily
            WHERE symbol = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        // 시간순 정렬 (오래된 것부터)
        let mut bars: Vec<OhlcvBar> = records.into_iter().map(OhlcvBar::from).collect();
        bars.reverse();
        Ok(bars)
    }

    #[instrument(skip(self, symbols), fields(count = symbols.len()))]
    async fn read_batch(
        &self,
        symbols: &[String],
        limit: usize,
    ) -> Result<HashMap<String, Vec<OhlcvBar>>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let records: Vec<BarRecord> = sqlx::query_as(
            r#"
            SELECT symbol, date, open, close, high, low, volume, amount
            FROM (
                SELECT *, ROW_NUMBER() OVER (PARTITION BY symbol ORDER BY date DESC) AS rn
                FROM ohlcv_daily
                WHERE symbol = ANY($1)
            ) recent
            WHERE rn <= $2
            ORDER BY symbol, date ASC
            "#,
        )
        .bind(symbols)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out: HashMap<String, Vec<OhlcvBar>> = HashMap::new();
        for record in records {
            out.entry(record.symbol.clone())
                .or_default()
                .push(OhlcvBar::from(record));
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    async fn read_range(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>> {
        let records: Vec<BarRecord> = sqlx::query_as(
            r#"
            SELECT symbol, date, open, close, high, low, volume, amount
            FROM ohlcv_daily
            WHERE symbol = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date ASC
            "#,
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(OhlcvBar::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_dedupe_keeps_last_and_sorts() {
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let bars = vec![
            OhlcvBar::flat("600000", d2, dec!(11)),
            OhlcvBar::flat("600000", d1, dec!(10)),
            OhlcvBar::flat("600000", d2, dec!(12)),
        ];

        let out = dedupe_by_date(&bars);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d1);
        assert_eq!(out[1].close, dec!(12));
    }
}
