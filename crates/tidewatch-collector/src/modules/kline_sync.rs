//! 일봉 증분 동기화.
//!
//! # 동작
//! 1. 증분 실행이면 `StalenessDetector`가 고른 갱신 대상만, 강제 실행이면
//!    활성 종목 전체를 대상으로 삼음
//! 2. 대상 종목의 최신 일봉 날짜를 한 번에 조회
//! 3. 종목별 시작일 계산 (마지막 날짜 + 1일, 강제/신규는 전체 이력)
//! 4. 세마포어로 동시 요청 수를 제한하며 종목별 타임아웃을 걸어 조회
//! 5. 받은 일봉을 `upsert_all` 한 번으로 저장
//!
//! 종목 하나의 실패나 타임아웃은 그 종목만 실패로 집계되고 배치는 계속됩니다.
//! 저장소 오류는 배치 전체를 실패시킵니다.

use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tidewatch_core::config::{SyncConfig, SyncScope};
use tidewatch_core::{OhlcvBar, SharedClock};
use tidewatch_data::{BarStore, InstrumentStore, MarketDataProvider};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::staleness::StalenessDetector;
use crate::context::CollectorContext;
use crate::limiter::ConcurrencyLimiter;
use crate::stats::CollectionStats;
use crate::Result;

/// 동기화 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// 기존 데이터와 관계없이 전체 이력 재수집
    pub force: bool,
    /// 관심 종목 / 전체 유니버스
    pub scope: SyncScope,
}

/// 종목 하나의 조회 결과.
#[derive(Debug)]
enum FetchOutcome {
    NewData(Vec<OhlcvBar>),
    UpToDate,
    Failed(String),
    TimedOut,
}

/// 일봉 동기화 서비스.
#[derive(Clone)]
pub struct KlineSyncService {
    bars: Arc<dyn BarStore>,
    instruments: Arc<dyn InstrumentStore>,
    market: Arc<dyn MarketDataProvider>,
    limiter: ConcurrencyLimiter,
    clock: SharedClock,
    detector: StalenessDetector,
    config: SyncConfig,
}

impl KlineSyncService {
    pub fn new(ctx: &CollectorContext) -> Self {
        Self {
            bars: ctx.bars.clone(),
            instruments: ctx.instruments.clone(),
            market: ctx.market.clone(),
            limiter: ctx.limiter.clone(),
            clock: ctx.clock.clone(),
            detector: StalenessDetector::new(
                ctx.instruments.clone(),
                ctx.bars.clone(),
                ctx.clock.clone(),
            ),
            config: ctx.config.sync.clone(),
        }
    }

    /// 옵션에 따라 관심 종목 또는 전체 유니버스를 동기화합니다.
    pub async fn sync(&self, options: SyncOptions) -> Result<CollectionStats> {
        let start = Instant::now();
        info!(scope = ?options.scope, force = options.force, "일봉 동기화 시작");

        let mut stats = match options.scope {
            SyncScope::Watchlist if options.force => {
                let codes = self.detector.universe(SyncScope::Watchlist).await?;
                self.sync_symbols(&codes, true).await?
            }
            SyncScope::Watchlist => {
                let due = self
                    .detector
                    .due_symbols(SyncScope::Watchlist, self.config.stale_days)
                    .await?;
                if due.is_empty() {
                    info!("갱신 대상 없음");
                }
                self.sync_symbols(&due, false).await?
            }
            SyncScope::Universe => self.sync_universe(options.force).await?,
        };

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// 유니버스를 페이지 단위로 처리합니다.
    ///
    /// 한 페이지를 조회/저장하고 시도한 종목 전체(실패 포함)에 처리 시각을
    /// 찍은 뒤 다음 페이지를 요청합니다.
    async fn sync_universe(&self, force: bool) -> Result<CollectionStats> {
        let page_size = self.limiter.limit();
        let threshold = Duration::hours(self.config.pending_update_hours);
        let mut seen = HashSet::new();
        let mut stats = CollectionStats::new();
        let mut page_no = 0usize;

        loop {
            let page: Vec<String> = self
                .instruments
                .pending_update(page_size, threshold)
                .await?
                .into_iter()
                .map(|s| s.code)
                .filter(|code| !seen.contains(code))
                .collect();

            if page.is_empty() {
                break;
            }
            page_no += 1;

            let page_stats = self.sync_symbols(&page, force).await?;
            self.instruments.mark_updated(&page).await?;
            debug!(
                page = page_no,
                symbols = page.len(),
                new_data = page_stats.new_data,
                failed = page_stats.failed,
                "페이지 처리 완료"
            );

            stats.merge(&page_stats);
            seen.extend(page);
        }

        info!(pages = page_no, symbols = stats.total, "유니버스 동기화 완료");
        Ok(stats)
    }

    fn start_date(&self, latest: Option<NaiveDate>, force: bool) -> NaiveDate {
        match latest {
            Some(date) if !force => date + Duration::days(1),
            _ => self.config.history_start,
        }
    }

    /// 주어진 종목들을 한 배치로 동기화합니다.
    pub async fn sync_symbols(&self, codes: &[String], force: bool) -> Result<CollectionStats> {
        let mut stats = CollectionStats::new();
        if codes.is_empty() {
            return Ok(stats);
        }

        let latest = self.bars.latest_dates_batch(codes).await?;
        let today = self.clock.market_today();
        let fetch_timeout = self.config.fetch_timeout();

        let mut tasks = JoinSet::new();
        let mut outcomes: Vec<(String, FetchOutcome)> = Vec::with_capacity(codes.len());

        for code in codes {
            let start = self.start_date(latest.get(code).copied(), force);
            if start > today {
                outcomes.push((code.clone(), FetchOutcome::UpToDate));
                continue;
            }

            let code = code.clone();
            let market = self.market.clone();
            let limiter = self.limiter.clone();
            tasks.spawn(async move {
                let outcome = match limiter.acquire().await {
                    Ok(_permit) => {
                        match tokio::time::timeout(
                            fetch_timeout,
                            market.fetch_daily_bars(&code, start, today),
                        )
                        .await
                        {
                            Ok(Ok(bars)) if bars.is_empty() => FetchOutcome::UpToDate,
                            Ok(Ok(bars)) => FetchOutcome::NewData(bars),
                            Ok(Err(e)) => FetchOutcome::Failed(e.to_string()),
                            Err(_) => FetchOutcome::TimedOut,
                        }
                    }
                    Err(e) => FetchOutcome::Failed(e.to_string()),
                };
                (code, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => outcomes.push(result),
                Err(e) => {
                    // 패닉한 태스크는 종목을 알 수 없으므로 집계만 함
                    error!(error = %e, "일봉 조회 태스크 실패");
                    stats.total += 1;
                    stats.failed += 1;
                }
            }
        }

        let mut batches: HashMap<String, Vec<OhlcvBar>> = HashMap::new();
        for (code, outcome) in outcomes {
            stats.total += 1;
            match outcome {
                FetchOutcome::NewData(bars) => {
                    stats.new_data += 1;
                    stats.total_klines += bars.len();
                    debug!(symbol = %code, bars = bars.len(), "새 일봉 수신");
                    batches.insert(code, bars);
                }
                FetchOutcome::UpToDate => {
                    stats.no_new_data += 1;
                }
                FetchOutcome::Failed(reason) => {
                    stats.failed += 1;
                    warn!(symbol = %code, error = %reason, "일봉 조회 실패");
                }
                FetchOutcome::TimedOut => {
                    stats.failed += 1;
                    stats.timed_out += 1;
                    warn!(symbol = %code, timeout_secs = fetch_timeout.as_secs(), "일봉 조회 타임아웃");
                }
            }
        }

        if !batches.is_empty() {
            let summary = self.bars.upsert_all(&batches).await?;
            info!(
                symbols_written = summary.symbols_written,
                symbols_submitted = summary.symbols_submitted,
                total_bars = summary.total_bars,
                "일봉 일괄 저장"
            );
        }

        Ok(stats)
    }
}
