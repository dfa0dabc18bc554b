//! TideWatch collector CLI.

use anyhow::Context as _;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use clap::{Parser, Subcommand};
use tidewatch_collector::modules::{
    self, MonitorService, QuoteFetcher, RefreshJob, StalenessDetector, SyncOptions,
    UpdateLogService,
};
use tidewatch_collector::CollectorContext;
use tidewatch_core::config::SyncScope;
use tidewatch_core::logging::{init_logging, LogConfig};
use tidewatch_core::AppConfig;

#[derive(Parser)]
#[command(name = "tidewatch-collector")]
#[command(about = "TideWatch K-line sync & indicator pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, default_value = "config/default.toml")]
    config: String,

    /// 로그 레벨 (설정 파일 값 대신 사용)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(clap::Args, Clone, Copy)]
struct SyncArgs {
    /// 기존 데이터와 관계없이 전체 이력 재수집
    #[arg(long)]
    force: bool,

    /// 관심 종목 대신 전체 유니버스 동기화
    #[arg(long)]
    universe: bool,
}

impl SyncArgs {
    fn options(self, default_scope: SyncScope) -> SyncOptions {
        SyncOptions {
            force: self.force,
            scope: if self.universe {
                SyncScope::Universe
            } else {
                default_scope
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 일봉 동기화만 실행
    SyncKlines(SyncArgs),

    /// 전체 갱신 (동기화 → 스냅샷 재계산 → 업데이트 로그)
    Refresh(SyncArgs),

    /// 모니터 데이터 출력 (JSON)
    Monitor,

    /// 마지막 업데이트 로그 출력
    Status,

    /// 정기 갱신 필요 여부 출력
    ShouldRefresh,

    /// 현재가 조회 (재시도 후 실패하면 기본값 사용)
    Quote {
        symbol: String,
        /// 조회 실패 시 사용할 가격
        #[arg(long)]
        default: Option<Decimal>,
    },

    /// 저장된 일봉 내보내기 (JSON Lines)
    Export {
        symbol: String,
        /// 시작일 (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// 종료일 (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// 오래된 스냅샷/EPS 캐시 삭제
    CleanCache,

    /// 데이터베이스 마이그레이션 실행
    Migrate,

    /// 데몬 모드: 주기적으로 갱신 필요 여부를 확인하고 갱신
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config).context("설정 로드 실패")?;

    let mut log_config = LogConfig::from(&config.logging);
    if let Some(level) = cli.log_level.as_deref() {
        log_config = log_config.with_level(level);
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("TideWatch Collector 시작");

    let (ctx, db) = CollectorContext::connect(config).await?;
    tracing::info!("데이터베이스 연결 성공");

    let default_scope = ctx.config.sync.scope;

    match cli.command {
        Commands::SyncKlines(args) => {
            let sync = modules::KlineSyncService::new(&ctx);
            let stats = sync.sync(args.options(default_scope)).await?;
            stats.log_summary("일봉 동기화");
        }
        Commands::Refresh(args) => {
            let report = RefreshJob::new(&ctx).run(args.options(default_scope)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Monitor => {
            let rows = MonitorService::new(&ctx).get_monitor_data().await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Status => {
            let service = UpdateLogService::new(&ctx);
            let updated_today = service.has_updated_today().await?;
            match service.last_update_info().await? {
                Some(log) => {
                    println!("{}", serde_json::to_string_pretty(&log)?);
                    tracing::info!(updated_today = updated_today, "업데이트 상태");
                }
                None => tracing::info!("업데이트 기록 없음"),
            }
        }
        Commands::ShouldRefresh => {
            let detector =
                StalenessDetector::new(ctx.instruments.clone(), ctx.bars.clone(), ctx.clock.clone());
            let decision = detector.should_refresh().await?;
            println!("due={} reason={}", decision.due, decision.reason);
        }
        Commands::Quote { symbol, default } => {
            match QuoteFetcher::new(&ctx).price_or(&symbol, default).await {
                Some(price) => println!("{} {}", symbol, price),
                None => tracing::warn!(symbol = %symbol, "현재가 조회 실패"),
            }
        }
        Commands::Export { symbol, start, end } => {
            let mut out = std::io::stdout().lock();
            modules::export_bars(ctx.bars.as_ref(), &symbol, start, end, &mut out).await?;
        }
        Commands::CleanCache => {
            let snapshots = ctx.snapshots.clean_old(ctx.config.cache.retention()).await?;
            let eps = ctx.eps_cache.clean_old(ctx.config.eps.ttl()).await?;
            tracing::info!(snapshots = snapshots, eps = eps, "캐시 정리 완료");
        }
        Commands::Migrate => {
            db.migrate().await?;
            tracing::info!("마이그레이션 완료");
        }
        Commands::Daemon => {
            run_daemon(&ctx).await;
        }
    }

    db.close().await;
    tracing::info!("TideWatch Collector 종료");

    Ok(())
}

/// 주기마다 `should_refresh`를 확인하고 필요할 때만 갱신합니다.
async fn run_daemon(ctx: &CollectorContext) {
    let interval_minutes = ctx.config.daemon.interval_minutes;
    tracing::info!("=== 데몬 모드 시작 (주기: {}분) ===", interval_minutes);

    let detector = StalenessDetector::new(ctx.instruments.clone(), ctx.bars.clone(), ctx.clock.clone());
    let job = RefreshJob::new(ctx);
    let options = SyncOptions {
        force: false,
        scope: ctx.config.sync.scope,
    };

    let mut interval = tokio::time::interval(ctx.config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                match detector.should_refresh().await {
                    Ok(decision) if decision.due => {
                        if let Err(e) = job.run(options).await {
                            tracing::error!("갱신 실패: {}", e);
                        }
                    }
                    Ok(decision) => {
                        tracing::info!(reason = %decision.reason, "갱신 생략");
                    }
                    Err(e) => {
                        tracing::error!("갱신 필요 여부 판단 실패: {}", e);
                    }
                }

                tracing::info!("다음 확인: {}분 후", interval_minutes);
            }
        }
    }
}
