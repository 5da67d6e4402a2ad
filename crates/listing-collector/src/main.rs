//! Standalone listing collector CLI.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use listing_collector::modules::{self, SourceSelection};
use listing_collector::{CollectorConfig, SyncMode};
use listing_core::logging::{init_logging, LogConfig, LogFormat};
use listing_core::{DeleteOutcome, SymbolData, SymbolKey};
use listing_data::{Database, MemorySymbolStore, PgSymbolStore, SymbolStore, SyncEngine};

#[derive(Parser)]
#[command(name = "listing-collector")]
#[command(about = "NYSE/NASDAQ listing collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 (TOML). 없으면 환경변수에서 로드
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 거래소 종목 동기화
    Sync {
        /// 대상 거래소
        #[arg(long, value_enum, default_value = "all")]
        source: SourceSelection,

        /// 저장 방식 (기본: 설정값)
        #[arg(long, value_enum)]
        mode: Option<SyncMode>,

        /// Provider당 최대 종목 수
        #[arg(long)]
        limit: Option<usize>,

        /// DB 대신 메모리 저장소 사용
        #[arg(long)]
        dry_run: bool,
    },

    /// JSON 파일에서 종목 가져오기
    Import {
        file: PathBuf,

        #[arg(long, value_enum)]
        mode: Option<SyncMode>,

        #[arg(long)]
        dry_run: bool,
    },

    /// 거래소 종목을 JSON으로 내보내기 (저장하지 않음)
    Export {
        #[arg(long, value_enum, default_value = "all")]
        source: SourceSelection,

        /// 출력 파일 (없으면 표준 출력)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// 종목 한 건 upsert
    Upsert {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        market: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "EQUITY")]
        instrument: String,
    },

    /// 종목 한 건 삭제
    Delete {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        market: String,
    },

    /// 종목 조회
    Show {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        market: String,
    },

    /// 시장별 종목 수
    Stats,

    /// 마이그레이션 적용
    Migrate,

    /// 데몬 모드: 주기적으로 종목 동기화 실행
    Daemon,
}

impl Commands {
    fn is_dry_run(&self) -> bool {
        matches!(
            self,
            Commands::Sync { dry_run: true, .. } | Commands::Import { dry_run: true, .. }
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    let log_config = match std::env::var("RUST_LOG") {
        Ok(_) => LogConfig::from_env(),
        Err(_) => LogConfig::for_workspace(&cli.log_level),
    };
    let log_config = match cli.log_format {
        Some(format) => log_config.with_format(format),
        None => log_config,
    };
    init_logging(log_config).map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Listing Collector 시작");

    // 설정 로드
    let config = match &cli.config {
        Some(path) => CollectorConfig::load(path),
        None => CollectorConfig::from_env(),
    }
    .context("설정 로드 실패")?;
    tracing::debug!(
        max_connections = config.database.max_connections,
        mode = ?config.sync.mode,
        "설정 로드 완료"
    );

    // DB가 필요 없는 명령
    if let Commands::Export {
        source,
        output,
        limit,
    } = &cli.command
    {
        let sources = modules::build_sources(&config.sources, *source);
        let params = config.sources.fetch_params(*limit);
        let count = modules::export_sources(&sources, &params, output.as_deref()).await?;
        tracing::info!(count, "Listing Collector 종료");
        return Ok(());
    }

    if cli.command.is_dry_run() {
        tracing::warn!("드라이런: 메모리 저장소 사용, 결과는 저장되지 않습니다");
        let engine = SyncEngine::new(MemorySymbolStore::new());
        return run(&engine, &config, cli.command).await;
    }

    // DB 연결
    let db = Database::connect(&config.database).await?;

    let result = match cli.command {
        Commands::Migrate => db.migrate().await.map_err(anyhow::Error::from),
        command => {
            let engine = SyncEngine::new(PgSymbolStore::new(db.clone(), &config.database));
            run(&engine, &config, command).await
        }
    };

    // 진행 중인 쿼리가 끝난 뒤 연결 종료
    db.close().await;
    tracing::info!("Listing Collector 종료");

    result
}

async fn run<S: SymbolStore>(
    engine: &SyncEngine<S>,
    config: &CollectorConfig,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Sync {
            source,
            mode,
            limit,
            ..
        } => {
            let mode = mode.unwrap_or(config.sync.mode);
            let stats = modules::sync_symbols(engine, config, source, mode, limit).await?;
            stats.log_summary("종목 동기화");
        }
        Commands::Import { file, mode, .. } => {
            let mode = mode.unwrap_or(config.sync.mode);
            let outcome = modules::import_file(engine, &file, mode).await?;
            println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
            for failed in &outcome.failed {
                tracing::warn!(
                    index = failed.index,
                    symbol = %failed.symbol,
                    reason = %failed.reason,
                    "가져오기 실패 레코드"
                );
            }
        }
        Commands::Upsert {
            symbol,
            market,
            name,
            instrument,
        } => {
            let key = SymbolKey::new(&symbol, &market)?;
            let stored = engine
                .upsert(&key, SymbolData::new(symbol, name, market, instrument))
                .await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Commands::Delete { symbol, market } => {
            let key = SymbolKey::new(&symbol, &market)?;
            match engine.delete_one(&key).await? {
                DeleteOutcome::Deleted(stored) => {
                    println!("{}", serde_json::to_string_pretty(&stored)?)
                }
                DeleteOutcome::NotFound => println!("{} 없음", key),
            }
        }
        Commands::Show { symbol, market } => {
            let key = SymbolKey::new(&symbol, &market)?;
            match engine.find_one(&key).await? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                None => println!("{} 없음", key),
            }
        }
        Commands::Stats => {
            let total = engine.store().count().await?;
            for (market, count) in engine.store().count_by_market().await? {
                println!("{:<10} {:>8}", market, count);
            }
            println!("{:<10} {:>8}", "TOTAL", total);
        }
        Commands::Daemon => daemon(engine, config).await,
        Commands::Export { .. } | Commands::Migrate => {
            anyhow::bail!("이 명령은 저장소 없이 실행됩니다")
        }
    }

    Ok(())
}

/// 주기 실행 루프. 종료 신호는 워크플로우 사이에서만 확인하며 진행 중인 쓰기는 끝까지 수행한다.
async fn daemon<S: SymbolStore>(engine: &SyncEngine<S>, config: &CollectorConfig) {
    tracing::info!(
        "=== 데몬 모드 시작 (주기: {}분) ===",
        config.daemon.interval_minutes
    );

    let mut interval = tokio::time::interval(config.daemon.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                break;
            }
            _ = interval.tick() => {
                tracing::info!("=== 워크플로우 실행 시작 ===");

                match modules::sync_symbols(
                    engine,
                    config,
                    SourceSelection::All,
                    config.sync.mode,
                    None,
                )
                .await
                {
                    Ok(stats) => stats.log_summary("종목 동기화"),
                    Err(e) => tracing::error!("종목 동기화 실패: {}", e),
                }

                tracing::info!(
                    "=== 워크플로우 완료, 다음 실행: {}분 후 ===",
                    config.daemon.interval_minutes
                );
            }
        }
    }
}

/// Ctrl+C 또는 SIGTERM 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C 핸들러 등록 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM 핸들러 등록 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Ctrl+C 수신"),
        _ = terminate => tracing::warn!("SIGTERM 수신"),
    }
}
