//! 시그널 스캐너 서버.
//!
//! 스캔 스케줄러, 브로드캐스터, REST/WebSocket 서버를 한 프로세스에서 실행합니다.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::StatusCode;
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use scanner_api::{create_router, AppState};
use scanner_core::{init_logging, AppConfig, LogConfig};
use scanner_data::{Database, MemorySignalStore, PgSignalStore, SignalStore};
use scanner_engine::ScanScheduler;
use scanner_exchange::{
    BinanceClient, BinanceConfig, MarketDataProvider, RandomWalk, SimulatedProvider,
};
use scanner_notification::{Broadcaster, NotificationManager, NotificationSender, TelegramSender};

#[derive(Parser)]
#[command(name = "signal-scanner")]
#[command(about = "암호화폐 시그널 감지 및 점수화 엔진", version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 스캐너와 API 서버 실행
    Serve {
        /// 거래소 대신 시뮬레이션 시세 사용
        #[arg(long)]
        simulated: bool,
    },
    /// 적용된 설정을 TOML로 출력
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;

    match cli.command {
        Commands::ShowConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Serve { simulated } => {
            init_logging(LogConfig::from(&config.logging))
                .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;
            serve(config, simulated).await
        }
    }
}

async fn serve(config: AppConfig, simulated: bool) -> anyhow::Result<()> {
    info!(
        symbols = config.market.symbols.len(),
        timeframes = ?config.market.timeframes,
        simulated,
        "시그널 스캐너 시작"
    );

    let store = create_store(&config).await?;
    let provider = create_provider(&config, simulated)?;

    let mut broadcaster = Broadcaster::new(&config.broadcast, store.clone());
    let telegram = TelegramSender::new(config.notifications.telegram.clone());
    if telegram.is_enabled() {
        let mut notifier = NotificationManager::default();
        notifier.add_sender(telegram);
        broadcaster = broadcaster.with_notifier(notifier);
        info!("텔레그램 알림 활성화");
    }
    let broadcaster = Arc::new(broadcaster);

    let shutdown_token = CancellationToken::new();

    // 브로드캐스터는 워커가 모두 종료된 뒤에 멈춤
    let broadcaster_token = CancellationToken::new();
    let (signal_tx, signal_rx) = mpsc::channel(config.scheduler.channel_capacity);
    let broadcaster_task = tokio::spawn(
        broadcaster
            .clone()
            .run(signal_rx, broadcaster_token.clone()),
    );

    let mut scheduler = ScanScheduler::new(config.clone(), provider)
        .with_cancellation(shutdown_token.child_token());
    let workers = scheduler.start(signal_tx)?;
    info!(workers, "스캔 스케줄러 시작");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("잘못된 서버 주소")?;

    let state = Arc::new(AppState::new(Arc::new(config), store, broadcaster));
    let app = with_layers(create_router(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API 서버 리스닝");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    // 진행 중인 스캔을 마친 뒤 워커 종료, 큐에 남은 시그널은 브로드캐스터가 처리
    shutdown_token.cancel();
    scheduler.shutdown().await;
    broadcaster_token.cancel();
    if let Err(e) = broadcaster_task.await {
        warn!(error = %e, "브로드캐스터 태스크 비정상 종료");
    }

    info!("시그널 스캐너 종료");
    Ok(())
}

/// 데이터베이스 URL이 있으면 PostgreSQL, 없으면 메모리 저장소.
async fn create_store(config: &AppConfig) -> anyhow::Result<Arc<dyn SignalStore>> {
    match config.database.url {
        Some(_) => {
            let db = Database::connect(&config.database)
                .await
                .context("데이터베이스 연결 실패")?;
            if config.database.run_migrations {
                db.migrate().await.context("마이그레이션 실패")?;
            }
            Ok(Arc::new(PgSignalStore::new(db)))
        }
        None => {
            warn!("DATABASE_URL 미설정, 메모리 저장소 사용 (재시작 시 시그널 유실)");
            Ok(Arc::new(MemorySignalStore::new()))
        }
    }
}

fn create_provider(
    config: &AppConfig,
    simulated: bool,
) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    if simulated {
        let walk = RandomWalk {
            history: config.market.candle_limit.max(RandomWalk::default().history),
            ..RandomWalk::default()
        };
        return Ok(Arc::new(SimulatedProvider::new().with_random_walk(walk)));
    }

    let client = BinanceClient::new(BinanceConfig::from(&config.market))?;
    Ok(Arc::new(client))
}

fn with_layers(router: Router) -> Router {
    router
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => AllowOrigin::any(),
    };

    // 조회 전용 API
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT])
}

async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C 핸들러 설치 실패");
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
                warn!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
