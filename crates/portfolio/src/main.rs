use std::sync::Arc;

use color_eyre::eyre;
use structopt::StructOpt;
use tokio::sync::watch;
use tracing::{info, warn};

use brokers::{BrokerClient, GatewayClient, MockBrokerClient};
use portfolio::config::AppConfig;
use portfolio::poller::LedgerPoller;
use portfolio::record::{
    EquityHistoryStore, HistoryQuery, HistoryRange, SqliteSnapshotRepository,
};
use portfolio::server::{self, AppState};

// lib.rs에서 자동으로 dotenv가 로드됨

#[derive(Debug, StructOpt)]
#[structopt(name = "portfolio", about = "포트폴리오 평가액 히스토리 서버")]
enum Command {
    /// API 서버 실행 (PORTFOLIO_POLL_SECS가 있으면 ledger 폴러도 실행)
    Serve,
    /// ledger를 한 번 조회해 평가액 스냅샷 기록
    Record {
        #[structopt(long)]
        account_id: Option<String>,
    },
    /// 버킷 단위 평가액 히스토리를 JSON으로 출력
    History {
        #[structopt(long)]
        account_id: Option<String>,
        /// 1d, 7d, 1y, all
        #[structopt(long, default_value = "1d")]
        range: HistoryRange,
        #[structopt(long)]
        from_ts: Option<i64>,
        #[structopt(long)]
        to_ts: Option<i64>,
        #[structopt(long)]
        max_points: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // init error reporting
    color_eyre::install()?;

    let cmd = Command::from_args();
    let config = AppConfig::from_env();

    // init logging
    let _guards = portfolio::logger::init_tracing(&config.log_dir);

    // 저장소를 열지 못하면 아무것도 할 수 없으므로 바로 종료
    let repository = Arc::new(
        SqliteSnapshotRepository::open(&config.store)
            .await
            .map_err(|e| eyre::eyre!("평가액 저장소 초기화 실패: {}", e))?,
    );
    let store = EquityHistoryStore::new(repository.clone());

    let result = match cmd {
        Command::Serve => run_server(&config, store).await,
        Command::Record { account_id } => {
            let account_id = account_id.unwrap_or_else(|| config.default_account_id.clone());
            run_record(&config, &store, &account_id).await
        }
        Command::History {
            account_id,
            range,
            from_ts,
            to_ts,
            max_points,
        } => {
            let account_id = account_id.unwrap_or_else(|| config.default_account_id.clone());
            let query = HistoryQuery {
                range,
                from_ts,
                to_ts,
                max_points,
            };
            run_history(&store, &account_id, &query).await
        }
    };

    if let Err(e) = repository.close().await {
        warn!("저장소 종료 중 오류: {}", e);
    }

    result
}

fn create_broker(config: &AppConfig) -> eyre::Result<Arc<dyn BrokerClient>> {
    if config.mock_mode {
        let client = MockBrokerClient::from_env();
        info!("Mock 모드: 데모 계좌 {} 데이터를 사용합니다", client.account_id());
        return Ok(Arc::new(client));
    }

    let client = GatewayClient::from_env()
        .map_err(|e| eyre::eyre!("게이트웨이 클라이언트 생성 실패: {}", e))?;
    info!("IBKR 게이트웨이: {}", client.base_url());
    Ok(Arc::new(client))
}

async fn run_server(config: &AppConfig, store: EquityHistoryStore) -> eyre::Result<()> {
    let broker = create_broker(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller_handle = config.poll_interval.map(|interval| {
        LedgerPoller::new(
            store.clone(),
            broker.clone(),
            config.default_account_id.clone(),
            interval,
        )
        .spawn(shutdown_rx.clone())
    });

    let state = Arc::new(AppState::new(
        store,
        broker,
        config.default_account_id.clone(),
    ));

    server::start_server(config.api_port, state, shutdown_signal()).await?;

    info!("서버 종료 중...");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller_handle {
        if let Err(e) = handle.await {
            warn!("폴러 태스크 오류: {:?}", e);
        }
    }

    Ok(())
}

async fn run_record(
    config: &AppConfig,
    store: &EquityHistoryStore,
    account_id: &str,
) -> eyre::Result<()> {
    let broker = create_broker(config)?;
    let bundle = broker.ledger(account_id).await?;

    let outcome = store.record_snapshot(account_id, bundle.usd()).await?;
    let total = store.repository().count(account_id).await?;

    info!("기록 결과: {:?} (account={}, 누적 {}건)", outcome, account_id, total);

    Ok(())
}

async fn run_history(
    store: &EquityHistoryStore,
    account_id: &str,
    query: &HistoryQuery,
) -> eyre::Result<()> {
    let history = store.get_history(account_id, query).await?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}

/// Ctrl+C 또는 SIGTERM 대기
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C 핸들러 설치 실패: {}", e);
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
                warn!("SIGTERM 핸들러 설치 실패: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Ctrl+C 수신, 종료 시작"),
        _ = terminate => warn!("SIGTERM 수신, 종료 시작"),
    }
}
