use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use brokers::BrokerClient;

use crate::record::EquityHistoryStore;

pub mod error;
pub mod routes;

pub use error::ApiError;

/// 핸들러 공유 상태
pub struct AppState {
    pub store: EquityHistoryStore,
    pub broker: Arc<dyn BrokerClient>,
    /// accountId 파라미터가 없거나 비었을 때 사용
    pub default_account_id: String,
}

impl AppState {
    pub fn new(
        store: EquityHistoryStore,
        broker: Arc<dyn BrokerClient>,
        default_account_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            default_account_id: default_account_id.into(),
        }
    }

    pub fn account_or_default<'a>(&'a self, account_id: Option<&'a str>) -> &'a str {
        account_id
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.default_account_id)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/accountInfo", get(routes::account_info))
        .route("/api/positions", get(routes::positions))
        .route("/api/conDetail", get(routes::con_detail))
        .route("/api/ledger", get(routes::ledger))
        .route("/api/equityHistory", get(routes::equity_history))
        .layer(cors)
        .with_state(state)
}

/// API 서버 실행, `shutdown`이 완료되면 진행 중인 요청을 마치고 종료
pub async fn start_server(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API 서버 시작: http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use async_trait::async_trait;
    use brokers::MockBrokerClient;
    use interface::{AccountInfo, BrokerError, LedgerBundle, PositionItem};

    use crate::clock::ManualClock;
    use crate::record::SqliteSnapshotRepository;

    const NOW: i64 = 1_700_000_000_000;

    async fn test_state(broker: Arc<dyn BrokerClient>) -> (Arc<AppState>, Arc<ManualClock>) {
        let repo = SqliteSnapshotRepository::in_memory().await.unwrap();
        let clock = Arc::new(ManualClock::new(NOW));
        let store = EquityHistoryStore::with_clock(Arc::new(repo), clock.clone());
        (Arc::new(AppState::new(store, broker, "U00000000")), clock)
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    struct FailingBroker;

    #[async_trait]
    impl BrokerClient for FailingBroker {
        async fn account_info(&self) -> Result<AccountInfo, BrokerError> {
            Err(BrokerError::Other("gateway down".to_string()))
        }

        async fn positions(&self, _: &str, _: &str) -> Result<Vec<PositionItem>, BrokerError> {
            Err(BrokerError::Other("gateway down".to_string()))
        }

        async fn contract_detail(&self, _: &str, _: &str) -> Result<Value, BrokerError> {
            Err(BrokerError::Other("gateway down".to_string()))
        }

        async fn ledger(&self, _: &str) -> Result<LedgerBundle, BrokerError> {
            Err(BrokerError::Other("gateway down".to_string()))
        }
    }

    #[tokio::test]
    async fn ledger_route_records_snapshot() {
        let (state, clock) = test_state(Arc::new(MockBrokerClient::default())).await;

        let (status, body) = get_json(state.clone(), "/api/ledger?accountId=A1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["USD"]["netliquidationvalue"].as_f64().unwrap() > 0.0);

        // 같은 평가액으로 바로 다시 조회하면 중복 억제
        clock.advance(1_000);
        get_json(state.clone(), "/api/ledger?accountId=A1").await;
        assert_eq!(state.store.repository().count("A1").await.unwrap(), 1);

        clock.advance(10_000);
        get_json(state.clone(), "/api/ledger?accountId=A1").await;
        assert_eq!(state.store.repository().count("A1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ledger_route_uses_default_account() {
        let (state, _clock) = test_state(Arc::new(MockBrokerClient::default())).await;

        let (status, _) = get_json(state.clone(), "/api/ledger").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store.repository().count("U00000000").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn equity_history_route_shape() {
        let (state, clock) = test_state(Arc::new(MockBrokerClient::default())).await;

        get_json(state.clone(), "/api/ledger?accountId=A1").await;
        clock.advance(60_000);

        let (status, body) = get_json(
            state.clone(),
            "/api/equityHistory?accountId=A1&range=bogus&maxPoints=abc",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["toTs"], NOW + 60_000);
        assert_eq!(body["fromTs"], NOW + 60_000 - 86_400_000);
        assert_eq!(body["bucketMs"], 144_000);
        assert_eq!(body["points"].as_array().unwrap().len(), 1);
        assert_eq!(body["points"][0]["timestamp"], NOW);
    }

    #[tokio::test]
    async fn equity_history_for_empty_account() {
        let (state, _clock) = test_state(Arc::new(MockBrokerClient::default())).await;

        let (status, body) =
            get_json(state, "/api/equityHistory?accountId=nobody&range=all").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"], Value::Array(vec![]));
        assert_eq!(body["fromTs"], 0);
        assert!(body["bucketMs"].as_i64().unwrap() >= 30_000);
    }

    #[tokio::test]
    async fn broker_failure_is_bad_gateway() {
        let (state, _clock) = test_state(Arc::new(FailingBroker)).await;

        let (status, body) = get_json(state.clone(), "/api/ledger?accountId=A1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("gateway down"));
        assert_eq!(state.store.repository().count("A1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn storage_failure_keeps_ledger_but_fails_history() {
        let repo = Arc::new(SqliteSnapshotRepository::in_memory().await.unwrap());
        repo.close().await.unwrap();
        let store = EquityHistoryStore::with_clock(repo, Arc::new(ManualClock::new(NOW)));
        let state = Arc::new(AppState::new(
            store,
            Arc::new(MockBrokerClient::default()),
            "U00000000",
        ));

        // 기록 실패는 ledger 응답을 막지 않음
        let (status, body) = get_json(state.clone(), "/api/ledger?accountId=A1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["USD"]["netliquidationvalue"].as_f64().unwrap() > 0.0);

        let (status, body) = get_json(state, "/api/equityHistory?accountId=A1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Record error"));
    }

    #[tokio::test]
    async fn pass_through_routes() {
        let (state, _clock) = test_state(Arc::new(MockBrokerClient::default())).await;

        let (status, body) = get_json(state.clone(), "/api/accountInfo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accountId"], "U00000000");

        let (status, body) = get_json(state.clone(), "/api/positions?accountId=A1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 7);
        assert_eq!(body[0]["acctId"], "A1");

        let (status, body) = get_json(state.clone(), "/api/conDetail?conId=756733").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["contractDesc"], "SPY");

        let (status, body) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
