use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use brokers::BrokerClient;

use crate::record::EquityHistoryStore;

/// 계좌 하나의 ledger를 주기적으로 조회해 평가액 스냅샷으로 기록
///
/// 계좌당 폴러는 하나만 띄운다 (기록자는 계좌당 하나라는 가정)
pub struct LedgerPoller {
    store: EquityHistoryStore,
    broker: Arc<dyn BrokerClient>,
    account_id: String,
    interval: Duration,
}

impl LedgerPoller {
    pub fn new(
        store: EquityHistoryStore,
        broker: Arc<dyn BrokerClient>,
        account_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            broker,
            account_id: account_id.into(),
            interval,
        }
    }

    /// 한 번 조회 + 기록. 브로커 오류는 로그만 남김
    pub async fn poll_once(&self) {
        match self.broker.ledger(&self.account_id).await {
            Ok(bundle) => {
                self.store
                    .record_snapshot_logged(&self.account_id, bundle.usd())
                    .await;
            }
            Err(e) => {
                warn!("Ledger 조회 실패 ({}): {}", self.account_id, e);
            }
        }
    }

    /// `shutdown`에 true가 들어오거나 송신 측이 닫히면 종료
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Ledger 폴러 시작: account={}, interval={:?}",
                self.account_id, self.interval
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.poll_once().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Ledger 폴러 종료: account={}", self.account_id);
        })
    }
}
