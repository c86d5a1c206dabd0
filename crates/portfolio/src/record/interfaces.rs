use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::entities::equity_snapshot;
use super::history::{EquityPoint, HistoryWindow};

/// 평가액 스냅샷 데이터 구조
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    /// 계좌 ID
    pub account_id: String,
    /// 관측 시각 (epoch ms)
    pub ts: i64,
    /// 순청산가치 (유한하고 0이 아닌 값만 저장됨)
    pub equity: f64,
    pub cash_balance: Option<f64>,
    pub settled_cash: Option<f64>,
    pub stock_market_value: Option<f64>,
    pub unrealized_pnl: Option<f64>,
    pub realized_pnl: Option<f64>,
    pub currency: Option<String>,
}

/// 저장소에 저장된 스냅샷 (ID 포함)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEquitySnapshot {
    /// 데이터베이스 ID (삽입 순서)
    pub id: i64,
    #[serde(flatten)]
    pub snapshot: EquitySnapshot,
}

impl From<equity_snapshot::Model> for StoredEquitySnapshot {
    fn from(model: equity_snapshot::Model) -> Self {
        StoredEquitySnapshot {
            id: model.id,
            snapshot: EquitySnapshot {
                account_id: model.account_id,
                ts: model.ts,
                equity: model.equity,
                cash_balance: model.cash_balance,
                settled_cash: model.settled_cash,
                stock_market_value: model.stock_market_value,
                unrealized_pnl: model.unrealized_pnl,
                realized_pnl: model.realized_pnl,
                currency: model.currency,
            },
        }
    }
}

/// 평가액 스냅샷 저장소 인터페이스
///
/// 테이블은 append-only: 갱신/삭제 연산은 제공하지 않음
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// 스냅샷 한 건 저장, 생성된 ID 반환
    async fn save(&self, snapshot: &EquitySnapshot) -> Result<i64, RecordError>;

    /// 스냅샷 여러 건 일괄 저장 (데이터 시드용, 중복 억제 없이 그대로 삽입)
    async fn save_batch(&self, snapshots: &[EquitySnapshot]) -> Result<(), RecordError>;

    /// 계좌의 가장 최근 스냅샷 (ts 내림차순, 동률이면 마지막 삽입)
    async fn find_latest(&self, account_id: &str)
        -> Result<Option<StoredEquitySnapshot>, RecordError>;

    /// 구간 내 스냅샷을 버킷별 마지막 관측값 하나씩 골라 ts 오름차순으로 반환
    async fn find_bucketed(
        &self,
        account_id: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<EquityPoint>, RecordError>;

    /// 계좌의 저장된 스냅샷 수
    async fn count(&self, account_id: &str) -> Result<u64, RecordError>;
}

/// 기록 저장소 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Storage open error: {0}")]
    Open(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}
