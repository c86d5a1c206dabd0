use async_trait::async_trait;
use serde_json::Value;

use interface::{AccountInfo, BrokerError, LedgerBundle, PositionItem};

pub mod gateway;
pub mod mock;

/// 브로커 계좌 조회 공통 인터페이스
///
/// 인증/세션은 구현체(또는 그 뒤의 게이트웨이)가 책임지며,
/// 호출 측은 타입이 정해진 레코드만 받습니다.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn account_info(&self) -> Result<AccountInfo, BrokerError>;

    async fn positions(
        &self,
        account_id: &str,
        page_id: &str,
    ) -> Result<Vec<PositionItem>, BrokerError>;

    async fn contract_detail(&self, account_id: &str, conid: &str) -> Result<Value, BrokerError>;

    async fn ledger(&self, account_id: &str) -> Result<LedgerBundle, BrokerError>;
}

/// "1", "true", "yes", "y", "on" (대소문자 무시)
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        Some(v) => matches!(
            v.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        None => false,
    }
}

// Convenience re-exports
pub use gateway::GatewayClient;
pub use mock::MockBrokerClient;
