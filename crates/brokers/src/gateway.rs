use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use interface::{AccountInfo, BrokerError, LedgerBundle, PositionItem};

use super::BrokerClient;

pub const DEFAULT_GATEWAY_URL: &str = "https://localhost:5000/v1/api";

/// IBKR Client Portal 게이트웨이 패스스루 클라이언트
///
/// 세션 인증은 게이트웨이가 유지하므로 여기서는 요청을 그대로 전달만 합니다.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        accept_invalid_certs: bool,
    ) -> Result<Self, BrokerError> {
        // 로컬 게이트웨이는 자체 서명 인증서를 사용
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// IBKR_GATEWAY_URL, IBKR_GATEWAY_INSECURE 환경 변수로 생성
    pub fn from_env() -> Result<Self, BrokerError> {
        let base_url =
            std::env::var("IBKR_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
        let insecure = super::is_truthy(std::env::var("IBKR_GATEWAY_INSECURE").ok().as_deref());
        Self::new(base_url, insecure)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(BrokerError::Other(format!(
                "Gateway HTTP error: status {}, path: {}, response: {}",
                status,
                path,
                response_text.chars().take(200).collect::<String>()
            )));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            BrokerError::Other(format!(
                "Failed to parse gateway response: {}, path: {}, response: {}",
                e,
                path,
                response_text.chars().take(200).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl BrokerClient for GatewayClient {
    async fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        let accounts: Vec<AccountInfo> = self.get("portfolio/accounts").await?;
        accounts
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::Other("Gateway returned no accounts".to_string()))
    }

    async fn positions(
        &self,
        account_id: &str,
        page_id: &str,
    ) -> Result<Vec<PositionItem>, BrokerError> {
        self.get(&format!("portfolio/{}/positions/{}", account_id, page_id))
            .await
    }

    async fn contract_detail(&self, account_id: &str, conid: &str) -> Result<Value, BrokerError> {
        self.get(&format!("portfolio/{}/positions/{}", account_id, conid))
            .await
    }

    async fn ledger(&self, account_id: &str) -> Result<LedgerBundle, BrokerError> {
        self.get(&format!("portfolio/{}/ledger", account_id)).await
    }
}
