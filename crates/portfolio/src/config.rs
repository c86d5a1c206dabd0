use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::record::StoreLocation;

pub const DEFAULT_API_PORT: u16 = 3000;
pub const DEFAULT_ACCOUNT_ID: &str = "U00000000";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// 환경 변수 기반 애플리케이션 설정
///
/// .env 파일은 lib.rs에서 미리 로드됨
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PORTFOLIO_DB_PATH (":memory:"이면 인메모리)
    pub store: StoreLocation,
    /// PORTFOLIO_API_PORT
    pub api_port: u16,
    /// PORTFOLIO_DEFAULT_ACCOUNT, accountId 파라미터가 없을 때 사용
    pub default_account_id: String,
    /// PORTFOLIO_MOCK
    pub mock_mode: bool,
    /// PORTFOLIO_POLL_SECS, 없거나 0이면 폴러 비활성화
    pub poll_interval: Option<Duration>,
    /// PORTFOLIO_LOG_DIR
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let store = StoreLocation::from_env_value(env::var("PORTFOLIO_DB_PATH").ok().as_deref());

        let api_port = env::var("PORTFOLIO_API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_API_PORT);

        let default_account_id = env::var("PORTFOLIO_DEFAULT_ACCOUNT")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string());

        let mock_mode = brokers::is_truthy(env::var("PORTFOLIO_MOCK").ok().as_deref());

        let poll_interval = env::var("PORTFOLIO_POLL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let log_dir = env::var("PORTFOLIO_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR));

        Self {
            store,
            api_port,
            default_account_id,
            mock_mode,
            poll_interval,
            log_dir,
        }
    }
}
