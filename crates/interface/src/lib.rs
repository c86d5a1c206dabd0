use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 브로커 계좌 기본 정보 (`portfolio/accounts` 응답 항목)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: String,
    #[serde(default)]
    pub account_title: String,
    #[serde(default)]
    pub account_van: String,
    #[serde(default)]
    pub display_name: String,
    pub account_id: String,
    #[serde(default)]
    pub currency: String,
    /// 정의되지 않은 나머지 필드 (그대로 전달)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// 보유 포지션 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionItem {
    pub acct_id: String,
    pub conid: i64,
    #[serde(default)]
    pub contract_desc: String,
    pub position: f64,
    pub mkt_price: f64,
    pub mkt_value: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub avg_cost: f64,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub realized_pnl: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
    #[serde(default)]
    pub listing_exchange: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// 통화별 원장(ledger) 항목
///
/// 브로커가 필드를 생략하거나 null로 보내는 경우가 있어 숫자 필드는 모두 Option.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    /// 순청산가치 (계좌 평가액)
    #[serde(default)]
    pub netliquidationvalue: Option<f64>,
    #[serde(default)]
    pub cashbalance: Option<f64>,
    #[serde(default)]
    pub settledcash: Option<f64>,
    #[serde(default)]
    pub stockmarketvalue: Option<f64>,
    #[serde(default)]
    pub unrealizedpnl: Option<f64>,
    #[serde(default)]
    pub realizedpnl: Option<f64>,
    #[serde(default)]
    pub dividends: Option<f64>,
    #[serde(default)]
    pub interest: Option<f64>,
    #[serde(default)]
    pub exchangerate: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub acctcode: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Ledger {
    /// 기록 가능한 평가액만 반환 (유한하고 0이 아닌 값)
    pub fn equity(&self) -> Option<f64> {
        self.netliquidationvalue
            .filter(|value| value.is_finite() && *value != 0.0)
    }
}

/// 통화 키("USD", "BASE", ...)별 원장 묶음
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerBundle(pub BTreeMap<String, Ledger>);

impl LedgerBundle {
    pub fn get(&self, key: &str) -> Option<&Ledger> {
        self.0.get(key)
    }

    /// USD 원장 (평가액 기록 기준)
    pub fn usd(&self) -> Option<&Ledger> {
        self.get("USD")
    }
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("other error: {0}")]
    Other(String),
}
