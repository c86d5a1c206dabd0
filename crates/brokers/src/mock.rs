use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use interface::{AccountInfo, BrokerError, Ledger, LedgerBundle, PositionItem};

use super::BrokerClient;

pub const DEFAULT_MOCK_ACCOUNT_ID: &str = "U00000000";

const CASH_BALANCE: f64 = 32150.55;
const SETTLED_CASH: f64 = 30125.2;
const REALIZED_PNL: f64 = 5410.25;
const DIVIDENDS: f64 = 182.4;
const INTEREST: f64 = 46.12;

struct MockPosition {
    conid: i64,
    symbol: &'static str,
    name: &'static str,
    qty: f64,
    price: f64,
    avg_price: f64,
    exchange: &'static str,
    realized_pnl: f64,
}

const MOCK_POSITIONS: &[MockPosition] = &[
    MockPosition {
        conid: 4815747,
        symbol: "NVDA",
        name: "NVIDIA Corporation",
        qty: 120.0,
        price: 615.25,
        avg_price: 560.1,
        exchange: "NASDAQ",
        realized_pnl: 1250.0,
    },
    MockPosition {
        conid: 265598,
        symbol: "AAPL",
        name: "Apple Inc.",
        qty: 150.0,
        price: 195.12,
        avg_price: 170.0,
        exchange: "NASDAQ",
        realized_pnl: 820.0,
    },
    MockPosition {
        conid: 272093,
        symbol: "MSFT",
        name: "Microsoft Corporation",
        qty: 60.0,
        price: 415.4,
        avg_price: 360.0,
        exchange: "NASDAQ",
        realized_pnl: 600.0,
    },
    MockPosition {
        conid: 76792991,
        symbol: "TSLA",
        name: "Tesla, Inc.",
        qty: 80.0,
        price: 210.55,
        avg_price: 240.5,
        exchange: "NASDAQ",
        realized_pnl: -350.0,
    },
    MockPosition {
        conid: 756733,
        symbol: "SPY",
        name: "SPDR S&P 500 ETF Trust",
        qty: 100.0,
        price: 492.03,
        avg_price: 470.0,
        exchange: "ARCA",
        realized_pnl: 420.0,
    },
    MockPosition {
        conid: 653148986,
        symbol: "IBIT",
        name: "iShares Bitcoin Trust ETF",
        qty: 300.0,
        price: 36.02,
        avg_price: 32.1,
        exchange: "NASDAQ",
        realized_pnl: 0.0,
    },
    MockPosition {
        conid: 22253472,
        symbol: "BABA",
        name: "Alibaba Group Holding Limited",
        qty: 200.0,
        price: 75.12,
        avg_price: 82.0,
        exchange: "NYSE",
        realized_pnl: -180.0,
    },
];

/// 고정된 데모 계좌를 돌려주는 브로커 (PORTFOLIO_MOCK 모드)
pub struct MockBrokerClient {
    account_id: String,
}

impl MockBrokerClient {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }

    /// MOCK_ACCOUNT_ID 환경 변수 (기본값: "U00000000")
    pub fn from_env() -> Self {
        let account_id = std::env::var("MOCK_ACCOUNT_ID")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_MOCK_ACCOUNT_ID.to_string());
        Self::new(account_id)
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn build_positions(account_id: &str) -> Vec<PositionItem> {
        MOCK_POSITIONS
            .iter()
            .map(|p| PositionItem {
                acct_id: account_id.to_string(),
                conid: p.conid,
                contract_desc: p.symbol.to_string(),
                position: p.qty,
                mkt_price: p.price,
                mkt_value: p.qty * p.price,
                currency: "USD".to_string(),
                avg_cost: p.avg_price * p.qty,
                avg_price: p.avg_price,
                realized_pnl: p.realized_pnl,
                unrealized_pnl: (p.price - p.avg_price) * p.qty,
                listing_exchange: p.exchange.to_string(),
                full_name: p.name.to_string(),
                extra: BTreeMap::new(),
            })
            .collect()
    }

    fn build_ledger(account_id: &str) -> LedgerBundle {
        let positions = Self::build_positions(account_id);
        let stock_market_value: f64 = positions.iter().map(|p| p.mkt_value).sum();
        let unrealized_pnl: f64 = positions.iter().map(|p| p.unrealized_pnl).sum();

        let usd = Ledger {
            netliquidationvalue: Some(stock_market_value + CASH_BALANCE),
            cashbalance: Some(CASH_BALANCE),
            settledcash: Some(SETTLED_CASH),
            stockmarketvalue: Some(stock_market_value),
            unrealizedpnl: Some(unrealized_pnl),
            realizedpnl: Some(REALIZED_PNL),
            dividends: Some(DIVIDENDS),
            interest: Some(INTEREST),
            exchangerate: Some(1.0),
            currency: Some("USD".to_string()),
            acctcode: Some(account_id.to_string()),
            key: Some("USD".to_string()),
            timestamp: Some(Utc::now().timestamp_millis()),
            extra: BTreeMap::from([("secondkey".to_string(), Value::from("BASE"))]),
        };

        let mut base = usd.clone();
        base.key = Some("BASE".to_string());
        base.extra = BTreeMap::from([("secondkey".to_string(), Value::from("USD"))]);

        LedgerBundle(BTreeMap::from([
            ("USD".to_string(), usd),
            ("BASE".to_string(), base),
        ]))
    }
}

impl Default for MockBrokerClient {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_ACCOUNT_ID)
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    async fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        Ok(AccountInfo {
            id: "DEMO".to_string(),
            account_title: "Demo Portfolio".to_string(),
            account_van: "VAN-DEMO".to_string(),
            display_name: "Demo Account".to_string(),
            account_id: self.account_id.clone(),
            currency: "USD".to_string(),
            extra: BTreeMap::new(),
        })
    }

    async fn positions(
        &self,
        account_id: &str,
        page_id: &str,
    ) -> Result<Vec<PositionItem>, BrokerError> {
        // 데모 계좌는 한 페이지뿐
        if page_id != "0" {
            return Ok(Vec::new());
        }
        Ok(Self::build_positions(account_id))
    }

    async fn contract_detail(&self, account_id: &str, conid: &str) -> Result<Value, BrokerError> {
        let conid: i64 = conid
            .parse()
            .map_err(|_| BrokerError::Other(format!("Invalid conid: {}", conid)))?;

        let detail = Self::build_positions(account_id)
            .into_iter()
            .find(|p| p.conid == conid)
            .map(|p| json!([p]))
            .unwrap_or_else(|| json!([]));

        Ok(detail)
    }

    async fn ledger(&self, account_id: &str) -> Result<LedgerBundle, BrokerError> {
        Ok(Self::build_ledger(account_id))
    }
}
