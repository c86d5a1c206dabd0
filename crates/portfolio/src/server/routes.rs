use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use interface::{AccountInfo, LedgerBundle, PositionItem};

use super::error::ApiError;
use super::AppState;
use crate::record::{EquityHistory, HistoryQuery, HistoryRange};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountParams {
    pub account_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsParams {
    pub account_id: Option<String>,
    pub page_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConDetailParams {
    pub account_id: Option<String>,
    pub con_id: Option<String>,
}

/// 숫자 파라미터는 문자열로 받아 관대하게 해석 (잘못된 값은 생략된 것으로 취급)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityHistoryParams {
    pub account_id: Option<String>,
    pub range: Option<String>,
    pub from_ts: Option<String>,
    pub to_ts: Option<String>,
    pub max_points: Option<String>,
}

impl EquityHistoryParams {
    pub fn to_query(&self) -> HistoryQuery {
        HistoryQuery {
            range: HistoryRange::from_param(self.range.as_deref()),
            from_ts: parse_number(self.from_ts.as_deref()),
            to_ts: parse_number(self.to_ts.as_deref()),
            max_points: parse_number(self.max_points.as_deref()),
        }
    }
}

/// 유한한 숫자만 받아 내림한 정수로 변환
fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.floor() as i64)
}

fn non_empty_or_zero(raw: Option<&str>) -> &str {
    raw.filter(|s| !s.is_empty()).unwrap_or("0")
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn account_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccountInfo>, ApiError> {
    let info = state.broker.account_info().await?;
    Ok(Json(info))
}

pub async fn positions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PositionsParams>,
) -> Result<Json<Vec<PositionItem>>, ApiError> {
    let account_id = state.account_or_default(params.account_id.as_deref());
    let page_id = non_empty_or_zero(params.page_id.as_deref());

    let positions = state.broker.positions(account_id, page_id).await?;
    Ok(Json(positions))
}

pub async fn con_detail(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConDetailParams>,
) -> Result<Json<Value>, ApiError> {
    let account_id = state.account_or_default(params.account_id.as_deref());
    let conid = non_empty_or_zero(params.con_id.as_deref());

    let detail = state.broker.contract_detail(account_id, conid).await?;
    Ok(Json(detail))
}

/// ledger 조회 + USD 평가액 스냅샷 기록
///
/// 기록 실패는 로그만 남기고 ledger 응답은 그대로 반환
pub async fn ledger(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AccountParams>,
) -> Result<Json<LedgerBundle>, ApiError> {
    let account_id = state.account_or_default(params.account_id.as_deref());

    let bundle = state.broker.ledger(account_id).await?;
    state
        .store
        .record_snapshot_logged(account_id, bundle.usd())
        .await;

    Ok(Json(bundle))
}

pub async fn equity_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EquityHistoryParams>,
) -> Result<Json<EquityHistory>, ApiError> {
    let account_id = state.account_or_default(params.account_id.as_deref());
    let query = params.to_query();

    let history = state.store.get_history(account_id, &query).await?;
    Ok(Json(history))
}
