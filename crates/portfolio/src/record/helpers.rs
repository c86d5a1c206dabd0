use interface::Ledger;

use super::{EquitySnapshot, StoredEquitySnapshot};

/// 이 시간 안에 들어온 같은 평가액은 중복으로 간주 (10초)
pub const DEDUP_WINDOW_MS: i64 = 10_000;

/// 평가액 변화가 이보다 작으면 같은 값으로 간주
pub const DEDUP_EQUITY_EPSILON: f64 = 0.01;

/// Ledger를 EquitySnapshot으로 변환
/// 평가액이 없거나, 유한하지 않거나, 0이면 None
pub fn snapshot_from_ledger(account_id: &str, ts: i64, ledger: &Ledger) -> Option<EquitySnapshot> {
    let equity = ledger.equity()?;

    Some(EquitySnapshot {
        account_id: account_id.to_string(),
        ts,
        equity,
        cash_balance: ledger.cashbalance,
        settled_cash: ledger.settledcash,
        stock_market_value: ledger.stockmarketvalue,
        unrealized_pnl: ledger.unrealizedpnl,
        realized_pnl: ledger.realizedpnl,
        currency: ledger.currency.clone(),
    })
}

/// 직전 기록과 시간/평가액 모두 가까우면 true
pub fn is_near_duplicate(last: &StoredEquitySnapshot, ts: i64, equity: f64) -> bool {
    let last = &last.snapshot;
    (ts - last.ts).abs() < DEDUP_WINDOW_MS
        && last.equity.is_finite()
        && (equity - last.equity).abs() < DEDUP_EQUITY_EPSILON
}
