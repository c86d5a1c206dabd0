use std::sync::Arc;

use tracing::{debug, warn};

use interface::Ledger;

use crate::clock::{Clock, SystemClock};

use super::helpers::{is_near_duplicate, snapshot_from_ledger};
use super::history::{EquityHistory, HistoryQuery};
use super::{RecordError, SnapshotRepository};

/// 스냅샷 기록 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// ledger가 없거나 평가액이 기록 불가 (없음, NaN, 무한대, 0)
    Rejected,
    /// 직전 기록과 10초 이내 + 평가액 차이 0.01 미만
    Deduplicated,
    /// 새 행 저장
    Recorded { id: i64 },
}

/// 평가액 히스토리 저장소 (기록 + 버킷 조회)
///
/// 계좌당 기록자는 하나(주기적 폴러 또는 ledger 요청)라고 가정한다.
/// 최신 행 조회와 삽입은 트랜잭션으로 묶지 않으므로 같은 계좌에 동시 기록이
/// 들어오면 중복에 가까운 행이 하나 더 생길 수 있다. 저장소 자체는 손상되지 않는다.
#[derive(Clone)]
pub struct EquityHistoryStore {
    repository: Arc<dyn SnapshotRepository>,
    clock: Arc<dyn Clock>,
}

impl EquityHistoryStore {
    pub fn new(repository: Arc<dyn SnapshotRepository>) -> Self {
        Self::with_clock(repository, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<dyn SnapshotRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn repository(&self) -> &Arc<dyn SnapshotRepository> {
        &self.repository
    }

    /// ledger 한 건을 스냅샷으로 기록
    ///
    /// 저장소 오류만 Err로 반환하며, 거부/중복은 정상 결과로 취급
    pub async fn record_snapshot(
        &self,
        account_id: &str,
        ledger: Option<&Ledger>,
    ) -> Result<RecordOutcome, RecordError> {
        let ts = self.clock.now_ms();

        let snapshot = match ledger.and_then(|l| snapshot_from_ledger(account_id, ts, l)) {
            Some(snapshot) => snapshot,
            None => return Ok(RecordOutcome::Rejected),
        };

        if let Some(last) = self.repository.find_latest(account_id).await? {
            if is_near_duplicate(&last, ts, snapshot.equity) {
                debug!(
                    account_id,
                    equity = snapshot.equity,
                    last_ts = last.snapshot.ts,
                    "Snapshot suppressed as near-duplicate"
                );
                return Ok(RecordOutcome::Deduplicated);
            }
        }

        let id = self.repository.save(&snapshot).await?;
        debug!(account_id, id, ts, equity = snapshot.equity, "Snapshot recorded");

        Ok(RecordOutcome::Recorded { id })
    }

    /// 기록 실패를 로그로만 남기는 버전 (ledger 응답을 막지 않음)
    pub async fn record_snapshot_logged(&self, account_id: &str, ledger: Option<&Ledger>) {
        if let Err(e) = self.record_snapshot(account_id, ledger).await {
            warn!("Failed to record ledger snapshot for {}: {}", account_id, e);
        }
    }

    /// 버킷 단위로 다운샘플링된 평가액 히스토리 조회
    pub async fn get_history(
        &self,
        account_id: &str,
        query: &HistoryQuery,
    ) -> Result<EquityHistory, RecordError> {
        let window = query.resolve(self.clock.now_ms());
        let points = self.repository.find_bucketed(account_id, &window).await?;
        debug!(
            account_id,
            bucket_ms = window.bucket_ms,
            buckets = window.bucket_count(),
            points = points.len(),
            "History query resolved"
        );

        Ok(EquityHistory::new(&window, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::record::history::{HistoryRange, DAY_MS, MIN_BUCKET_MS};
    use crate::record::{EquitySnapshot, SqliteSnapshotRepository};

    async fn setup(now_ms: i64) -> (EquityHistoryStore, Arc<ManualClock>) {
        let repo = SqliteSnapshotRepository::in_memory().await.unwrap();
        let clock = Arc::new(ManualClock::new(now_ms));
        let store = EquityHistoryStore::with_clock(Arc::new(repo), clock.clone());
        (store, clock)
    }

    fn ledger(equity: f64) -> Ledger {
        Ledger {
            netliquidationvalue: Some(equity),
            cashbalance: Some(1_000.0),
            currency: Some("USD".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn near_duplicate_within_window_is_suppressed() {
        let (store, clock) = setup(1_000_000).await;

        let first = store.record_snapshot("A1", Some(&ledger(100.0))).await.unwrap();
        assert!(matches!(first, RecordOutcome::Recorded { .. }));

        clock.advance(9_999);
        let second = store.record_snapshot("A1", Some(&ledger(100.009))).await.unwrap();
        assert_eq!(second, RecordOutcome::Deduplicated);

        assert_eq!(store.repository().count("A1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn equity_change_or_elapsed_time_records_again() {
        let (store, clock) = setup(1_000_000).await;

        store.record_snapshot("A1", Some(&ledger(100.0))).await.unwrap();

        clock.advance(1_000);
        let moved = store.record_snapshot("A1", Some(&ledger(100.02))).await.unwrap();
        assert!(matches!(moved, RecordOutcome::Recorded { .. }));

        clock.advance(10_000);
        let later = store.record_snapshot("A1", Some(&ledger(100.02))).await.unwrap();
        assert!(matches!(later, RecordOutcome::Recorded { .. }));

        assert_eq!(store.repository().count("A1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn dedup_is_per_account() {
        let (store, _clock) = setup(1_000_000).await;

        store.record_snapshot("A1", Some(&ledger(100.0))).await.unwrap();
        let other = store.record_snapshot("B2", Some(&ledger(100.0))).await.unwrap();

        assert!(matches!(other, RecordOutcome::Recorded { .. }));
    }

    #[tokio::test]
    async fn unrecordable_ledgers_write_nothing() {
        let (store, _clock) = setup(1_000_000).await;

        for equity in [0.0, f64::NAN, f64::INFINITY] {
            let outcome = store.record_snapshot("A1", Some(&ledger(equity))).await.unwrap();
            assert_eq!(outcome, RecordOutcome::Rejected);
        }
        let missing = store.record_snapshot("A1", None).await.unwrap();
        assert_eq!(missing, RecordOutcome::Rejected);

        let no_equity = Ledger::default();
        let outcome = store.record_snapshot("A1", Some(&no_equity)).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Rejected);

        assert_eq!(store.repository().count("A1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recorded_row_keeps_ledger_fields() {
        let (store, _clock) = setup(1_234_567).await;

        store.record_snapshot("A1", Some(&ledger(250.5))).await.unwrap();

        let latest = store.repository().find_latest("A1").await.unwrap().unwrap();
        assert_eq!(latest.snapshot.ts, 1_234_567);
        assert_eq!(latest.snapshot.equity, 250.5);
        assert_eq!(latest.snapshot.cash_balance, Some(1_000.0));
        assert_eq!(latest.snapshot.settled_cash, None);
        assert_eq!(latest.snapshot.currency.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn dashboard_scenario() {
        let (store, clock) = setup(0).await;

        store.record_snapshot("A1", Some(&ledger(100.0))).await.unwrap();

        clock.set(5_000);
        let suppressed = store.record_snapshot("A1", Some(&ledger(100.005))).await.unwrap();
        assert_eq!(suppressed, RecordOutcome::Deduplicated);

        clock.set(20_000);
        store.record_snapshot("A1", Some(&ledger(105.0))).await.unwrap();

        assert_eq!(store.repository().count("A1").await.unwrap(), 2);

        // 두 행 모두 30초 버킷 0에 속하므로 마지막 관측값만 남음
        let history = store
            .get_history("A1", &HistoryQuery::new(HistoryRange::All))
            .await
            .unwrap();
        assert_eq!(history.from_ts, 0);
        assert_eq!(history.to_ts, 20_000);
        assert_eq!(history.bucket_ms, MIN_BUCKET_MS);
        let got: Vec<(i64, f64)> = history
            .points
            .iter()
            .map(|p| (p.timestamp, p.equity))
            .collect();
        assert_eq!(got, vec![(20_000, 105.0)]);

        // 다음 버킷으로 넘어가면 점이 따로 잡힘
        clock.set(40_000);
        store.record_snapshot("A1", Some(&ledger(106.0))).await.unwrap();

        let history = store
            .get_history("A1", &HistoryQuery::new(HistoryRange::All))
            .await
            .unwrap();
        let got: Vec<(i64, f64)> = history
            .points
            .iter()
            .map(|p| (p.timestamp, p.equity))
            .collect();
        assert_eq!(got, vec![(20_000, 105.0), (40_000, 106.0)]);
    }

    #[tokio::test]
    async fn empty_account_returns_empty_points() {
        let now = 1_700_000_000_000;
        let (store, _clock) = setup(now).await;

        let history = store
            .get_history("nobody", &HistoryQuery::new(HistoryRange::SevenDays))
            .await
            .unwrap();

        assert!(history.points.is_empty());
        assert!(history.bucket_ms >= MIN_BUCKET_MS);
        assert_eq!(history.to_ts, now);
        assert_eq!(history.from_ts, now - 7 * DAY_MS);
    }

    #[tokio::test]
    async fn one_day_default_window() {
        let now = 1_700_000_000_000;
        let (store, _clock) = setup(now).await;

        let history = store
            .get_history("A1", &HistoryQuery::new(HistoryRange::OneDay))
            .await
            .unwrap();

        assert_eq!(history.from_ts, history.to_ts - 86_400_000);
    }

    #[tokio::test]
    async fn dense_series_fits_point_budget() {
        let now = 1_700_000_000_000;
        let (store, _clock) = setup(now).await;

        // 하루치, 10초 간격
        let start = now - DAY_MS;
        let snapshots: Vec<EquitySnapshot> = (0..8_640)
            .map(|i| EquitySnapshot {
                account_id: "A1".to_string(),
                ts: start + i * 10_000,
                equity: 10_000.0 + i as f64,
                cash_balance: None,
                settled_cash: None,
                stock_market_value: None,
                unrealized_pnl: None,
                realized_pnl: None,
                currency: None,
            })
            .collect();
        for chunk in snapshots.chunks(500) {
            store.repository().save_batch(chunk).await.unwrap();
        }

        for max_points in [10, 100, 600, 2000] {
            let query = HistoryQuery {
                range: HistoryRange::OneDay,
                from_ts: None,
                to_ts: None,
                max_points: Some(max_points),
            };
            let window = query.resolve(now);
            let history = store.get_history("A1", &query).await.unwrap();

            assert!(!history.points.is_empty());
            assert!(history.points.len() as i64 <= window.bucket_count());
            assert!(history.points.len() as i64 <= max_points + 1);

            // 시간순, 버킷당 최대 한 점
            for pair in history.points.windows(2) {
                assert!(pair[0].timestamp <= pair[1].timestamp);
                assert_ne!(
                    pair[0].timestamp.div_euclid(history.bucket_ms),
                    pair[1].timestamp.div_euclid(history.bucket_ms)
                );
            }

            // 기록된 값만 반환
            for point in &history.points {
                let i = (point.timestamp - start) / 10_000;
                assert_eq!(point.equity, 10_000.0 + i as f64);
            }
        }
    }

    #[tokio::test]
    async fn closed_store_reports_database_error() {
        let repo = Arc::new(SqliteSnapshotRepository::in_memory().await.unwrap());
        repo.close().await.unwrap();
        let store =
            EquityHistoryStore::with_clock(repo, Arc::new(ManualClock::new(1_000_000)));

        let result = store.record_snapshot("A1", Some(&ledger(100.0))).await;
        assert!(matches!(result, Err(RecordError::Database(_))));

        let history = store
            .get_history("A1", &HistoryQuery::new(HistoryRange::OneDay))
            .await;
        assert!(matches!(history, Err(RecordError::Database(_))));

        // 실패해도 로그만 남기고 반환
        store.record_snapshot_logged("A1", Some(&ledger(100.0))).await;
    }

    #[tokio::test]
    async fn inverted_range_is_empty_not_error() {
        let (store, _clock) = setup(1_000_000).await;
        store.record_snapshot("A1", Some(&ledger(100.0))).await.unwrap();

        let query = HistoryQuery {
            range: HistoryRange::All,
            from_ts: Some(2_000_000),
            to_ts: Some(500_000),
            max_points: None,
        };
        let history = store.get_history("A1", &query).await.unwrap();

        assert!(history.points.is_empty());
        assert_eq!(history.from_ts, 2_000_000);
        assert_eq!(history.to_ts, 500_000);
    }
}
