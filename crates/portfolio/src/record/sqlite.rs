use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::Index;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, Schema, Set, SqlxSqliteConnector, Statement, Value,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{info, warn};

use super::entities::equity_snapshot;
use super::history::{EquityPoint, HistoryWindow};
use super::{EquitySnapshot, RecordError, SnapshotRepository, StoredEquitySnapshot};

pub const MEMORY_DB_PATH: &str = ":memory:";
pub const DEFAULT_DB_PATH: &str = "data/ibkr-portfolio.sqlite";

/// 버킷마다 ts가 가장 큰 행 하나 (동률이면 나중에 삽입된 행)
///
/// ?1 = bucket_ms, ?2 = account_id, ?3 = from_ts, ?4 = to_ts
const BUCKETED_HISTORY_SQL: &str = r#"
SELECT ts AS timestamp, equity
FROM (
  SELECT
    ts,
    equity,
    ROW_NUMBER() OVER (
      PARTITION BY (ts - (((ts % ?1) + ?1) % ?1)) / ?1
      ORDER BY ts DESC, id DESC
    ) AS rn
  FROM equity_snapshots
  WHERE account_id = ?2 AND ts >= ?3 AND ts <= ?4
)
WHERE rn = 1
ORDER BY ts ASC
"#;

/// 저장소 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// 프로세스 메모리 (테스트용, 종료 시 소멸)
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// PORTFOLIO_DB_PATH 값 해석
    /// 값이 없으면 현재 디렉토리 기준 "data/ibkr-portfolio.sqlite"
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(MEMORY_DB_PATH) => StoreLocation::Memory,
            Some(path) => StoreLocation::File(absolutize(PathBuf::from(path))),
            None => StoreLocation::File(absolutize(PathBuf::from(DEFAULT_DB_PATH))),
        }
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreLocation::Memory => write!(f, "{}", MEMORY_DB_PATH),
            StoreLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match env::current_dir() {
        Ok(current_dir) => current_dir.join(path),
        Err(_) => path,
    }
}

#[derive(Debug, FromQueryResult)]
struct BucketRow {
    timestamp: i64,
    equity: f64,
}

/// SQLite 기반 평가액 스냅샷 저장소
///
/// 시작 시 한 번 열고 서비스 계층에 주입, 종료 시 `close`로 닫음
#[derive(Clone)]
pub struct SqliteSnapshotRepository {
    db: DatabaseConnection,
}

impl SqliteSnapshotRepository {
    /// 저장소 열기 + 테이블/인덱스 생성
    ///
    /// 파일 모드는 WAL + synchronous=NORMAL (마지막 몇 초 유실은 허용)
    pub async fn open(location: &StoreLocation) -> Result<Self, RecordError> {
        let (options, pool_options) = match location {
            StoreLocation::Memory => {
                // 인메모리 DB는 커넥션마다 따로 생기므로 커넥션 하나를 계속 유지
                let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
                let pool_options = SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>);
                (options, pool_options)
            }
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .foreign_keys(true);
                (options, SqlitePoolOptions::new())
            }
        };

        info!("Opening SQLite equity store: {}", location);

        let pool = pool_options.connect_with(options).await?;
        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

        Self::init_schema(&db).await?;

        info!("Equity snapshots table initialized");

        Ok(Self { db })
    }

    /// 인메모리 저장소 (테스트용)
    pub async fn in_memory() -> Result<Self, RecordError> {
        Self::open(&StoreLocation::Memory).await
    }

    async fn init_schema(db: &DatabaseConnection) -> Result<(), RecordError> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        let mut create_table_stmt = schema.create_table_from_entity(equity_snapshot::Entity);
        create_table_stmt.if_not_exists();
        db.execute(backend.build(&create_table_stmt)).await?;

        // 최신 행 조회와 구간 스캔 모두 (account_id, ts) 인덱스를 탐
        let mut account_ts_idx = Index::create()
            .name("idx_equity_snapshots_account_ts")
            .table(equity_snapshot::Entity)
            .col(equity_snapshot::Column::AccountId)
            .col(equity_snapshot::Column::Ts)
            .to_owned();
        account_ts_idx.if_not_exists();

        if let Err(e) = db.execute(backend.build(&account_ts_idx)).await {
            warn!("Index idx_equity_snapshots_account_ts creation skipped: {}", e);
        }

        Ok(())
    }

    /// 커넥션 풀 종료
    pub async fn close(&self) -> Result<(), RecordError> {
        self.db.clone().close().await?;
        info!("Equity store closed");
        Ok(())
    }

    fn to_active_model(snapshot: &EquitySnapshot) -> equity_snapshot::ActiveModel {
        equity_snapshot::ActiveModel {
            account_id: Set(snapshot.account_id.clone()),
            ts: Set(snapshot.ts),
            equity: Set(snapshot.equity),
            cash_balance: Set(snapshot.cash_balance),
            settled_cash: Set(snapshot.settled_cash),
            stock_market_value: Set(snapshot.stock_market_value),
            unrealized_pnl: Set(snapshot.unrealized_pnl),
            realized_pnl: Set(snapshot.realized_pnl),
            currency: Set(snapshot.currency.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SnapshotRepository for SqliteSnapshotRepository {
    async fn save(&self, snapshot: &EquitySnapshot) -> Result<i64, RecordError> {
        let result = equity_snapshot::Entity::insert(Self::to_active_model(snapshot))
            .exec(&self.db)
            .await?;

        Ok(result.last_insert_id)
    }

    async fn save_batch(&self, snapshots: &[EquitySnapshot]) -> Result<(), RecordError> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let models: Vec<equity_snapshot::ActiveModel> =
            snapshots.iter().map(Self::to_active_model).collect();

        equity_snapshot::Entity::insert_many(models)
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn find_latest(
        &self,
        account_id: &str,
    ) -> Result<Option<StoredEquitySnapshot>, RecordError> {
        let model = equity_snapshot::Entity::find()
            .filter(equity_snapshot::Column::AccountId.eq(account_id))
            .order_by_desc(equity_snapshot::Column::Ts)
            .order_by_desc(equity_snapshot::Column::Id)
            .one(&self.db)
            .await?;

        Ok(model.map(StoredEquitySnapshot::from))
    }

    async fn find_bucketed(
        &self,
        account_id: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<EquityPoint>, RecordError> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let stmt = Statement::from_sql_and_values(
            DbBackend::Sqlite,
            BUCKETED_HISTORY_SQL,
            [
                Value::from(window.bucket_ms),
                Value::from(account_id),
                Value::from(window.from_ts),
                Value::from(window.to_ts),
            ],
        );

        let rows = BucketRow::find_by_statement(stmt).all(&self.db).await?;

        Ok(rows
            .into_iter()
            .map(|row| EquityPoint {
                timestamp: row.timestamp,
                equity: row.equity,
            })
            .collect())
    }

    async fn count(&self, account_id: &str) -> Result<u64, RecordError> {
        let count = equity_snapshot::Entity::find()
            .filter(equity_snapshot::Column::AccountId.eq(account_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}
