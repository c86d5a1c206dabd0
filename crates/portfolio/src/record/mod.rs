pub mod entities;
pub mod helpers;
pub mod history;
pub mod interfaces;
pub mod sqlite;
pub mod store;

pub use helpers::*;
pub use history::{EquityHistory, EquityPoint, HistoryQuery, HistoryRange, HistoryWindow};
pub use interfaces::{EquitySnapshot, RecordError, SnapshotRepository, StoredEquitySnapshot};
pub use sqlite::{SqliteSnapshotRepository, StoreLocation};
pub use store::{EquityHistoryStore, RecordOutcome};
