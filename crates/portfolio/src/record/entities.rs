/// 평가액 스냅샷 엔티티 모듈
pub mod equity_snapshot {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "equity_snapshots")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = true)]
        pub id: i64,

        /// 계좌 ID
        #[sea_orm(column_type = "Text")]
        pub account_id: String,

        /// 관측 시각 (epoch ms)
        #[sea_orm(column_type = "BigInteger")]
        pub ts: i64,

        /// 순청산가치
        #[sea_orm(column_type = "Double")]
        pub equity: f64,

        #[sea_orm(column_type = "Double", nullable)]
        pub cash_balance: Option<f64>,

        #[sea_orm(column_type = "Double", nullable)]
        pub settled_cash: Option<f64>,

        #[sea_orm(column_type = "Double", nullable)]
        pub stock_market_value: Option<f64>,

        #[sea_orm(column_type = "Double", nullable)]
        pub unrealized_pnl: Option<f64>,

        #[sea_orm(column_type = "Double", nullable)]
        pub realized_pnl: Option<f64>,

        /// 원장 통화 코드
        #[sea_orm(column_type = "Text", nullable)]
        pub currency: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
