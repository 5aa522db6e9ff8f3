//! `SeaORM` Entity for transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::TransactionRecord;

use super::sea_orm_active_enums::{TransactionResultType, TransactionType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub transaction_result_type: TransactionResultType,
    pub account_id: i64,
    pub amount: i64,
    pub balance_snapshot: i64,
    pub transacted_at: DateTimeUtc,
    #[sea_orm(unique)]
    pub original_transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for TransactionRecord {
    fn from(model: Model) -> Self {
        Self {
            transaction_id: model.transaction_id,
            transaction_type: model.transaction_type.into(),
            result: model.transaction_result_type.into(),
            account_id: model.account_id,
            amount: model.amount,
            balance_snapshot: model.balance_snapshot,
            transacted_at: model.transacted_at,
            original_transaction_id: model.original_transaction_id,
        }
    }
}
