//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::Account;

use super::sea_orm_active_enums::AccountStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_user_id: i64,
    #[sea_orm(unique)]
    pub account_number: String,
    pub account_status: AccountStatus,
    pub balance: i64,
    pub registered_at: DateTimeUtc,
    pub unregistered_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account_users::Entity",
        from = "Column::AccountUserId",
        to = "super::account_users::Column::Id"
    )]
    AccountUsers,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::account_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountUsers.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.account_user_id,
            account_number: model.account_number,
            status: model.account_status.into(),
            balance: model.balance,
            registered_at: model.registered_at,
            unregistered_at: model.unregistered_at,
        }
    }
}
