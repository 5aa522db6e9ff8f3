//! `SeaORM` entity definitions.
//!
//! Each table has a module with its `Model`, `ActiveModel`, `Column` and
//! `Relation`. String-backed enums live in `sea_orm_active_enums`.

pub mod account_locks;
pub mod account_users;
pub mod accounts;
pub mod sea_orm_active_enums;
pub mod transactions;

pub mod prelude {
    //! Entity re-exports.

    pub use super::account_locks::Entity as AccountLocks;
    pub use super::account_users::Entity as AccountUsers;
    pub use super::accounts::Entity as Accounts;
    pub use super::transactions::Entity as Transactions;
}
