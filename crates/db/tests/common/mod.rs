//! Shared fixtures for database integration tests.

#![allow(dead_code)]

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tally_core::ledger::Account;
use tally_db::{
    AccountRepository, AccountUserRepository, TransactionError, connect, migration::Migrator,
};
use tally_shared::{ErrorCode, config::DatabaseConfig};

/// Fresh migrated in-memory database.
///
/// `SQLite` memory databases are per connection, so the pool holds exactly one.
pub async fn memory_db() -> DatabaseConnection {
    let db = connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    })
    .await
    .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    db
}

/// A user owning one account with `balance`.
pub struct Fixture {
    pub db: DatabaseConnection,
    pub user_id: i64,
    pub account: Account,
}

pub async fn fixture(balance: i64) -> Fixture {
    let db = memory_db().await;
    let user = AccountUserRepository::new(db.clone())
        .create("Pororo")
        .await
        .unwrap();
    let account = AccountRepository::new(db.clone())
        .create_account(user.id, balance)
        .await
        .unwrap();

    Fixture {
        db,
        user_id: user.id,
        account,
    }
}

pub fn business(err: TransactionError) -> ErrorCode {
    err.business_code()
        .unwrap_or_else(|| panic!("expected business error, got {err}"))
}
