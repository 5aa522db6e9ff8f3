//! Database seeder for Tally development and testing.
//!
//! Creates a few account users, each with one funded account, so the API can
//! be exercised right after `migrator up`. Does nothing if users already exist.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tally_db::{AccountRepository, AccountUserRepository, connect, entities::account_users};
use tally_shared::AppConfig;

/// Seed users and their opening balances.
const SEED_USERS: [(&str, i64); 3] = [
    ("demo-user-1", 100_000),
    ("demo-user-2", 50_000),
    ("demo-user-3", 0),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    if account_users::Entity::find().count(&db).await? > 0 {
        println!("  Account users already exist, skipping...");
        return Ok(());
    }

    println!("Seeding account users...");
    seed_users(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_users(db: &DatabaseConnection) -> anyhow::Result<()> {
    let users = AccountUserRepository::new(db.clone());
    let accounts = AccountRepository::new(db.clone());

    for (name, balance) in SEED_USERS {
        let user = users.create(name).await?;
        let account = accounts.create_account(user.id, balance).await?;
        println!(
            "  {name} (id {}) -> account {} with balance {balance}",
            user.id, account.account_number
        );
    }

    Ok(())
}
