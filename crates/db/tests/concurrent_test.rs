//! Concurrent access tests for balance operations under the account lock.
//!
//! These tests verify that:
//! - At most one task is ever inside the locked section of an account
//! - Many concurrent uses on one account never overdraw it
//! - Operations on different accounts do not block each other
//!
//! The in-memory pool has a single connection, which already serializes
//! database transactions. Mutual exclusion is therefore asserted by counting
//! tasks inside the locked section, not by the final balance alone.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tally_core::lock::{InMemoryLockBackend, LockBackend, LockManager, LockSettings};
use tally_db::{
    AccountRepository, DatabaseLockBackend, TransactionError, TransactionRepository,
    entities::{sea_orm_active_enums::TransactionResultType, transactions},
};
use tally_shared::ErrorCode;

use common::fixture;

fn settings() -> LockSettings {
    LockSettings {
        wait: Duration::from_secs(1),
        ..LockSettings::default()
    }
}

/// Tracks how many tasks are inside a section at once.
#[derive(Default)]
struct Occupancy {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

async fn run_concurrent_uses(locks: LockManager, f: &common::Fixture, attempts: usize) {
    let repo = TransactionRepository::new(f.db.clone());
    let occupancy = Arc::new(Occupancy::default());

    let tasks = (0..attempts).map(|_| {
        let repo = repo.clone();
        let locks = locks.clone();
        let occupancy = Arc::clone(&occupancy);
        let account_number = f.account.account_number.clone();
        let user_id = f.user_id;
        tokio::spawn(async move {
            locks
                .with_lock(&account_number, || async {
                    occupancy.enter();
                    // Give every other task a chance to enter alongside.
                    tokio::task::yield_now().await;
                    let result = repo.use_balance(user_id, &account_number, 100).await;
                    tokio::task::yield_now().await;
                    occupancy.leave();
                    result
                })
                .await
        })
    });

    let mut succeeded = 0;
    let mut overdrawn = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(TransactionError::Business(ErrorCode::AmountExceedBalance)) => overdrawn += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(occupancy.peak(), 1);
    assert_eq!(succeeded, 10);
    assert_eq!(overdrawn, attempts - 10);

    let account = AccountRepository::new(f.db.clone())
        .find_by_account_number(&f.account.account_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 0);

    let successes = transactions::Entity::find()
        .filter(transactions::Column::TransactionResultType.eq(TransactionResultType::Success))
        .count(&f.db)
        .await
        .unwrap();
    assert_eq!(successes, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uses_never_overdraw_with_memory_lock() {
    let f = fixture(1_000).await;
    let locks = LockManager::new(Arc::new(InMemoryLockBackend::new()), settings());

    run_concurrent_uses(locks, &f, 25).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uses_never_overdraw_with_database_lock() {
    let f = fixture(1_000).await;
    let backend: Arc<dyn LockBackend> =
        Arc::new(DatabaseLockBackend::new(f.db.clone(), Duration::from_millis(2)));
    let locks = LockManager::new(backend, settings());

    run_concurrent_uses(locks, &f, 15).await;
}

#[tokio::test]
async fn test_distinct_accounts_proceed_independently() {
    let f = fixture(1_000).await;
    let second = AccountRepository::new(f.db.clone())
        .create_account(f.user_id, 1_000)
        .await
        .unwrap();
    let locks = LockManager::new(Arc::new(InMemoryLockBackend::new()), settings());
    let repo = TransactionRepository::new(f.db.clone());

    // Holding the first account's lock must not block the second account.
    let held = locks.acquire(&f.account.account_number).await.unwrap();
    let summary = locks
        .with_lock(&second.account_number, || {
            repo.use_balance(f.user_id, &second.account_number, 300)
        })
        .await
        .unwrap();
    held.release().await;

    assert_eq!(summary.balance_snapshot, 700);
}
