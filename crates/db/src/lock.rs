//! Lease-table lock backend.
//!
//! A held lock is a row in `account_locks`. The primary key makes the insert
//! the arbitration point: whoever inserts first owns the key until the row is
//! deleted or its `expires_at` passes. Waiters poll at a fixed interval.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use tally_core::lock::{LockBackend, LockBackendError};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::entities::account_locks;

/// Lock backend over the `account_locks` table; safe across server instances.
#[derive(Debug, Clone)]
pub struct DatabaseLockBackend {
    db: DatabaseConnection,
    retry_interval: Duration,
}

impl DatabaseLockBackend {
    /// Creates a backend polling every `retry_interval` while a key is held.
    #[must_use]
    pub const fn new(db: DatabaseConnection, retry_interval: Duration) -> Self {
        Self { db, retry_interval }
    }

    async fn try_claim(&self, key: &str, holder: &str, lease: Duration) -> Result<bool, DbErr> {
        let now = Utc::now();

        if let Some(existing) = account_locks::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
        {
            if existing.expires_at > now {
                return Ok(false);
            }
            // Only remove the lease we saw expire; a fresh one may have replaced it.
            debug!(key = %key, stale_holder = %existing.holder, "Reclaiming expired lock");
            account_locks::Entity::delete_many()
                .filter(account_locks::Column::LockKey.eq(key))
                .filter(account_locks::Column::Holder.eq(existing.holder))
                .exec(&self.db)
                .await?;
        }

        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| DbErr::Custom(format!("invalid lease duration: {e}")))?;
        let row = account_locks::ActiveModel {
            lock_key: Set(key.to_string()),
            holder: Set(holder.to_string()),
            expires_at: Set(now + lease),
        };

        match account_locks::Entity::insert(row)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn unavailable(e: DbErr) -> LockBackendError {
    LockBackendError::Unavailable(e.to_string())
}

#[async_trait]
impl LockBackend for DatabaseLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockBackendError> {
        let deadline = Instant::now() + wait;

        loop {
            if self
                .try_claim(key, holder, lease)
                .await
                .map_err(unavailable)?
            {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            sleep(self.retry_interval.min(deadline - now)).await;
        }
    }

    async fn release(&self, key: &str, holder: &str) -> Result<(), LockBackendError> {
        account_locks::Entity::delete_many()
            .filter(account_locks::Column::LockKey.eq(key))
            .filter(account_locks::Column::Holder.eq(holder))
            .exec(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
