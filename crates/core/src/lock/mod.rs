//! Per-account mutual exclusion.
//!
//! Balance-changing operations run while holding a lock named after the
//! account number. The lock itself lives in an external coordination backend
//! behind [`LockBackend`]; [`LockManager`] adds the wait window, the lease,
//! the failure policy and guaranteed release.
//!
//! # Modules
//!
//! - `manager` - Acquire/release policy, `with_lock`, and the RAII guard
//! - `memory` - Process-local backend

pub mod manager;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use manager::{AccountLockGuard, LockManager, LockSettings};
pub use memory::InMemoryLockBackend;

/// Namespace prefix for account lock keys.
pub const LOCK_KEY_PREFIX: &str = "ACLK:";

/// Builds the lock key for an account.
#[must_use]
pub fn lock_key(account_number: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{account_number}")
}

/// A request that targets a single account and must run under its lock.
pub trait AccountLocked {
    /// The account number the lock is keyed by.
    fn account_number(&self) -> &str;
}

impl AccountLocked for str {
    fn account_number(&self) -> &str {
        self
    }
}

impl AccountLocked for String {
    fn account_number(&self) -> &str {
        self
    }
}

/// Communication failure with a lock backend.
#[derive(Debug, Error)]
pub enum LockBackendError {
    /// The backend could not be reached or answered with an error.
    #[error("Lock backend unavailable: {0}")]
    Unavailable(String),
}

/// External coordination service holding named, leased locks.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Tries to take `key` for `holder`, waiting at most `wait`.
    ///
    /// Returns `Ok(false)` when the wait window closed while someone else held
    /// the key. A granted lock is dropped by the backend after `lease` even if
    /// the holder never releases it.
    async fn try_acquire(
        &self,
        key: &str,
        holder: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockBackendError>;

    /// Releases `key` if `holder` still owns it; otherwise does nothing.
    async fn release(&self, key: &str, holder: &str) -> Result<(), LockBackendError>;
}
