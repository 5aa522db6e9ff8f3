//! Lock acquisition policy and guaranteed release.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tally_shared::{ErrorCode, LockConfig};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{AccountLocked, LockBackend, lock_key};

/// Timing and failure policy for account locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// How long to wait for a contended lock.
    pub wait: Duration,
    /// How long the backend honors a granted lock.
    pub lease: Duration,
    /// Proceed without the lock when the backend errors (as opposed to timing out).
    pub fail_open: bool,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(1),
            lease: Duration::from_secs(15),
            fail_open: false,
        }
    }
}

impl From<&LockConfig> for LockSettings {
    fn from(config: &LockConfig) -> Self {
        Self {
            wait: Duration::from_millis(config.wait_ms),
            lease: Duration::from_millis(config.lease_ms),
            fail_open: config.fail_open,
        }
    }
}

/// Acquires and releases per-account locks.
#[derive(Clone)]
pub struct LockManager {
    backend: Arc<dyn LockBackend>,
    settings: LockSettings,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LockManager {
    /// Creates a lock manager over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn LockBackend>, settings: LockSettings) -> Self {
        Self { backend, settings }
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> LockSettings {
        self.settings
    }

    /// Acquires the lock for `account_number`.
    ///
    /// The returned guard releases the lock when [`AccountLockGuard::release`]
    /// is awaited, or in the background if it is dropped instead.
    ///
    /// # Errors
    ///
    /// `AccountTransactionLock` if the wait window closes first, or if the
    /// backend fails and `fail_open` is off.
    pub async fn acquire(&self, account_number: &str) -> Result<AccountLockGuard, ErrorCode> {
        let key = lock_key(account_number);
        let holder = Uuid::new_v4().simple().to_string();
        debug!(account_number = %account_number, "Trying lock");

        match self
            .backend
            .try_acquire(&key, &holder, self.settings.wait, self.settings.lease)
            .await
        {
            Ok(true) => Ok(AccountLockGuard {
                backend: Arc::clone(&self.backend),
                lease: Some(Lease { key, holder }),
            }),
            Ok(false) => {
                error!(account_number = %account_number, "Lock acquisition failed");
                Err(ErrorCode::AccountTransactionLock)
            }
            Err(e) if self.settings.fail_open => {
                error!(
                    account_number = %account_number,
                    error = %e,
                    "Lock backend failed, proceeding without lock"
                );
                Ok(AccountLockGuard {
                    backend: Arc::clone(&self.backend),
                    lease: None,
                })
            }
            Err(e) => {
                error!(account_number = %account_number, error = %e, "Lock backend failed");
                Err(ErrorCode::AccountTransactionLock)
            }
        }
    }

    /// Runs `operation` while holding the lock of the request's account.
    ///
    /// The lock is released whether the operation succeeds or fails. If the
    /// lock cannot be taken the operation is never started.
    ///
    /// # Errors
    ///
    /// Returns the lock error converted into `E`, or the operation's own error.
    pub async fn with_lock<R, F, Fut, T, E>(&self, request: &R, operation: F) -> Result<T, E>
    where
        R: AccountLocked + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ErrorCode>,
    {
        let guard = self.acquire(request.account_number()).await?;
        let result = operation().await;
        guard.release().await;
        result
    }
}

#[derive(Debug)]
struct Lease {
    key: String,
    holder: String,
}

async fn release_lease(backend: &dyn LockBackend, lease: &Lease) {
    debug!(key = %lease.key, "Unlock");
    if let Err(e) = backend.release(&lease.key, &lease.holder).await {
        warn!(key = %lease.key, error = %e, "Lock release failed, lease will expire");
    }
}

/// Proof of holding an account lock.
///
/// Dropping the guard without awaiting [`Self::release`] (a cancelled request,
/// a panic) schedules the release on the current runtime.
#[must_use = "dropping the guard releases the lock"]
pub struct AccountLockGuard {
    backend: Arc<dyn LockBackend>,
    lease: Option<Lease>,
}

impl std::fmt::Debug for AccountLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLockGuard")
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}

impl AccountLockGuard {
    /// Returns false when the lock was skipped because the backend failed open.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.lease.is_some()
    }

    /// Releases the lock. Never fails; backend errors are logged.
    pub async fn release(mut self) {
        if let Some(lease) = self.lease.take() {
            release_lease(self.backend.as_ref(), &lease).await;
        }
    }
}

impl Drop for AccountLockGuard {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };

        let backend = Arc::clone(&self.backend);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_lease(backend.as_ref(), &lease).await;
                });
            }
            Err(_) => {
                warn!(key = %lease.key, "No runtime to release lock, lease will expire");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    use async_trait::async_trait;
    use futures::future::join_all;

    use super::*;
    use crate::lock::{InMemoryLockBackend, LockBackendError};

    struct UnreachableBackend;

    #[async_trait]
    impl LockBackend for UnreachableBackend {
        async fn try_acquire(
            &self,
            _key: &str,
            _holder: &str,
            _wait: Duration,
            _lease: Duration,
        ) -> Result<bool, LockBackendError> {
            Err(LockBackendError::Unavailable("connection refused".into()))
        }

        async fn release(&self, _key: &str, _holder: &str) -> Result<(), LockBackendError> {
            Err(LockBackendError::Unavailable("connection refused".into()))
        }
    }

    fn settings(wait_ms: u64) -> LockSettings {
        LockSettings {
            wait: Duration::from_millis(wait_ms),
            ..LockSettings::default()
        }
    }

    fn manager(backend: &Arc<InMemoryLockBackend>, wait_ms: u64) -> LockManager {
        LockManager::new(Arc::clone(backend) as Arc<dyn LockBackend>, settings(wait_ms))
    }

    #[tokio::test]
    async fn test_with_lock_holds_then_releases() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let locks = manager(&backend, 100);

        let result: Result<i32, ErrorCode> = locks
            .with_lock("12345", || async {
                assert!(backend.is_held("ACLK:12345"));
                Ok(7)
            })
            .await;

        assert_eq!(result, Ok(7));
        assert!(!backend.is_held("ACLK:12345"));
    }

    #[tokio::test]
    async fn test_with_lock_releases_even_if_operation_fails() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let locks = manager(&backend, 100);

        let result: Result<(), ErrorCode> = locks
            .with_lock("54322", || async { Err(ErrorCode::AmountExceedBalance) })
            .await;

        assert_eq!(result, Err(ErrorCode::AmountExceedBalance));
        assert!(!backend.is_held("ACLK:54322"));
    }

    #[tokio::test]
    async fn test_timeout_never_runs_operation() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let locks = manager(&backend, 30);
        let _held = locks.acquire("123").await.unwrap();

        let ran = AtomicBool::new(false);
        let result: Result<(), ErrorCode> = locks
            .with_lock("123", || async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(ErrorCode::AccountTransactionLock));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_backend_failure_fails_closed_by_default() {
        let locks = LockManager::new(Arc::new(UnreachableBackend), LockSettings::default());

        let ran = AtomicBool::new(false);
        let result: Result<(), ErrorCode> = locks
            .with_lock("123", || async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(ErrorCode::AccountTransactionLock));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_backend_failure_fails_open_when_configured() {
        let locks = LockManager::new(
            Arc::new(UnreachableBackend),
            LockSettings {
                fail_open: true,
                ..LockSettings::default()
            },
        );

        let guard = locks.acquire("123").await.unwrap();
        assert!(!guard.is_held());
        guard.release().await;

        let result: Result<i32, ErrorCode> = locks.with_lock("123", || async { Ok(1) }).await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn test_release_failure_is_swallowed() {
        let guard = AccountLockGuard {
            backend: Arc::new(UnreachableBackend),
            lease: Some(Lease {
                key: lock_key("123"),
                holder: "h".into(),
            }),
        };
        assert!(guard.is_held());
        guard.release().await;
    }

    #[test]
    fn test_settings_from_config() {
        let config = LockConfig {
            wait_ms: 250,
            lease_ms: 5_000,
            fail_open: true,
            ..LockConfig::default()
        };
        let settings = LockSettings::from(&config);
        assert_eq!(settings.wait, Duration::from_millis(250));
        assert_eq!(settings.lease, Duration::from_millis(5_000));
        assert!(settings.fail_open);
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_in_background() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let locks = manager(&backend, 100);

        let guard = locks.acquire("777").await.unwrap();
        assert!(backend.is_held("ACLK:777"));
        drop(guard);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!backend.is_held("ACLK:777"));
    }

    #[tokio::test]
    async fn test_panicking_operation_releases_lock() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let locks = manager(&backend, 100);

        let task = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _: Result<(), ErrorCode> = locks
                    .with_lock("888", || async { panic!("operation failed hard") })
                    .await;
            })
        };
        assert!(task.await.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!backend.is_held("ACLK:888"));
    }

    #[tokio::test]
    async fn test_same_account_operations_do_not_interleave() {
        let backend = Arc::new(InMemoryLockBackend::new());
        let locks = manager(&backend, 1_000);
        let balance = AtomicI64::new(1_000);

        let debits = (0..20).map(|_| {
            locks.with_lock("1000000000", || async {
                let read = balance.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                balance.store(read - 10, Ordering::SeqCst);
                Ok::<_, ErrorCode>(())
            })
        });
        for result in join_all(debits).await {
            result.unwrap();
        }

        assert_eq!(balance.load(Ordering::SeqCst), 800);
    }
}
