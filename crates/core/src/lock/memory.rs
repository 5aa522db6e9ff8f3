//! Process-local lock backend.
//!
//! Holds leases in a `DashMap` and wakes waiters through a `Notify` whenever a
//! lease is released. Only correct while a single process serves every account.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Notify;
use tokio::time::{Instant, sleep_until};

use super::{LockBackend, LockBackendError};

#[derive(Debug)]
struct HeldLease {
    holder: String,
    expires_at: Instant,
}

/// In-memory lock backend.
#[derive(Debug, Default)]
pub struct InMemoryLockBackend {
    leases: DashMap<String, HeldLease>,
    released: Notify,
}

impl InMemoryLockBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is held by a lease that has not expired.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.leases
            .get(key)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }

    /// Claims `key` unless a live lease holds it; on refusal returns that lease's expiry.
    fn try_claim(&self, key: &str, holder: &str, lease: Duration) -> Result<(), Instant> {
        let now = Instant::now();
        let claimed = HeldLease {
            holder: holder.to_string(),
            expires_at: now + lease,
        };

        match self.leases.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    return Err(entry.get().expires_at);
                }
                entry.insert(claimed);
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(claimed);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LockBackend for InMemoryLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockBackendError> {
        let deadline = Instant::now() + wait;

        loop {
            // Register for wake-ups before looking, so a release in between is not lost.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let held_until = match self.try_claim(key, holder, lease) {
                Ok(()) => return Ok(true),
                Err(expires_at) => expires_at,
            };

            if Instant::now() >= deadline {
                return Ok(false);
            }

            tokio::select! {
                () = notified.as_mut() => {}
                () = sleep_until(held_until.min(deadline)) => {}
            }
        }
    }

    async fn release(&self, key: &str, holder: &str) -> Result<(), LockBackendError> {
        if self
            .leases
            .remove_if(key, |_, lease| lease.holder == holder)
            .is_some()
        {
            self.released.notify_waiters();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const LEASE: Duration = Duration::from_secs(15);

    #[tokio::test]
    async fn test_acquire_free_key() {
        let backend = InMemoryLockBackend::new();
        assert!(
            backend
                .try_acquire("ACLK:1", "a", Duration::from_millis(10), LEASE)
                .await
                .unwrap()
        );
        assert!(backend.is_held("ACLK:1"));
    }

    #[tokio::test]
    async fn test_contended_key_times_out() {
        let backend = InMemoryLockBackend::new();
        backend
            .try_acquire("ACLK:1", "a", Duration::from_millis(10), LEASE)
            .await
            .unwrap();

        let started = Instant::now();
        let acquired = backend
            .try_acquire("ACLK:1", "b", Duration::from_millis(50), LEASE)
            .await
            .unwrap();
        assert!(!acquired);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let backend = InMemoryLockBackend::new();
        backend
            .try_acquire("ACLK:1", "a", Duration::from_millis(10), LEASE)
            .await
            .unwrap();
        assert!(
            backend
                .try_acquire("ACLK:2", "b", Duration::from_millis(10), LEASE)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_release() {
        let backend = Arc::new(InMemoryLockBackend::new());
        backend
            .try_acquire("ACLK:1", "a", Duration::from_millis(10), LEASE)
            .await
            .unwrap();

        let waiter = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                backend
                    .try_acquire("ACLK:1", "b", Duration::from_secs(1), LEASE)
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.release("ACLK:1", "a").await.unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimed() {
        let backend = InMemoryLockBackend::new();
        backend
            .try_acquire("ACLK:1", "crashed", Duration::from_millis(10), Duration::from_millis(20))
            .await
            .unwrap();

        assert!(
            backend
                .try_acquire("ACLK:1", "b", Duration::from_millis(200), LEASE)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_stale_holder_cannot_release_new_lease() {
        let backend = InMemoryLockBackend::new();
        backend
            .try_acquire("ACLK:1", "a", Duration::from_millis(10), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend
            .try_acquire("ACLK:1", "b", Duration::from_millis(10), LEASE)
            .await
            .unwrap();

        backend.release("ACLK:1", "a").await.unwrap();
        assert!(backend.is_held("ACLK:1"));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let backend = InMemoryLockBackend::new();
        backend.release("ACLK:never", "x").await.unwrap();

        backend
            .try_acquire("ACLK:1", "a", Duration::from_millis(10), LEASE)
            .await
            .unwrap();
        backend.release("ACLK:1", "a").await.unwrap();
        backend.release("ACLK:1", "a").await.unwrap();
        assert!(!backend.is_held("ACLK:1"));
    }
}
