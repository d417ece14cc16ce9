//! Per-wallet mutual exclusion.
//!
//! Settlement is a read-check-write sequence on the payer's wallet. Every
//! settlement against the same user runs under that user's lock, so two
//! debits can never both observe the same pre-debit balance.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use payment_types::UserId;

/// Table of async mutexes keyed by wallet owner.
///
/// Entries are created on first use and dropped again once no task holds
/// or waits on them.
#[derive(Default)]
pub struct WalletLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the wallet of `user_id`.
    pub async fn acquire(&self, user_id: UserId) -> WalletGuard<'_> {
        let lock = Arc::clone(&self.locks.entry(user_id).or_default());
        let guard = lock.lock_owned().await;

        WalletGuard {
            locks: &self.locks,
            user_id,
            guard: Some(guard),
        }
    }

    /// Number of wallets currently locked or contended.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one wallet; released on drop.
pub struct WalletGuard<'a> {
    locks: &'a DashMap<UserId, Arc<Mutex<()>>>,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WalletGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or awaits this lock.
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = WalletLocks::new();
        let user = UserId::new();

        {
            let _guard = locks.acquire(user).await;
            assert_eq!(locks.len(), 1);
        }

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_wallets_do_not_block() {
        let locks = WalletLocks::new();
        let _a = locks.acquire(UserId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(UserId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_same_wallet_is_blocked_until_release() {
        let locks = WalletLocks::new();
        let user = UserId::new();

        let guard = locks.acquire(user).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(user)).await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired = tokio::time::timeout(Duration::from_millis(100), locks.acquire(user)).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_critical_sections_never_overlap() {
        let locks = Arc::new(WalletLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let user = UserId::new();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let locks = locks.clone();
            let inside = inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(user).await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(locks.is_empty());
    }
}
