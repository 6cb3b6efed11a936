//! In-memory balance store
//!
//! `MemoryBalanceStore` keeps account records in a `DashMap`, so each
//! individual read or write is atomic while nothing spans a read and a
//! later write. An optional per-call latency simulates the database
//! round trip of a real deployment.
//!
//! # Thread Safety
//!
//! All methods take `&self` and are safe to call from many tasks at once.
//! DashMap shards its locks, so each entry guard is held only for the
//! duration of one call and never across an `.await`.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::BalanceStore;
use crate::types::{Account, AccountId, LabError, MinorUnits};

/// Thread-safe in-memory account store
#[derive(Debug, Default)]
pub struct MemoryBalanceStore {
    /// Account records keyed by account ID
    accounts: DashMap<AccountId, Account>,

    /// Simulated round-trip latency added before every `get` and `set`
    latency: Duration,
}

impl MemoryBalanceStore {
    /// Create an empty store with no simulated latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that sleeps `latency` before every call
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            accounts: DashMap::new(),
            latency,
        }
    }

    /// Create (or replace) an account with the given opening balance
    pub fn open_account(&self, account: AccountId, balance: MinorUnits) {
        self.accounts.insert(account, Account::new(account, balance));
    }

    /// Copy of the full account record, if it exists
    pub fn account(&self, account: AccountId) -> Option<Account> {
        self.accounts.get(&account).map(|entry| entry.value().clone())
    }

    /// Modify an account record while holding its entry lock
    ///
    /// This is the store's critical-section read-modify-write: the closure
    /// sees and mutates the record with no other writer interleaving.
    ///
    /// # Errors
    ///
    /// * `LabError::AccountNotFound` - If the account does not exist
    /// * Any error returned by the closure
    pub fn update<F>(&self, account: AccountId, f: F) -> Result<(), LabError>
    where
        F: FnOnce(&mut Account) -> Result<(), LabError>,
    {
        let mut entry = self
            .accounts
            .get_mut(&account)
            .ok_or_else(|| LabError::account_not_found(account))?;
        f(entry.value_mut())
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn get(&self, account: AccountId) -> Result<MinorUnits, LabError> {
        self.round_trip().await;
        self.accounts
            .get(&account)
            .map(|entry| entry.balance)
            .ok_or_else(|| LabError::account_not_found(account))
    }

    async fn set(&self, account: AccountId, balance: MinorUnits) -> Result<(), LabError> {
        self.round_trip().await;
        self.update(account, |record| {
            record.apply_balance(balance);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_returns_opening_balance() {
        let store = MemoryBalanceStore::new();
        store.open_account(1, 10_000);

        assert_eq!(store.get(1).await, Ok(10_000));
    }

    #[tokio::test]
    async fn test_get_unknown_account_is_not_found() {
        let store = MemoryBalanceStore::new();

        assert_eq!(store.get(99).await, Err(LabError::account_not_found(99)));
    }

    #[tokio::test]
    async fn test_set_overwrites_and_bumps_version() {
        let store = MemoryBalanceStore::new();
        store.open_account(1, 10_000);

        store.set(1, 9_000).await.unwrap();
        store.set(1, 9_500).await.unwrap();

        let account = store.account(1).unwrap();
        assert_eq!(account.balance, 9_500);
        assert_eq!(account.version, 2);
    }

    #[tokio::test]
    async fn test_set_unknown_account_is_not_found() {
        let store = MemoryBalanceStore::new();

        assert_eq!(store.set(5, 100).await, Err(LabError::account_not_found(5)));
        assert!(store.account(5).is_none());
    }

    #[tokio::test]
    async fn test_get_has_no_side_effects() {
        let store = MemoryBalanceStore::new();
        store.open_account(1, 4_200);

        for _ in 0..5 {
            assert_eq!(store.get(1).await, Ok(4_200));
        }
        assert_eq!(store.account(1).unwrap().version, 0);
    }

    #[test]
    fn test_update_returns_error_from_closure() {
        let store = MemoryBalanceStore::new();
        store.open_account(1, 100);

        let result = store.update(1, |_account| Err(LabError::store_write_failure(1, "nope")));

        assert_eq!(result, Err(LabError::store_write_failure(1, "nope")));
        assert_eq!(store.account(1).unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_latency_is_applied_per_call() {
        let store = MemoryBalanceStore::with_latency(Duration::from_millis(5));
        store.open_account(1, 100);

        let started = std::time::Instant::now();
        store.get(1).await.unwrap();
        store.set(1, 50).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    // Concurrent access tests
    // Individual calls are atomic; concurrent critical-section updates never lose a write.
    #[test]
    fn test_concurrent_updates_same_account() {
        use std::thread;

        let store = Arc::new(MemoryBalanceStore::new());
        store.open_account(1, 0);
        let mut handles = vec![];

        for _ in 0..100 {
            let store_clone = Arc::clone(&store);
            let handle = thread::spawn(move || {
                store_clone
                    .update(1, |account| {
                        account.apply_balance(account.balance + 100);
                        Ok(())
                    })
                    .unwrap();
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let account = store.account(1).unwrap();
        assert_eq!(account.balance, 10_000);
        assert_eq!(account.version, 100);
    }
}
