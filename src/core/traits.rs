//! Core trait for the balance store
//!
//! The deduction engine talks to its backing store only through this trait so
//! the in-memory store, a database-backed store, or a deliberately failing
//! test double can be swapped in.

use async_trait::async_trait;

use crate::types::{AccountId, LabError, MinorUnits};

/// Single source of truth for account balances
///
/// `get` and `set` are each atomic on their own. Nothing makes a `get`
/// followed by a `set` atomic; that is the deduction engine's job.
/// Implementations must not cache: every call is a round trip to the
/// backing store, and that latency is part of the race window.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Read the current balance
    ///
    /// # Errors
    ///
    /// * `LabError::AccountNotFound` - If the account does not exist
    async fn get(&self, account: AccountId) -> Result<MinorUnits, LabError>;

    /// Overwrite the balance unconditionally (last writer wins)
    ///
    /// # Errors
    ///
    /// * `LabError::AccountNotFound` - If the account does not exist
    /// * `LabError::StoreWriteFailure` - If the backing store rejects the write
    async fn set(&self, account: AccountId, balance: MinorUnits) -> Result<(), LabError>;
}
