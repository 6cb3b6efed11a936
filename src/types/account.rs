//! Account-related types for the balance race lab
//!
//! This module defines the Account record owned by the balance store and the
//! integer money representation shared by every component.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Account identifier (the unique `user_id` of the backing store)
pub type AccountId = i64;

/// Money in minor currency units (cents)
///
/// Balances and amounts are integers so no fractional rounding ever happens.
pub type MinorUnits = i64;

/// Number of minor units in one major unit
const MINOR_UNIT_SCALE: u32 = 2;

/// Persisted account record
///
/// One record per account. The balance is mutated only through the
/// deduction engine's write step (or an explicit reset).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Unique account identifier
    pub id: AccountId,

    /// Current balance in minor units
    pub balance: MinorUnits,

    /// Incremented on every write
    ///
    /// The lab never checks it before writing; it only makes overwritten
    /// updates visible after the fact.
    pub version: u64,

    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with the given opening balance
    ///
    /// # Arguments
    ///
    /// * `id` - The account identifier
    /// * `balance` - Opening balance in minor units
    ///
    /// # Returns
    ///
    /// A new Account at version 0
    pub fn new(id: AccountId, balance: MinorUnits) -> Self {
        Account {
            id,
            balance,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Overwrite the balance, bumping the version and timestamp
    pub fn apply_balance(&mut self, balance: MinorUnits) {
        self.balance = balance;
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Convert minor units to a major-unit decimal for display (1050 -> 10.50)
pub fn to_major_units(value: MinorUnits) -> Decimal {
    Decimal::new(value, MINOR_UNIT_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_account_starts_at_version_zero() {
        let account = Account::new(1, 10_000);

        assert_eq!(account.id, 1);
        assert_eq!(account.balance, 10_000);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_apply_balance_bumps_version() {
        let mut account = Account::new(1, 10_000);
        let created_at = account.updated_at;

        account.apply_balance(9_000);
        account.apply_balance(8_000);

        assert_eq!(account.balance, 8_000);
        assert_eq!(account.version, 2);
        assert!(account.updated_at >= created_at);
    }

    #[rstest]
    #[case::whole(10_000, "100.00")]
    #[case::fractional(1_050, "10.50")]
    #[case::single_cent(1, "0.01")]
    #[case::zero(0, "0.00")]
    #[case::negative(-250, "-2.50")]
    fn test_to_major_units(#[case] minor: MinorUnits, #[case] expected: &str) {
        assert_eq!(to_major_units(minor).to_string(), expected);
    }
}
