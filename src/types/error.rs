//! Error types for the balance race lab
//!
//! This module defines every error a caller of the core can observe.
//! Errors carry enough context to be logged or surfaced without further lookup.
//!
//! # Error Categories
//!
//! - **NotFound**: Unknown account, surfaced to the caller and never retried
//! - **Business rejections**: Insufficient balance, counted as a failed deduction
//! - **Infrastructure**: Store write failures, surfaced without retry
//! - **Input**: Malformed requests, rejected before the engine is invoked
//! - **Runtime**: Fatal setup and output errors of the command-line driver

use super::account::{AccountId, MinorUnits};
use thiserror::Error;

/// Main error type for the balance race lab
///
/// Every fallible operation of the store, the engine and the service facade
/// returns this type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabError {
    /// The account does not exist in the backing store
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account that was looked up
        account: AccountId,
    },

    /// The requested amount exceeds the balance observed at read time
    ///
    /// Under the unprotected protocol the observed balance may already be stale.
    #[error("Insufficient balance for account {account}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// Account ID
        account: AccountId,
        /// Balance observed by the read step
        balance: MinorUnits,
        /// Requested deduction amount
        requested: MinorUnits,
    },

    /// The backing store rejected a write
    #[error("Failed to write balance for account {account}: {message}")]
    StoreWriteFailure {
        /// Account ID
        account: AccountId,
        /// Description of the store failure
        message: String,
    },

    /// A request or configuration value is malformed
    #[error("Invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Fatal error in the command-line driver (runtime, I/O, encoding)
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the failure
        message: String,
    },
}

// Conversion from io::Error to LabError
impl From<std::io::Error> for LabError {
    fn from(error: std::io::Error) -> Self {
        LabError::Runtime {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LabError
impl From<csv::Error> for LabError {
    fn from(error: csv::Error) -> Self {
        LabError::Runtime {
            message: format!("CSV output failed: {}", error),
        }
    }
}

// Conversion from serde_json::Error to LabError
impl From<serde_json::Error> for LabError {
    fn from(error: serde_json::Error) -> Self {
        LabError::Runtime {
            message: format!("JSON encoding failed: {}", error),
        }
    }
}

// Helper functions for creating common errors

impl LabError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        LabError::AccountNotFound { account }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(
        account: AccountId,
        balance: MinorUnits,
        requested: MinorUnits,
    ) -> Self {
        LabError::InsufficientBalance {
            account,
            balance,
            requested,
        }
    }

    /// Create a StoreWriteFailure error
    pub fn store_write_failure(account: AccountId, message: &str) -> Self {
        LabError::StoreWriteFailure {
            account,
            message: message.to_string(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: &str, message: &str) -> Self {
        LabError::InvalidInput {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Runtime error
    pub fn runtime(message: &str) -> Self {
        LabError::Runtime {
            message: message.to_string(),
        }
    }

    /// Whether this error is an expected rejection rather than a system failure
    ///
    /// Business rejections are logged at `info`, everything else at `warn`.
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            LabError::AccountNotFound { .. }
                | LabError::InsufficientBalance { .. }
                | LabError::InvalidInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::account_not_found(
        LabError::AccountNotFound { account: 7 },
        "Account 7 not found"
    )]
    #[case::insufficient_balance(
        LabError::InsufficientBalance { account: 1, balance: 500, requested: 1000 },
        "Insufficient balance for account 1: balance 500, requested 1000"
    )]
    #[case::store_write_failure(
        LabError::StoreWriteFailure { account: 1, message: "connection reset".to_string() },
        "Failed to write balance for account 1: connection reset"
    )]
    #[case::invalid_input(
        LabError::InvalidInput { field: "amount".to_string(), message: "must be positive".to_string() },
        "Invalid amount: must be positive"
    )]
    #[case::runtime(
        LabError::Runtime { message: "no worker threads".to_string() },
        "Runtime error: no worker threads"
    )]
    fn test_error_display(#[case] error: LabError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::account_not_found(
        LabError::account_not_found(42),
        LabError::AccountNotFound { account: 42 }
    )]
    #[case::insufficient_balance(
        LabError::insufficient_balance(1, 500, 1000),
        LabError::InsufficientBalance { account: 1, balance: 500, requested: 1000 }
    )]
    #[case::store_write_failure(
        LabError::store_write_failure(3, "disk full"),
        LabError::StoreWriteFailure { account: 3, message: "disk full".to_string() }
    )]
    #[case::invalid_input(
        LabError::invalid_input("amount", "must be positive"),
        LabError::InvalidInput { field: "amount".to_string(), message: "must be positive".to_string() }
    )]
    fn test_helper_functions(#[case] result: LabError, #[case] expected: LabError) {
        assert_eq!(result, expected);
    }

    #[rstest]
    #[case::not_found(LabError::account_not_found(1), true)]
    #[case::insufficient(LabError::insufficient_balance(1, 0, 1), true)]
    #[case::invalid_input(LabError::invalid_input("amount", "zero"), true)]
    #[case::write_failure(LabError::store_write_failure(1, "down"), false)]
    #[case::runtime(LabError::runtime("boom"), false)]
    fn test_business_rejection_classification(#[case] error: LabError, #[case] expected: bool) {
        assert_eq!(error.is_business_rejection(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: LabError = io_error.into();
        assert!(matches!(error, LabError::Runtime { .. }));
        assert_eq!(error.to_string(), "Runtime error: Permission denied");
    }
}
