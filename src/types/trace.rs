//! Deduction request, response, timeline and conflict types
//!
//! These are the values that flow through the deduction engine: a validated
//! request goes in, a response plus a [`RequestTrace`] come out, and pairs of
//! traces that read the same stale balance become a [`ConflictSnapshot`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::{AccountId, MinorUnits};
use super::error::LabError;
use super::time::epoch_millis;

/// Opaque unique token identifying one deduction call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random request identifier
    pub fn generate() -> Self {
        RequestId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId(value.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which read-compute-write protocol a deduction runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// No ordering between concurrent deductions (exhibits lost updates)
    #[default]
    Unprotected,

    /// Read, compute and write serialized under a per-account mutex
    Protected,
}

impl ExecutionMode {
    pub fn from_use_lock(use_lock: bool) -> Self {
        if use_lock {
            ExecutionMode::Protected
        } else {
            ExecutionMode::Unprotected
        }
    }

    pub fn uses_lock(self) -> bool {
        matches!(self, ExecutionMode::Protected)
    }

    /// Human label used in telemetry (`locked` / `unlocked`)
    pub fn label(self) -> &'static str {
        match self {
            ExecutionMode::Unprotected => "unlocked",
            ExecutionMode::Protected => "locked",
        }
    }
}

/// A validated deduction request
///
/// Immutable once built. Construction is the input validation boundary:
/// a request that exists always has a positive amount.
#[derive(Debug, Clone, PartialEq)]
pub struct DeductionRequest {
    request_id: RequestId,
    account: AccountId,
    amount: MinorUnits,
}

impl DeductionRequest {
    /// Validate and build a request with a freshly generated identifier
    ///
    /// # Errors
    ///
    /// * `LabError::InvalidInput` - If `amount` is zero or negative
    pub fn new(account: AccountId, amount: MinorUnits) -> Result<Self, LabError> {
        Self::with_id(RequestId::generate(), account, amount)
    }

    /// Validate and build a request with a caller-supplied identifier
    pub fn with_id(
        request_id: RequestId,
        account: AccountId,
        amount: MinorUnits,
    ) -> Result<Self, LabError> {
        if amount <= 0 {
            return Err(LabError::invalid_input(
                "amount",
                &format!("must be a positive number of minor units, got {}", amount),
            ));
        }

        Ok(DeductionRequest {
            request_id,
            account,
            amount,
        })
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn amount(&self) -> MinorUnits {
        self.amount
    }
}

/// Result of a successful deduction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionResponse {
    /// Account the deduction was applied to
    #[serde(rename = "user_id")]
    pub account: AccountId,

    /// Balance observed by the read step
    pub old_balance: MinorUnits,

    /// Balance written by the write step
    #[serde(rename = "balance")]
    pub new_balance: MinorUnits,

    pub request_id: RequestId,

    /// Protocol the call actually ran under
    pub mode: ExecutionMode,
}

/// Timeline of one completed deduction
///
/// All timestamps are nanoseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestTrace {
    pub request_id: RequestId,
    pub read_time: i64,
    pub read_value: MinorUnits,
    pub compute_start: i64,
    pub compute_end: i64,
    pub write_time: i64,
    pub write_value: MinorUnits,
    pub amount: MinorUnits,
}

/// Retained record of one observed lost update
///
/// `request_a` read first, `request_b` read second, and both read the same
/// balance. Derived fields describe what the store saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictSnapshot {
    pub request_a: RequestTrace,
    pub request_b: RequestTrace,

    /// The shared (stale) balance both requests read
    pub initial_value: MinorUnits,

    /// Value written by A
    pub after_a: MinorUnits,

    /// Value written by B
    pub after_b: MinorUnits,

    /// What B should have written had it built on A's result
    pub expected_after_b: MinorUnits,

    pub is_conflict: bool,

    /// Amount erased by B's overwrite (`after_b - expected_after_b`)
    ///
    /// Both requests read the same value, so this always equals A's
    /// deduction (`request_a.amount`).
    pub lost_amount: MinorUnits,

    /// Mode flag observed at capture time
    ///
    /// A snapshot captured with `use_lock == true` is detector noise.
    pub use_lock: bool,

    /// Capture time in epoch milliseconds
    pub captured_at: i64,
}

impl ConflictSnapshot {
    /// Build a snapshot from an ordered pair of traces
    ///
    /// `a` must be the earlier reader. Both are expected to share a
    /// `read_value`; the detector guarantees it.
    pub fn from_pair(a: RequestTrace, b: RequestTrace, use_lock: bool) -> Self {
        let initial_value = a.read_value;
        let after_a = a.write_value;
        let after_b = b.write_value;
        let expected_after_b = after_a - b.amount;

        ConflictSnapshot {
            initial_value,
            after_a,
            after_b,
            expected_after_b,
            // B read a value that did not include A's write
            is_conflict: true,
            lost_amount: after_b - expected_after_b,
            use_lock,
            captured_at: epoch_millis(),
            request_a: a,
            request_b: b,
        }
    }

    /// Whether this snapshot evidences a real lost update
    pub fn indicates_lost_update(&self) -> bool {
        self.is_conflict && !self.use_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn trace(id: &str, read_time: i64, read_value: i64, amount: i64) -> RequestTrace {
        RequestTrace {
            request_id: RequestId::from(id),
            read_time,
            read_value,
            compute_start: read_time + 10,
            compute_end: read_time + 20,
            write_time: read_time + 30,
            write_value: read_value - amount,
            amount,
        }
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-100)]
    fn test_request_rejects_non_positive_amount(#[case] amount: MinorUnits) {
        let result = DeductionRequest::new(1, amount);

        assert!(matches!(result, Err(LabError::InvalidInput { .. })));
    }

    #[test]
    fn test_request_accepts_positive_amount() {
        let request = DeductionRequest::new(1, 1000).unwrap();

        assert_eq!(request.account(), 1);
        assert_eq!(request.amount(), 1000);
        assert!(!request.request_id().as_str().is_empty());
    }

    #[test]
    fn test_generated_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();

        assert_ne!(a, b);
    }

    #[rstest]
    #[case::unprotected(false, ExecutionMode::Unprotected, "unlocked")]
    #[case::protected(true, ExecutionMode::Protected, "locked")]
    fn test_execution_mode_mapping(
        #[case] use_lock: bool,
        #[case] mode: ExecutionMode,
        #[case] label: &str,
    ) {
        assert_eq!(ExecutionMode::from_use_lock(use_lock), mode);
        assert_eq!(mode.uses_lock(), use_lock);
        assert_eq!(mode.label(), label);
    }

    #[test]
    fn test_snapshot_arithmetic_for_classic_lost_update() {
        // Both read 10000 and both write 9000; A's deduction vanishes.
        let a = trace("a", 100, 10_000, 1_000);
        let b = trace("b", 200, 10_000, 1_000);

        let snapshot = ConflictSnapshot::from_pair(a, b, false);

        assert_eq!(snapshot.initial_value, 10_000);
        assert_eq!(snapshot.after_a, 9_000);
        assert_eq!(snapshot.after_b, 9_000);
        assert_eq!(snapshot.expected_after_b, 8_000);
        assert_eq!(snapshot.lost_amount, 1_000);
        assert!(snapshot.is_conflict);
        assert!(snapshot.indicates_lost_update());
    }

    #[test]
    fn test_snapshot_with_different_amounts_loses_a_amount() {
        let a = trace("a", 100, 5_000, 300);
        let b = trace("b", 150, 5_000, 700);

        let snapshot = ConflictSnapshot::from_pair(a, b, false);

        assert_eq!(snapshot.after_a, 4_700);
        assert_eq!(snapshot.after_b, 4_300);
        assert_eq!(snapshot.expected_after_b, 4_000);
        assert_eq!(snapshot.lost_amount, 300);
    }

    #[rstest]
    #[case::equal_amounts(10_000, 1_000, 1_000)]
    #[case::smaller_first(5_000, 300, 700)]
    #[case::larger_first(5_000, 2_000, 1)]
    fn test_lost_amount_is_first_deduction(
        #[case] read_value: MinorUnits,
        #[case] amount_a: MinorUnits,
        #[case] amount_b: MinorUnits,
    ) {
        let a = trace("a", 100, read_value, amount_a);
        let b = trace("b", 200, read_value, amount_b);

        let snapshot = ConflictSnapshot::from_pair(a, b, false);

        assert_eq!(snapshot.lost_amount, snapshot.request_a.amount);
        assert!(snapshot.indicates_lost_update());
    }

    #[test]
    fn test_snapshot_under_lock_is_not_a_lost_update() {
        let a = trace("a", 100, 10_000, 1_000);
        let b = trace("b", 200, 10_000, 1_000);

        let snapshot = ConflictSnapshot::from_pair(a, b, true);

        assert!(snapshot.use_lock);
        assert_eq!(snapshot.lost_amount, 1_000);
        assert!(!snapshot.indicates_lost_update());
    }

    #[test]
    fn test_response_serializes_with_wire_names() {
        let response = DeductionResponse {
            account: 1,
            old_balance: 10_000,
            new_balance: 9_000,
            request_id: RequestId::from("abc"),
            mode: ExecutionMode::Protected,
        };

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["user_id"], 1);
        assert_eq!(json["old_balance"], 10_000);
        assert_eq!(json["balance"], 9_000);
        assert_eq!(json["request_id"], "abc");
        assert_eq!(json["mode"], "protected");
    }
}
