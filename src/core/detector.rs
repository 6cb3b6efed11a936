//! Lost-update detection
//!
//! After every ledger insertion the detector looks for two completed
//! deductions that read the same balance. Such a pair means the later reader
//! computed from a value that did not include the earlier one's write.
//!
//! # Selection rule
//!
//! Traces are scanned in ledger insertion order. The first `read_value` to
//! gain a second member wins, and its first two members form the pair. The
//! member with the smaller `read_time` becomes A; on a tie the one inserted
//! first is A. Only one pair is reported per pass.
//!
//! The detector never fails: no qualifying pair simply means no snapshot.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{ConflictSnapshot, MinorUnits, RequestTrace};

/// Find the first pair of traces that read the same balance
///
/// # Returns
///
/// `Some((a, b))` with `a` the earlier reader, or `None` if every trace
/// read a distinct value.
pub fn find_conflict_pair(traces: &[RequestTrace]) -> Option<(RequestTrace, RequestTrace)> {
    let mut first_seen: HashMap<MinorUnits, usize> = HashMap::with_capacity(traces.len());

    for (index, trace) in traces.iter().enumerate() {
        match first_seen.entry(trace.read_value) {
            Entry::Occupied(entry) => {
                let first = &traces[*entry.get()];
                return Some(order_by_read_time(first, trace));
            }
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
        }
    }

    None
}

fn order_by_read_time(first: &RequestTrace, second: &RequestTrace) -> (RequestTrace, RequestTrace) {
    if second.read_time < first.read_time {
        (second.clone(), first.clone())
    } else {
        (first.clone(), second.clone())
    }
}

/// Single-slot store for the most recently captured conflict
///
/// A new capture replaces the previous one.
#[derive(Debug, Default)]
pub struct ConflictSlot {
    latest: RwLock<Option<ConflictSnapshot>>,
}

impl ConflictSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, snapshot: ConflictSnapshot) {
        *self.latest.write() = Some(snapshot);
    }

    pub fn get(&self) -> Option<ConflictSnapshot> {
        self.latest.read().clone()
    }

    pub fn clear(&self) {
        *self.latest.write() = None;
    }
}
