//! Bounded ledger of recently completed deduction timelines
//!
//! The ledger exists to give the conflict detector a window wide enough to
//! catch interleaved requests. It holds at most `capacity` traces; when an
//! insertion overflows it, the trace with the smallest `read_time` is evicted
//! (a linear scan, fine at this size).
//!
//! Detection runs inside `record`, under the ledger lock, before eviction,
//! so a trace that is about to be evicted can still complete a pair.

use parking_lot::Mutex;

use super::detector::find_conflict_pair;
use crate::types::RequestTrace;

#[derive(Debug)]
pub struct RequestTraceLedger {
    /// Traces in insertion order, unique by request ID
    traces: Mutex<Vec<RequestTrace>>,
    capacity: usize,
}

impl RequestTraceLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            traces: Mutex::new(Vec::with_capacity(capacity + 1)),
            capacity,
        }
    }

    /// Insert a trace, run detection, then evict down to capacity
    ///
    /// A trace whose request ID is already present replaces the old entry
    /// in place.
    ///
    /// # Returns
    ///
    /// The conflicting pair found by this pass, if any (earlier reader first).
    pub fn record(&self, trace: RequestTrace) -> Option<(RequestTrace, RequestTrace)> {
        let mut traces = self.traces.lock();

        match traces
            .iter_mut()
            .find(|existing| existing.request_id == trace.request_id)
        {
            Some(existing) => *existing = trace,
            None => traces.push(trace),
        }

        let pair = find_conflict_pair(&traces);

        while traces.len() > self.capacity {
            let oldest = traces
                .iter()
                .enumerate()
                .min_by_key(|(_, trace)| trace.read_time)
                .map(|(index, _)| index);
            match oldest {
                Some(index) => {
                    traces.remove(index);
                }
                None => break,
            }
        }

        pair
    }

    /// Copy of the ledgered traces in insertion order
    pub fn traces(&self) -> Vec<RequestTrace> {
        self.traces.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.traces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.traces.lock().clear();
    }
}
