//! Data revision tokens used to stamp cached results.

use serde::{Deserialize, Serialize};

/// Revision of the upstream data a query is made against.
///
/// A cached result answers only queries made with the snapshot it was
/// computed at. Any other snapshot forces a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Snapshot(pub u64);

impl Snapshot {
    /// Raw revision number.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Monotonic revision counter owned by whoever mutates upstream facts.
#[derive(Debug)]
pub struct RevisionCounter {
    next: u64,
}

impl Default for RevisionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionCounter {
    /// Creates a counter whose first [`RevisionCounter::bump`] yields `Snapshot(1)`.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Records a change and returns the snapshot describing it.
    pub fn bump(&mut self) -> Snapshot {
        let seq = self.next;
        self.next += 1;
        Snapshot(seq)
    }

    /// Snapshot of the latest recorded change.
    pub fn current(&self) -> Snapshot {
        Snapshot(self.next.saturating_sub(1))
    }
}
