//! # Nullifier Ledger
//!
//! Set of consumed nullifier hashes. The only mutation is
//! [`NullifierLedger::record_if_unused`], which checks and marks in one
//! critical section. [`NullifierLedger::is_consumed`] is a snapshot read
//! for early rejection; it never admits anything on its own.

use std::collections::HashSet;
use std::sync::Arc;

use agov_core::NullifierHash;
use parking_lot::Mutex;

/// Atomic check-and-mark store of consumed nullifiers.
#[derive(Debug, Clone, Default)]
pub struct NullifierLedger {
    consumed: Arc<Mutex<HashSet<NullifierHash>>>,
}

impl NullifierLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `nullifier` consumed. Returns `false`, without side effects, if
    /// it was already consumed.
    pub fn record_if_unused(&self, nullifier: &NullifierHash) -> bool {
        let fresh = self.consumed.lock().insert(nullifier.clone());
        if !fresh {
            tracing::debug!(nullifier_hash = %nullifier, "nullifier replay rejected");
        }
        fresh
    }

    /// Whether `nullifier` is consumed right now. A `false` here can be
    /// stale by the time the caller acts; only `record_if_unused` decides.
    pub fn is_consumed(&self, nullifier: &NullifierHash) -> bool {
        self.consumed.lock().contains(nullifier)
    }

    /// Number of consumed nullifiers.
    pub fn consumed_count(&self) -> usize {
        self.consumed.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn second_record_is_rejected() {
        let ledger = NullifierLedger::new();
        let n = NullifierHash::from_hex("aa".repeat(32));
        assert!(ledger.record_if_unused(&n));
        assert!(!ledger.record_if_unused(&n));
        assert_eq!(ledger.consumed_count(), 1);
    }

    #[test]
    fn is_consumed_reads_without_marking() {
        let ledger = NullifierLedger::new();
        let n = NullifierHash::from_hex("cc".repeat(32));
        assert!(!ledger.is_consumed(&n));
        assert!(!ledger.is_consumed(&n));
        assert!(ledger.record_if_unused(&n));
        assert!(ledger.is_consumed(&n));
    }

    #[test]
    fn distinct_nullifiers_are_independent() {
        let ledger = NullifierLedger::new();
        assert!(ledger.record_if_unused(&NullifierHash::from_hex("01")));
        assert!(ledger.record_if_unused(&NullifierHash::from_hex("02")));
        assert_eq!(ledger.consumed_count(), 2);
    }

    #[test]
    fn concurrent_submissions_accept_exactly_one() {
        let ledger = NullifierLedger::new();
        let n = NullifierHash::from_hex("bb".repeat(32));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                let n = n.clone();
                thread::spawn(move || ledger.record_if_unused(&n))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
    }
}
