//! Striped-lock output buckets: spec.md §4.5, grounded on `grep.c`'s
//! `grepdesc_traversal_mthread` bucket array and `lock_buffer_locks`'s
//! fixed-size lock-stripe scheme. Each directory entry's rendered output is
//! written into the bucket at its global traversal index; the coordinator
//! drains buckets strictly in index order so the parallel pipeline's output
//! is byte-identical to the serial one (spec.md §4.5's "flushes buckets in
//! deterministic order to preserve serial output semantics").

use std::sync::Mutex;

/// Number of independent lock stripes, matching `grep.c`'s
/// `initial_num_nodes` sizing rationale: few enough stripes that growth
/// doesn't thrash, many enough that workers rarely contend on the same one.
const STRIPE_COUNT: usize = 32;

/// Initial per-stripe slot count; doubled on overflow (spec.md §9's resolved
/// Open Question: "bucket growth constants = `grep.c`'s
/// `initial_num_nodes=32768` doubling").
const INITIAL_SLOTS_PER_STRIPE: usize = 32_768 / STRIPE_COUNT;

struct Stripe {
    slots: Mutex<Vec<Option<Vec<u8>>>>,
}

/// A fixed array of striped, growable slot vectors indexed by
/// `global_index % STRIPE_COUNT`.
pub struct BucketTable {
    stripes: Vec<Stripe>,
}

impl BucketTable {
    #[must_use]
    pub fn new() -> Self {
        let stripes = (0..STRIPE_COUNT)
            .map(|_| Stripe { slots: Mutex::new(Vec::with_capacity(INITIAL_SLOTS_PER_STRIPE)) })
            .collect();
        Self { stripes }
    }

    /// Stores `data` at `index`, growing the owning stripe's slot vector if
    /// needed. Overwrites are not expected (each index is claimed by
    /// exactly one worker) but are not treated as an error.
    pub fn store(&self, index: usize, data: Vec<u8>) {
        let stripe = &self.stripes[index % STRIPE_COUNT];
        let slot = index / STRIPE_COUNT;
        let mut slots = stripe.slots.lock().unwrap_or_else(|p| p.into_inner());
        if slots.len() <= slot {
            let mut new_len = slots.len().max(1);
            while new_len <= slot {
                new_len *= 2;
            }
            slots.resize_with(new_len, || None);
        }
        slots[slot] = Some(data);
    }

    /// Removes and returns the bucket at `index`, if it has been filled.
    /// Leaves a hole behind so the coordinator can tell "not yet filled"
    /// apart from "already flushed".
    #[must_use]
    pub fn take(&self, index: usize) -> Option<Vec<u8>> {
        let stripe = &self.stripes[index % STRIPE_COUNT];
        let slot = index / STRIPE_COUNT;
        let mut slots = stripe.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.get_mut(slot).and_then(Option::take)
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_take_round_trips() {
        let table = BucketTable::new();
        table.store(5, b"hello".to_vec());
        assert_eq!(table.take(5), Some(b"hello".to_vec()));
        assert_eq!(table.take(5), None);
    }

    #[test]
    fn indices_spanning_multiple_stripes_grow_independently() {
        let table = BucketTable::new();
        table.store(0, b"a".to_vec());
        table.store(STRIPE_COUNT * 3 + 1, b"b".to_vec());
        assert_eq!(table.take(0), Some(b"a".to_vec()));
        assert_eq!(table.take(STRIPE_COUNT * 3 + 1), Some(b"b".to_vec()));
    }
}
