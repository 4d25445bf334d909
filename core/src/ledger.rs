//! Capacity ledger: run-scoped consumption counters.
//!
//! One ledger per quota: specialties per engineer, submissions per
//! submitter-day, assignments per engineer. Unseen keys read as zero.
//! A ledger is owned by the component that enforces its quota and is
//! dropped with it at the end of the run; nothing here is persisted.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct CapacityLedger<K> {
    capacity: u32,
    consumed: HashMap<K, u32>,
}

impl<K: Eq + Hash> CapacityLedger<K> {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            consumed: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn peek(&self, key: &K) -> u32 {
        self.consumed.get(key).copied().unwrap_or(0)
    }

    pub fn consume(&mut self, key: K) {
        *self.consumed.entry(key).or_insert(0) += 1;
    }

    /// Record usage that already exists in the store. Adds to any
    /// usage already recorded for `key`.
    pub fn seed(&mut self, key: K, count: u32) {
        if count > 0 {
            *self.consumed.entry(key).or_insert(0) += count;
        }
    }

    pub fn has_room(&self, key: &K) -> bool {
        self.peek(key) < self.capacity
    }

    pub fn remaining(&self, key: &K) -> u32 {
        self.capacity.saturating_sub(self.peek(key))
    }

    pub fn reset(&mut self) {
        self.consumed.clear();
    }
}
