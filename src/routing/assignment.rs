//! Bounded circle-assignment cache.
//!
//! # Responsibilities
//! - Pin the first `circle count` distinct keys, one per circle, in arrival order
//! - Resolve pinned keys to their circle on every later call
//! - Spray unpinned keys uniformly once every slot is taken
//!
//! # Design Decisions
//! - Fixed slot table, one slot per circle, no eviction
//! - `assign` holds the write lock across the scan and the pin
//! - `lookup` holds the read lock and never mutates
//! - Spray choices are not recorded, so they are not sticky

use std::sync::{PoisonError, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::routing::RoutingKey;

/// Outcome of [`AssignmentCache::assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Key already occupied this slot.
    Sticky(usize),
    /// Key was pinned into a previously empty slot.
    Pinned(usize),
    /// Cache full and key unseen; a random circle, not recorded.
    Sprayed(usize),
}

impl Assignment {
    pub fn index(self) -> usize {
        match self {
            Assignment::Sticky(i) | Assignment::Pinned(i) | Assignment::Sprayed(i) => i,
        }
    }
}

#[derive(Debug)]
struct Slots {
    slots: Vec<Option<RoutingKey>>,
    rng: StdRng,
}

impl Slots {
    fn position(&self, key: &RoutingKey) -> Option<usize> {
        self.slots.iter().position(|s| s.as_ref() == Some(key))
    }
}

/// One slot per circle; each holds nothing or the key pinned to that circle.
#[derive(Debug)]
pub struct AssignmentCache {
    inner: RwLock<Slots>,
}

impl AssignmentCache {
    /// Create a cache with `capacity` slots, seeded from OS entropy.
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Create a cache with an explicit random source for the spray fallback.
    pub fn with_rng(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "assignment cache needs at least one circle");
        Self {
            inner: RwLock::new(Slots {
                slots: vec![None; capacity],
                rng,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).slots.len()
    }

    /// Number of occupied slots.
    pub fn pinned(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    /// Resolve a circle index for a write, pinning the key if a slot is free.
    pub fn assign(&self, key: &RoutingKey) -> Assignment {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(i) = guard.position(key) {
            return Assignment::Sticky(i);
        }
        if let Some(i) = guard.slots.iter().position(Option::is_none) {
            guard.slots[i] = Some(key.clone());
            return Assignment::Pinned(i);
        }
        let n = guard.slots.len();
        Assignment::Sprayed(guard.rng.gen_range(0..n))
    }

    /// Circle index the key is pinned to, if any.
    pub fn lookup(&self, key: &RoutingKey) -> Option<usize> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .position(key)
    }
}
