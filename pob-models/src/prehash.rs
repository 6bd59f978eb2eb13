// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hasher};
use std::marker::PhantomData;

/// Marker for types whose bytes are already uniformly distributed, so that
/// rehashing them into collection buckets is wasted work.
pub trait PreHashed {}

/// `Hasher` that folds the incoming bytes into a `u64` instead of running a
/// real hash function; only sound for `PreHashed` keys.
pub struct HashMapper<T: PreHashed> {
    hash: u64,
    phantom: PhantomData<T>,
}

impl<T: PreHashed> Default for HashMapper<T> {
    fn default() -> Self {
        Self {
            hash: 0,
            phantom: PhantomData,
        }
    }
}

impl<T: PreHashed> Hasher for HashMapper<T> {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.hash ^= u64::from_ne_bytes(buf);
        }
    }
}

/// `BuildHasher` for `HashMapper`
pub type BuildHashMapper<T> = BuildHasherDefault<HashMapper<T>>;

/// `HashMap` specialized for `PreHashed` keys
pub type PreHashMap<K, V> = HashMap<K, V, BuildHashMapper<K>>;

/// `HashSet` specialized for `PreHashed` keys
pub type PreHashSet<K> = HashSet<K, BuildHashMapper<K>>;

/// Pre-allocation helper for the pre-hashed collections
pub trait CapacityAllocator {
    /// Creates an empty collection with at least the given capacity
    fn with_capacity(capacity: usize) -> Self;
}

impl<K: PreHashed, V> CapacityAllocator for PreHashMap<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        PreHashMap::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K: PreHashed> CapacityAllocator for PreHashSet<K> {
    fn with_capacity(capacity: usize) -> Self {
        PreHashSet::with_capacity_and_hasher(capacity, Default::default())
    }
}
