//! Open addressing hash map keyed by 64-bit hashes.

use crate::memory::assert_in_bounds;

/// The initial number of slots.
pub const DEFAULT_NUM_SLOTS: usize = 1 << 12;
/// Grow the table before an insert would exceed this load factor.
const LOAD_FACTOR_LIMIT: f64 = 0.8;
/// Multiplier for the number of slots when growing.
const GROWTH_FACTOR: usize = 2;

/// Single-round FNV-1a over one 64-bit word, using the 32-bit FNV prime.
pub fn hash_fnv1a(value: u64) -> u64 {
    (0x811C_9DC5 ^ value).wrapping_mul(0x0100_0193)
}

/// A map from 64-bit keys to `Copy` values, using linear-probe open
/// addressing.
///
/// Keys are expected to be pre-hashed (see [`hash_fnv1a`](fn.hash_fnv1a.html));
/// the table does no hashing of its own beyond reducing the key modulo the
/// slot count. Lookups probe at most `capacity` slots and do not stop at
/// empty ones, so removals need no tombstones.
#[derive(Debug, Clone)]
pub struct OpenAddressingMap<V: Copy> {
    slots: Vec<Option<(u64, V)>>,
    stored: usize,
}

impl<V: Copy> OpenAddressingMap<V> {
    pub fn new() -> OpenAddressingMap<V> {
        OpenAddressingMap::with_capacity(DEFAULT_NUM_SLOTS)
    }
    pub fn with_capacity(num_slots: usize) -> OpenAddressingMap<V> {
        requires!(num_slots > 0);
        OpenAddressingMap {
            slots: vec![None; num_slots],
            stored: 0,
        }
    }
    pub fn len(&self) -> usize {
        self.stored
    }
    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    /// Insert a key-value pair. An existing value under the same key is
    /// overwritten, even when removals have left empty slots between the
    /// key's home slot and its entry.
    pub fn insert(&mut self, key: u64, value: V) {
        if self.stored as f64 / self.capacity() as f64 >= LOAD_FACTOR_LIMIT {
            self.grow();
        }
        let mut offset = (key % self.capacity() as u64) as usize;
        let mut free_slot = None;
        for _attempt in 0..self.capacity() {
            match self.slots[offset] {
                Some((stored_key, _value)) if stored_key == key => {
                    self.slots[offset] = Some((key, value));
                    return;
                }
                None if free_slot.is_none() => free_slot = Some(offset),
                _ => (),
            }
            offset = (offset + 1) % self.capacity();
        }
        // The load factor limit guarantees an empty slot.
        let free_slot = match free_slot {
            Some(offset) => offset,
            None => crate::output::unreachable(),
        };
        self.slots[free_slot] = Some((key, value));
        self.stored += 1;
    }
    pub fn get(&self, key: u64) -> Option<V> {
        self.find_slot(key).map(|offset| {
            assert_in_bounds(0..self.capacity(), offset);
            let (_key, value) = self.slots[offset].unwrap();
            value
        })
    }
    /// Remove a key, returning its value. The slot is freed immediately.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        self.find_slot(key).map(|offset| {
            let (_key, value) = self.slots[offset].take().unwrap();
            self.stored -= 1;
            value
        })
    }
    /// Drop all entries but keep the allocated slots.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.stored = 0;
    }
    /// Probe for the slot holding this key, visiting at most `capacity`
    /// slots. Empty slots do not end the probe, otherwise entries that
    /// were displaced past a removed slot would become unreachable.
    fn find_slot(&self, key: u64) -> Option<usize> {
        let mut offset = (key % self.capacity() as u64) as usize;
        for _attempt in 0..self.capacity() {
            if let Some((stored_key, _value)) = self.slots[offset] {
                if stored_key == key {
                    return Some(offset);
                }
            }
            offset = (offset + 1) % self.capacity();
        }
        None
    }
    fn grow(&mut self) {
        let new_capacity = self.capacity() * GROWTH_FACTOR;
        let old_slots = std::mem::replace(&mut self.slots, vec![None; new_capacity]);
        self.stored = 0;
        for slot in old_slots {
            if let Some((key, value)) = slot {
                self.insert(key, value);
            }
        }
    }
}

impl<V: Copy> Default for OpenAddressingMap<V> {
    fn default() -> OpenAddressingMap<V> {
        OpenAddressingMap::new()
    }
}
