// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Open-addressed hashtable keyed through the `HashtableKey` protocol.
//!
//! Slots live in one exchange-heap array. A slot is `Nothing` when free;
//! there are no tombstones. Collisions are resolved by linear probing from
//! `hash % capacity`, and removal shifts the rest of the cluster back so
//! every key stays reachable from its home slot.
//!
//! ```text
//!  capacity 8, keys A,B share home 2, C has home 3
//!
//!  [ _ ][ _ ][ A ][ B ][ C ][ _ ][ _ ][ _ ]
//!              ▲    └ displaced from 2
//!              └ home of A and B
//!
//!  remove A:  B moves back to 2, C moves back to 3
//!  [ _ ][ _ ][ B ][ C ][ _ ][ _ ][ _ ][ _ ]
//! ```
//!
//! The table doubles once an insert would push the load above 3/4, so a
//! scan always reaches a free slot. Key hashing and equality are dispatched
//! through a `HashtableKey` capability table held by the table itself. It is
//! the key type's own table for [`Hashtable::new`], or one assembled at
//! runtime for [`Hashtable::with_key_vtable`]; the table knows no key types.

#[cfg(test)]
mod hashtable_test;

use crate::error::{AllocError, RuntimeError};
use crate::maybe::Maybe;
use crate::ownership::OwnedArray;
use crate::protocol::{
    BorrowedKey, HashtableKey, HashtableKeyVTable, Object, Typed, check_type, hashtable_key_vtable,
};
use crate::runtime::Context;

/// Capacity used when none is given.
pub const DEFAULT_HASHTABLE_CAPACITY: usize = 100;

/// Maximum load factor, as numerator over denominator.
pub const MAX_LOAD_NUMERATOR: usize = 3;
/// See [`MAX_LOAD_NUMERATOR`].
pub const MAX_LOAD_DENOMINATOR: usize = 4;

/// An occupied slot.
#[derive(Debug)]
struct HashtableEntry<K, V> {
    hash: u64,
    key: K,
    value: V,
}

/// Where a key is, or where it would go.
enum Slot {
    Found(usize),
    Vacant(usize),
}

/// Associative array from `K` to `V`.
pub struct Hashtable<K: Typed, V> {
    slots: OwnedArray<Maybe<HashtableEntry<K, V>>>,
    len: usize,
    key_vtable: &'static HashtableKeyVTable,
}

fn home_slot(hash: u64, capacity: usize) -> usize {
    // The remainder is below `capacity`, so it fits a usize.
    (hash % capacity as u64) as usize
}

/// Distance from slot `from` forward to slot `to`, wrapping.
const fn displacement(from: usize, to: usize, capacity: usize) -> usize {
    (to + capacity - from) % capacity
}

impl<K: HashtableKey, V> Hashtable<K, V> {
    /// Create a table with `capacity` free slots, keyed through `K`'s own
    /// capability table.
    ///
    /// # Errors
    /// Returns `AllocError` if the slot array cannot be allocated.
    pub fn new(ctx: &Context, capacity: usize) -> Result<Self, AllocError> {
        Self::allocate(ctx, capacity, hashtable_key_vtable::<K>())
    }

    /// Create a table with [`DEFAULT_HASHTABLE_CAPACITY`] slots.
    ///
    /// # Errors
    /// Returns `AllocError` if the slot array cannot be allocated.
    pub fn with_default_capacity(ctx: &Context) -> Result<Self, AllocError> {
        Self::new(ctx, DEFAULT_HASHTABLE_CAPACITY)
    }
}

impl<K: Typed, V> Hashtable<K, V> {
    /// Create a table with `capacity` free slots whose keys are hashed and
    /// compared through `key_vtable`, typically one assembled with
    /// [`HashtableKeyVTable::compose`].
    ///
    /// # Errors
    /// Returns `RuntimeError::Protocol` if `key_vtable` was declared for a
    /// type other than `K`, or `RuntimeError::Alloc` if the slot array
    /// cannot be allocated.
    pub fn with_key_vtable(
        ctx: &Context,
        capacity: usize,
        key_vtable: &'static HashtableKeyVTable,
    ) -> Result<Self, RuntimeError> {
        check_type::<K>(key_vtable.type_of())?;
        Ok(Self::allocate(ctx, capacity, key_vtable)?)
    }

    fn allocate(
        ctx: &Context,
        capacity: usize,
        key_vtable: &'static HashtableKeyVTable,
    ) -> Result<Self, AllocError> {
        let slots = ctx
            .heap()
            .allocate_array_with(ctx, capacity, |_| Maybe::Nothing)?;
        Ok(Self {
            slots,
            len: 0,
            key_vtable,
        })
    }

    /// Capability table keys are dispatched through.
    #[must_use]
    pub fn key_vtable(&self) -> &'static HashtableKeyVTable {
        self.key_vtable
    }

    fn borrow_key<'k>(&self, key: &'k K) -> BorrowedKey<'k> {
        // SAFETY: the table was checked against `K` at construction.
        unsafe { BorrowedKey::with_checked_vtable(key, self.key_vtable) }
    }

    fn key_hash(&self, ctx: &Context, key: &K) -> u64 {
        self.borrow_key(key).hash(ctx)
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the table holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn seek(&self, ctx: &Context, hash: u64, key: &K) -> Slot {
        let capacity = self.capacity();
        let wanted = self.borrow_key(key);
        let mut index = home_slot(hash, capacity);
        // Load stays below 1, so the run ends at a free slot.
        loop {
            match &self.slots[index] {
                Maybe::Nothing => return Slot::Vacant(index),
                Maybe::Something(entry) => {
                    if entry.hash == hash && self.borrow_key(&entry.key).equals(ctx, &wanted) {
                        return Slot::Found(index);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    fn find(&self, ctx: &Context, key: &K) -> Maybe<usize> {
        if self.len == 0 {
            return Maybe::Nothing;
        }
        match self.seek(ctx, self.key_hash(ctx, key), key) {
            Slot::Found(index) => Maybe::Something(index),
            Slot::Vacant(_) => Maybe::Nothing,
        }
    }

    const fn fits(len: usize, capacity: usize) -> bool {
        len * MAX_LOAD_DENOMINATOR <= capacity * MAX_LOAD_NUMERATOR
    }

    /// Grow the table so that `additional` new keys can be inserted without
    /// allocating.
    ///
    /// # Errors
    /// Returns `AllocError` if the slot array cannot be grown. The table is
    /// unchanged then.
    pub fn reserve(&mut self, ctx: &Context, additional: usize) -> Result<(), AllocError> {
        let wanted = self.len + additional;
        if Self::fits(wanted, self.capacity()) {
            return Ok(());
        }
        let mut capacity = (self.capacity() * 2).max(1);
        while !Self::fits(wanted, capacity) {
            capacity *= 2;
        }
        let mut slots = ctx
            .heap()
            .allocate_array_with(ctx, capacity, |_| Maybe::Nothing)?;

        for slot in self.slots.iter_mut() {
            if let Maybe::Something(entry) = slot.take() {
                let mut index = home_slot(entry.hash, capacity);
                while slots[index].has_value() {
                    index = (index + 1) % capacity;
                }
                slots[index] = Maybe::Something(entry);
            }
        }

        tracing::trace!(from = self.capacity(), to = capacity, len = self.len, "hashtable grow");
        self.slots = slots;
        Ok(())
    }

    /// Insert `value` under `key`.
    ///
    /// Returns the previous value if the key was present. The stored key is
    /// kept in that case and `key` is dropped.
    ///
    /// # Errors
    /// Returns `AllocError` if the table had to grow and could not. The table
    /// is unchanged then, and `key` and `value` are dropped. Call
    /// [`Hashtable::reserve`] first to keep them on failure.
    pub fn put(&mut self, ctx: &Context, key: K, value: V) -> Result<Maybe<V>, AllocError> {
        let hash = self.key_hash(ctx, &key);

        if self.len > 0 {
            if let Slot::Found(index) = self.seek(ctx, hash, &key) {
                if let Maybe::Something(entry) = &mut self.slots[index] {
                    return Ok(Maybe::Something(core::mem::replace(&mut entry.value, value)));
                }
            }
        }

        self.reserve(ctx, 1)?;
        let index = match self.seek(ctx, hash, &key) {
            Slot::Found(index) | Slot::Vacant(index) => index,
        };
        self.slots[index] = Maybe::Something(HashtableEntry { hash, key, value });
        self.len += 1;
        Ok(Maybe::Nothing)
    }

    /// Look up `key` without removing it.
    #[must_use]
    pub fn get(&self, ctx: &Context, key: &K) -> Maybe<&V> {
        match self.find(ctx, key) {
            Maybe::Something(index) => self.slots[index].as_ref().map(|entry| &entry.value),
            Maybe::Nothing => Maybe::Nothing,
        }
    }

    /// Look up `key` for modification.
    #[must_use]
    pub fn get_mut(&mut self, ctx: &Context, key: &K) -> Maybe<&mut V> {
        match self.find(ctx, key) {
            Maybe::Something(index) => self.slots[index].as_mut().map(|entry| &mut entry.value),
            Maybe::Nothing => Maybe::Nothing,
        }
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, ctx: &Context, key: &K) -> bool {
        self.find(ctx, key).has_value()
    }

    /// Remove `key`, returning the stored key and its value.
    pub fn remove_entry(&mut self, ctx: &Context, key: &K) -> Maybe<(K, V)> {
        let Maybe::Something(index) = self.find(ctx, key) else {
            return Maybe::Nothing;
        };
        let removed = self.slots[index].take();
        self.len -= 1;

        // Shift the rest of the run back over the hole.
        let capacity = self.capacity();
        let mut hole = index;
        let mut next = (index + 1) % capacity;
        while let Maybe::Something(entry) = &self.slots[next] {
            let home = home_slot(entry.hash, capacity);
            if displacement(home, next, capacity) >= displacement(hole, next, capacity) {
                self.slots[hole] = self.slots[next].take();
                hole = next;
            }
            next = (next + 1) % capacity;
        }

        removed.map(|entry| (entry.key, entry.value))
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, ctx: &Context, key: &K) -> Maybe<V> {
        self.remove_entry(ctx, key).map(|(_, value)| value)
    }

    /// Iterate over all entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Maybe::Something(entry) => Some((&entry.key, &entry.value)),
            Maybe::Nothing => None,
        })
    }

    /// Iterate over all entries with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.slots.iter_mut().filter_map(|slot| match slot {
            Maybe::Something(entry) => Some((&entry.key, &mut entry.value)),
            Maybe::Nothing => None,
        })
    }

    /// Remove every entry, returning them in slot order.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::with_capacity(self.len);
        for slot in self.slots.iter_mut() {
            if let Maybe::Something(entry) = slot.take() {
                entries.push((entry.key, entry.value));
            }
        }
        self.len = 0;
        entries
    }
}

impl<K: Typed + Object, V: Object> Hashtable<K, V> {
    /// Run the `Object.dtor` hook of every stored key and value, then drop
    /// them and free the slot array.
    pub fn destroy(mut self, ctx: &Context) {
        for (mut key, mut value) in self.drain() {
            key.dtor(ctx);
            value.dtor(ctx);
        }
    }
}

impl<K: Typed + core::fmt::Debug, V: core::fmt::Debug> core::fmt::Debug for Hashtable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
