// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Keyed thread-local storage.
//!
//! Rust's `thread_local!` is static; the runtime needs one slot per
//! `Runtime` instance. Each `ThreadLocal` takes a process-unique key and
//! stores its per-thread value in a keyed table owned by the thread. The
//! slot remembers which threads' tables it wrote to, so it can clear its
//! value on all of them.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

type Table = Mutex<HashMap<u64, Box<dyn Any + Send>>>;

thread_local! {
    static SLOTS: Arc<Table> = Arc::default();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A per-instance thread-local slot holding a `Copy` value.
///
/// Keys are never reused, so a value a thread stored under a destroyed
/// slot can never be observed through a newer one. Destroying the slot
/// clears its value on every thread that is still alive.
pub struct ThreadLocal<T: Copy + Send + 'static> {
    key: u64,
    /// Tables of the threads that stored a value here.
    threads: Mutex<Vec<Weak<Table>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Copy + Send + 'static> ThreadLocal<T> {
    /// Create a new slot, empty on every thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            threads: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    /// Read the calling thread's value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        SLOTS
            .try_with(|table| {
                lock(table)
                    .get(&self.key)
                    .and_then(|value| value.downcast_ref::<T>().copied())
            })
            .ok()
            .flatten()
    }

    /// Set (or with `None`, clear) the calling thread's value.
    pub fn set(&self, value: Option<T>) {
        // A thread that is already tearing down its locals has nothing to update.
        let _ = SLOTS.try_with(|table| match value {
            Some(v) => {
                let fresh = lock(table).insert(self.key, Box::new(v)).is_none();
                if fresh {
                    self.register(table);
                }
            }
            None => {
                lock(table).remove(&self.key);
            }
        });
    }

    /// Clear the value on every thread that set one.
    pub fn clear_all(&self) {
        let threads = core::mem::take(&mut *lock(&self.threads));
        for table in threads.iter().filter_map(Weak::upgrade) {
            lock(&table).remove(&self.key);
        }
    }

    /// Never called with the thread's table locked.
    fn register(&self, table: &Arc<Table>) {
        let mut threads = lock(&self.threads);
        threads.retain(|thread| thread.strong_count() > 0);
        if !threads.iter().any(|thread| core::ptr::eq(thread.as_ptr(), Arc::as_ptr(table))) {
            threads.push(Arc::downgrade(table));
        }
    }
}

impl<T: Copy + Send + 'static> Default for ThreadLocal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Send + 'static> Drop for ThreadLocal<T> {
    fn drop(&mut self) {
        self.clear_all();
    }
}

/// Number of values the calling thread holds across all slots.
#[cfg(test)]
pub(crate) fn bound_slots() -> usize {
    SLOTS.with(|table| lock(table).len())
}
