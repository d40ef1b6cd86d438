// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Word atomics with full barriers and the one-time initialization guard.
//!
//! All three atomics use `SeqCst` on both sides, so a thread that observes
//! a store also observes every write the storing thread made before it.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::clock::sleep_millis;

/// Load a machine word with a full barrier.
#[inline]
pub fn atomic_load_word(place: &AtomicUsize) -> usize {
    place.load(Ordering::SeqCst)
}

/// Store a machine word with a full barrier.
#[inline]
pub fn atomic_store_word(place: &AtomicUsize, value: usize) {
    place.store(value, Ordering::SeqCst);
}

/// Replace `expected` with `new` if `place` holds `expected`.
///
/// Returns true if the exchange happened.
#[inline]
pub fn atomic_compare_exchange_word(place: &AtomicUsize, expected: usize, new: usize) -> bool {
    place
        .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

const UNINIT: usize = 0;
const RUNNING: usize = 1;
const DONE: usize = 2;

/// Run-once guard for process-wide initialization.
///
/// One caller wins the compare-and-exchange from `UNINIT` to `RUNNING` and
/// runs the initializer; every other caller spins, yielding the scheduler,
/// until the state leaves `RUNNING`. The wait is bounded by the initializer,
/// never by user work.
///
/// ```text
/// UNINIT ──cas──► RUNNING ──ok──► DONE
///    ▲               │
///    └──err/panic────┘
/// ```
#[derive(Debug)]
pub struct InitOnce {
    state: AtomicUsize,
}

impl InitOnce {
    /// Create a guard that has not run yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicUsize::new(UNINIT),
        }
    }

    /// Returns true once an initializer has completed successfully.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        atomic_load_word(&self.state) == DONE
    }

    /// Run `init` unless it already completed.
    ///
    /// Returns `Ok(true)` if this call ran the initializer and `Ok(false)` if
    /// another call had already completed it.
    ///
    /// # Errors
    /// Returns the initializer's error. The guard goes back to `UNINIT`, so
    /// the next caller (including a waiting one) makes its own attempt.
    pub fn call<E>(&self, init: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        loop {
            if atomic_compare_exchange_word(&self.state, UNINIT, RUNNING) {
                let reset = ResetOnUnwind(&self.state);
                let result = init();
                core::mem::forget(reset);
                return match result {
                    Ok(()) => {
                        atomic_store_word(&self.state, DONE);
                        Ok(true)
                    }
                    Err(e) => {
                        atomic_store_word(&self.state, UNINIT);
                        Err(e)
                    }
                };
            }

            if atomic_load_word(&self.state) == DONE {
                return Ok(false);
            }

            // Someone else is initializing, wait for them to complete
            sleep_millis(0);
        }
    }
}

impl Default for InitOnce {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the guard back to `UNINIT` if the initializer panics.
struct ResetOnUnwind<'a>(&'a AtomicUsize);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        atomic_store_word(self.0, UNINIT);
    }
}
