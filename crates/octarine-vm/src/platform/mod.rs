// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform abstraction for the octarine substrate.
//!
//! This module provides the handful of primitives the substrate needs from
//! the host: a system allocator seam, thread-local storage, a monotonic clock
//! with sleep primitives, and word-sized atomics with full barriers. The
//! allocator is a trait so box heaps can be tested against a tracking double.


mod clock;
mod mock;
mod sync;
mod tls;
mod traits;

pub use clock::{nano_timestamp, sleep_millis, sleep_nanos};
pub use mock::TrackingAllocator;
pub use sync::{InitOnce, atomic_compare_exchange_word, atomic_load_word, atomic_store_word};
pub use tls::ThreadLocal;
#[cfg(test)]
pub(crate) use tls::bound_slots;
pub use traits::{SystemAllocator, SystemHeap};
