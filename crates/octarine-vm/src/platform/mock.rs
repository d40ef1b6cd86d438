// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Allocation-tracking allocator for testing.
//!
//! `TrackingAllocator` forwards to the process allocator while recording
//! every block it hands out, so tests can assert that each allocation is
//! matched by exactly one deallocation at the very address it returned.

use core::alloc::Layout;
use core::ptr::NonNull;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::traits::{SystemAllocator, SystemHeap};

#[derive(Default)]
struct TrackingState {
    alloc_calls: usize,
    dealloc_calls: usize,
    failed_allocs: usize,
    invalid_frees: usize,
    /// Live block address → layout it was allocated with.
    live: HashMap<usize, Layout>,
}

/// A `SystemAllocator` that records every allocation and deallocation.
///
/// Optionally refuses allocations once a number of successful allocations
/// has been reached, to exercise out-of-memory paths. Releasing an address
/// that is not live (a double free or an interior pointer) is counted and
/// otherwise ignored, so a faulty caller shows up in the counters instead of
/// corrupting the process heap.
#[derive(Default)]
pub struct TrackingAllocator {
    inner: SystemHeap,
    limit: Option<usize>,
    state: Mutex<TrackingState>,
}

impl TrackingAllocator {
    /// Create a tracking allocator without an allocation limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracking allocator that fails every allocation after the
    /// first `limit` successful ones.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of successful `alloc` calls.
    #[must_use]
    pub fn alloc_calls(&self) -> usize {
        self.state().alloc_calls
    }

    /// Number of accepted `dealloc` calls.
    #[must_use]
    pub fn dealloc_calls(&self) -> usize {
        self.state().dealloc_calls
    }

    /// Number of allocations refused because of the limit.
    #[must_use]
    pub fn failed_allocs(&self) -> usize {
        self.state().failed_allocs
    }

    /// Number of `dealloc` calls for addresses that were not live.
    #[must_use]
    pub fn invalid_frees(&self) -> usize {
        self.state().invalid_frees
    }

    /// Number of blocks currently outstanding.
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.state().live.len()
    }

    /// Returns true if `addr` is the start of a live block.
    #[must_use]
    pub fn is_live(&self, addr: usize) -> bool {
        self.state().live.contains_key(&addr)
    }
}

impl SystemAllocator for TrackingAllocator {
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        let mut state = self.state();
        if self.limit.is_some_and(|limit| state.alloc_calls >= limit) {
            state.failed_allocs += 1;
            return None;
        }
        let block = self.inner.alloc(layout)?;
        state.alloc_calls += 1;
        state.live.insert(block.as_ptr() as usize, layout);
        Some(block)
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        let mut state = self.state();
        match state.live.remove(&(ptr.as_ptr() as usize)) {
            Some(recorded) if recorded == layout => {
                state.dealloc_calls += 1;
                // SAFETY: the block is live and was allocated with `layout`.
                unsafe { self.inner.dealloc(ptr, layout) };
            }
            Some(recorded) => {
                // Wrong layout: keep the block live and report the misuse.
                state.live.insert(ptr.as_ptr() as usize, recorded);
                state.invalid_frees += 1;
            }
            None => state.invalid_frees += 1,
        }
    }
}
