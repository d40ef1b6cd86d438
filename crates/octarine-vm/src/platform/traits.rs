// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Platform abstraction traits.

use core::alloc::Layout;
use core::ptr::NonNull;

/// Source of raw memory for the box heaps.
///
/// This trait allows the heaps to obtain blocks without knowing whether
/// they come from the process allocator or from a test double.
pub trait SystemAllocator: Send + Sync {
    /// Allocate a block for `layout`.
    ///
    /// Returns `None` when the system cannot satisfy the request.
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block to the system.
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc` on this allocator with exactly
    /// `layout`, and must not be released twice.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process allocator (`std::alloc`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHeap;

impl SystemAllocator for SystemHeap {
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size, checked above.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller guarantees `ptr` came from `alloc` with `layout`.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
