// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Handles to managed-heap boxes.

use core::marker::PhantomData;
use core::ptr::NonNull;

use super::{OwnershipKind, Pointer};

/// Copyable handle to a box owned by a `ManagedHeap`.
///
/// The handle records which heap allocated it; the value is reached through
/// that heap, which refuses handles from any other heap.
pub struct Managed<T> {
    ptr: NonNull<T>,
    heap: u64,
    _type: PhantomData<fn() -> T>,
}

impl<T> Managed<T> {
    pub(crate) const fn from_raw(ptr: NonNull<T>, heap: u64) -> Self {
        Self {
            ptr,
            heap,
            _type: PhantomData,
        }
    }

    /// Identifier of the allocating heap.
    #[must_use]
    pub const fn heap_id(self) -> u64 {
        self.heap
    }

    /// Payload address.
    #[must_use]
    pub const fn as_ptr(self) -> NonNull<T> {
        self.ptr
    }
}

impl<T> Clone for Managed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Managed<T> {}

impl<T> PartialEq for Managed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.heap == other.heap
    }
}

impl<T> Eq for Managed<T> {}

impl<T> Pointer for Managed<T> {
    const KIND: OwnershipKind = OwnershipKind::Managed;
}

impl<T> core::fmt::Debug for Managed<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Managed({:p}@{})", self.ptr, self.heap)
    }
}
