// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The exchange heap: manual box allocation for explicitly owned values.
//!
//! Each allocation is one system-allocator call producing a block laid out
//! as `[OwnedBoxHeader][payload]`. Freeing recovers the header from the
//! payload address and returns the whole block with one deallocation call.
//! There is no caching and no pooling.
//!
//! Every allocation takes the allocating `Context`. It is recorded in the
//! box header and is the hook for per-context or generational accounting.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::boxed::{BOX_ALIGN, OwnedBoxHeader, allocate_block, block_layout, header_of};
use crate::error::AllocError;
use crate::ownership::{Owned, OwnedArray};
use crate::platform::SystemAllocator;
use crate::runtime::{Context, ContextId};

struct ExchangeInner {
    backing: Arc<dyn SystemAllocator>,
    live: AtomicUsize,
    bytes: AtomicUsize,
}

/// Handle to an exchange heap.
///
/// Cloning the handle shares the heap. Every `Owned` box keeps a handle so
/// it can return its block when released.
#[derive(Clone)]
pub struct ExchangeHeap {
    inner: Arc<ExchangeInner>,
}

impl ExchangeHeap {
    /// Create an exchange heap drawing blocks from `backing`.
    #[must_use]
    pub fn new(backing: Arc<dyn SystemAllocator>) -> Self {
        Self {
            inner: Arc::new(ExchangeInner {
                backing,
                live: AtomicUsize::new(0),
                bytes: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of boxes allocated and not yet freed.
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.inner.live.load(Ordering::Relaxed)
    }

    /// Bytes held by live boxes, headers included.
    #[must_use]
    pub fn bytes_in_use(&self) -> usize {
        self.inner.bytes.load(Ordering::Relaxed)
    }

    /// Returns true if both handles refer to the same heap.
    #[must_use]
    pub fn same_heap(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Allocate a block for `payload` bytes on behalf of `context`.
    fn allocate_raw(&self, context: ContextId, payload: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(payload.align() <= BOX_ALIGN);
        let size = block_layout(payload.size())?.size();
        let header = OwnedBoxHeader { context, size };
        let addr = allocate_block(self.inner.backing.as_ref(), header, payload.size())?;

        self.inner.live.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes.fetch_add(size, Ordering::Relaxed);
        tracing::trace!(context = context.as_u32(), size, addr = ?addr, "exchange alloc");
        Ok(addr)
    }

    /// Move `value` into a fresh box.
    ///
    /// # Errors
    /// Returns `AllocError::OutOfMemory` if the system allocator has no memory.
    pub fn allocate<T>(&self, ctx: &Context, value: T) -> Result<Owned<T>, AllocError> {
        const { assert!(core::mem::align_of::<T>() <= BOX_ALIGN, "payload over-aligned for a box") };

        let payload = self.allocate_raw(ctx.id(), Layout::new::<T>())?;
        let ptr = payload.cast::<T>();
        // SAFETY: the payload is fresh, large enough and aligned for `T`.
        unsafe {
            ptr.write(value);
            Ok(Owned::from_raw(ptr, self.clone()))
        }
    }

    /// Allocate an array box of `length` elements built by `init(index)`.
    ///
    /// # Errors
    /// Returns `AllocError::InvalidLayout` if the array size overflows and
    /// `AllocError::OutOfMemory` if the system allocator has no memory.
    pub fn allocate_array_with<T>(
        &self,
        ctx: &Context,
        length: usize,
        mut init: impl FnMut(usize) -> T,
    ) -> Result<OwnedArray<T>, AllocError> {
        const { assert!(core::mem::align_of::<T>() <= BOX_ALIGN, "element over-aligned for a box") };

        let layout = Layout::array::<T>(length).map_err(|_| AllocError::InvalidLayout {
            size: length.saturating_mul(core::mem::size_of::<T>()),
        })?;
        let payload = self.allocate_raw(ctx.id(), layout)?;
        let base = payload.cast::<T>();

        let mut filled = PartialArray {
            heap: self,
            base,
            initialized: 0,
        };
        while filled.initialized < length {
            let value = init(filled.initialized);
            // SAFETY: index is within the allocated length and not yet written.
            unsafe { base.add(filled.initialized).write(value) };
            filled.initialized += 1;
        }
        core::mem::forget(filled);

        // SAFETY: all `length` elements are initialized.
        Ok(unsafe { OwnedArray::from_raw(base, length, self.clone()) })
    }

    /// Allocate an array box of `length` default elements.
    ///
    /// # Errors
    /// Same as [`ExchangeHeap::allocate_array_with`].
    pub fn allocate_array<T: Default>(
        &self,
        ctx: &Context,
        length: usize,
    ) -> Result<OwnedArray<T>, AllocError> {
        self.allocate_array_with(ctx, length, |_| T::default())
    }

    /// Read the header of a live box.
    ///
    /// # Safety
    /// `payload` must be a payload address returned by this heap and not yet freed.
    #[must_use]
    pub unsafe fn header(&self, payload: NonNull<u8>) -> OwnedBoxHeader {
        // SAFETY: forwarded to the caller.
        unsafe { header_of::<OwnedBoxHeader>(payload).read() }
    }

    /// Return a box to the system allocator.
    ///
    /// The payload must already be dropped; only the memory is released.
    ///
    /// # Safety
    /// `payload` must be the exact payload address returned by this heap,
    /// never an interior pointer, and must not be freed twice.
    pub unsafe fn free(&self, payload: NonNull<u8>) {
        // SAFETY: forwarded to the caller.
        let header = unsafe { header_of::<OwnedBoxHeader>(payload) };
        // SAFETY: the header of a live box is initialized.
        let size = unsafe { header.read() }.size;
        // SAFETY: the block was allocated with exactly this size and BOX_ALIGN.
        let layout = unsafe { Layout::from_size_align_unchecked(size, BOX_ALIGN) };

        // SAFETY: the block is live and came from this allocator with `layout`.
        unsafe { self.inner.backing.dealloc(header.cast::<u8>(), layout) };
        self.inner.live.fetch_sub(1, Ordering::Relaxed);
        self.inner.bytes.fetch_sub(size, Ordering::Relaxed);
        tracing::trace!(size, addr = ?payload, "exchange free");
    }
}

impl core::fmt::Debug for ExchangeHeap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExchangeHeap")
            .field("live_allocations", &self.live_allocations())
            .field("bytes_in_use", &self.bytes_in_use())
            .finish()
    }
}

/// Drops the initialized prefix and frees the block if an initializer panics.
struct PartialArray<'h, T> {
    heap: &'h ExchangeHeap,
    base: NonNull<T>,
    initialized: usize,
}

impl<T> Drop for PartialArray<'_, T> {
    fn drop(&mut self) {
        let prefix = core::ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.initialized);
        // SAFETY: exactly `initialized` leading elements were written, and the
        // block came from `heap`.
        unsafe {
            core::ptr::drop_in_place(prefix);
            self.heap.free(self.base.cast());
        }
    }
}
