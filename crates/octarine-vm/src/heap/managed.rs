// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Managed heap for values whose lifetime belongs to a collector.
//!
//! Boxes carry a `ManagedBoxHeader` with a mark flag and the payload's
//! object capability table. Marking is supported; sweeping is not (no
//! collector yet), so boxes are only reclaimed when the heap itself is
//! dropped at runtime teardown.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::boxed::{BOX_ALIGN, ManagedBoxHeader, allocate_block, block_layout, header_of};
use crate::error::AllocError;
use crate::maybe::Maybe;
use crate::ownership::Managed;
use crate::platform::SystemAllocator;
use crate::protocol::{Object, object_vtable};
use crate::runtime::Context;

static NEXT_HEAP_ID: AtomicU64 = AtomicU64::new(1);

/// Heap of collector-owned boxes.
pub struct ManagedHeap {
    id: u64,
    backing: Arc<dyn SystemAllocator>,
    /// Payload address and block layout of every live box.
    boxes: Vec<(NonNull<u8>, Layout)>,
}

// SAFETY: only `Send` payloads are admitted, and boxes are reached through
// `&self`/`&mut self` of the heap.
unsafe impl Send for ManagedHeap {}

impl ManagedHeap {
    /// Create an empty managed heap drawing blocks from `backing`.
    #[must_use]
    pub fn new(backing: Arc<dyn SystemAllocator>) -> Self {
        Self {
            id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
            backing,
            boxes: Vec::new(),
        }
    }

    /// Number of live managed boxes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.boxes.len()
    }

    /// Move `value` into a managed box.
    ///
    /// # Errors
    /// Returns `AllocError::OutOfMemory` if the system allocator has no memory.
    pub fn allocate<T: Object + Send>(&mut self, ctx: &Context, value: T) -> Result<Managed<T>, AllocError> {
        const { assert!(core::mem::align_of::<T>() <= BOX_ALIGN, "payload over-aligned for a box") };

        let header = ManagedBoxHeader {
            marked: false,
            vtable: object_vtable::<T>(),
        };
        let layout = block_layout(core::mem::size_of::<T>())?;
        let payload = allocate_block(self.backing.as_ref(), header, core::mem::size_of::<T>())?;
        // SAFETY: the payload is fresh, large enough and aligned for `T`.
        unsafe { payload.cast::<T>().write(value) };
        self.boxes.push((payload, layout));

        tracing::trace!(context = ctx.id().as_u32(), addr = ?payload, "managed alloc");
        Ok(Managed::from_raw(payload.cast::<T>(), self.id))
    }

    /// Returns true if `handle` was allocated by this heap.
    #[must_use]
    pub fn owns<T>(&self, handle: Managed<T>) -> bool {
        handle.heap_id() == self.id
    }

    fn header_mut<T>(&mut self, handle: Managed<T>) -> Option<&mut ManagedBoxHeader> {
        if !self.owns(handle) {
            return None;
        }
        // SAFETY: boxes of this heap are never freed before the heap, and the
        // handle's address is the payload address returned by `allocate_block`.
        Some(unsafe { header_of::<ManagedBoxHeader>(handle.as_ptr().cast()).as_mut() })
    }

    /// Access the value behind a handle.
    ///
    /// Returns `Nothing` if the handle belongs to another heap.
    #[must_use]
    pub fn get<T>(&self, handle: Managed<T>) -> Maybe<&T> {
        if !self.owns(handle) {
            return Maybe::Nothing;
        }
        // SAFETY: the box is live for as long as `self` and holds a `T`.
        Maybe::Something(unsafe { handle.as_ptr().as_ref() })
    }

    /// Set the mark flag and dispatch the payload's `gc_mark` capability.
    ///
    /// Returns false if the handle belongs to another heap.
    pub fn mark<T>(&mut self, ctx: &Context, handle: Managed<T>) -> bool {
        let Some(header) = self.header_mut(handle) else {
            return false;
        };
        header.marked = true;
        let gc_mark = header.vtable.gc_mark;
        // SAFETY: the header's table was built for the payload's type.
        unsafe { gc_mark(ctx, handle.as_ptr().cast()) };
        true
    }

    /// Returns true if the box has been marked since the last `clear_marks`.
    #[must_use]
    pub fn is_marked<T>(&self, handle: Managed<T>) -> bool {
        if !self.owns(handle) {
            return false;
        }
        // SAFETY: see `header_mut`.
        let header = unsafe { header_of::<ManagedBoxHeader>(handle.as_ptr().cast()).as_ref() };
        header.marked
    }

    /// Clear the mark flag of every box.
    pub fn clear_marks(&mut self) {
        for &(payload, _) in &self.boxes {
            // SAFETY: every recorded payload is a live box of this heap.
            let header = unsafe { header_of::<ManagedBoxHeader>(payload).as_mut() };
            header.marked = false;
        }
    }
}

impl Drop for ManagedHeap {
    fn drop(&mut self) {
        for (payload, layout) in self.boxes.drain(..) {
            // SAFETY: each box is live, its header table matches its payload,
            // and the block was allocated from `backing` with `layout`.
            unsafe {
                let header = header_of::<ManagedBoxHeader>(payload);
                (header.as_ref().vtable.drop_value)(payload);
                self.backing.dealloc(header.cast::<u8>(), layout);
            }
        }
    }
}

impl core::fmt::Debug for ManagedHeap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManagedHeap")
            .field("id", &self.id)
            .field("live_count", &self.live_count())
            .finish()
    }
}
