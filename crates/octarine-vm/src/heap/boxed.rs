// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Box headers and the header/payload addressing law.
//!
//! Every box is a fixed-size header immediately followed by its payload:
//!
//! ```text
//! block (header address)          payload address = block + HEADER_SIZE
//!   │                               │
//!   ▼                               ▼
//!   ┌───────────────────────────────┬──────────────────────────────┐
//!   │ header (HEADER_SIZE bytes)    │ payload                      │
//!   └───────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Both header flavors are exactly `HEADER_SIZE` bytes and blocks are aligned
//! to `BOX_ALIGN`, so the law holds for every payload type whose alignment
//! does not exceed `BOX_ALIGN`. Heaps enforce that bound at compile time.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::AllocError;
use crate::platform::SystemAllocator;
use crate::protocol::ObjectVTable;
use crate::runtime::ContextId;

/// Size of every box header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Alignment of every box block, and the maximum payload alignment.
pub const BOX_ALIGN: usize = 16;

/// Header of an exchange-heap box.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(16))]
pub struct OwnedBoxHeader {
    /// Context that performed the allocation.
    pub context: ContextId,
    /// Size of the whole block, header included.
    pub size: usize,
}

/// Header of a managed-heap box.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(16))]
pub struct ManagedBoxHeader {
    /// Mark flag for a future mark-sweep collector.
    pub marked: bool,
    /// Object capability table of the payload.
    pub vtable: &'static ObjectVTable,
}

const _: () = assert!(core::mem::size_of::<OwnedBoxHeader>() == HEADER_SIZE);
const _: () = assert!(core::mem::size_of::<ManagedBoxHeader>() == HEADER_SIZE);
const _: () = assert!(core::mem::align_of::<OwnedBoxHeader>() == BOX_ALIGN);
const _: () = assert!(core::mem::align_of::<ManagedBoxHeader>() == BOX_ALIGN);

/// Layout of a block holding a header followed by `payload_size` bytes.
pub(crate) fn block_layout(payload_size: usize) -> Result<Layout, AllocError> {
    let size = HEADER_SIZE
        .checked_add(payload_size)
        .ok_or(AllocError::InvalidLayout { size: payload_size })?;
    Layout::from_size_align(size, BOX_ALIGN).map_err(|_| AllocError::InvalidLayout {
        size: payload_size,
    })
}

/// Allocate a block, write `header` at its start and return the payload address.
pub(crate) fn allocate_block<H>(
    backing: &dyn SystemAllocator,
    header: H,
    payload_size: usize,
) -> Result<NonNull<u8>, AllocError> {
    const { assert!(core::mem::size_of::<H>() == HEADER_SIZE) };

    let layout = block_layout(payload_size)?;
    let block = backing.alloc(layout).ok_or(AllocError::OutOfMemory {
        size: layout.size(),
    })?;

    // SAFETY: the block is fresh, BOX_ALIGN-aligned and at least HEADER_SIZE long.
    unsafe {
        block.cast::<H>().write(header);
        Ok(block.add(HEADER_SIZE))
    }
}

/// Recover the header address from a payload address.
///
/// # Safety
/// `payload` must be the exact address returned by `allocate_block` for a
/// header of type `H`, never an interior pointer.
#[inline]
pub(crate) unsafe fn header_of<H>(payload: NonNull<u8>) -> NonNull<H> {
    // SAFETY: the caller guarantees the header sits HEADER_SIZE bytes before.
    unsafe { payload.sub(HEADER_SIZE).cast::<H>() }
}
