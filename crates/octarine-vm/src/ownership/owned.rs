// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Owned boxes on the exchange heap.

use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use super::{Borrowed, OwnershipKind, Pointer};
use crate::heap::{ExchangeHeap, OwnedBoxHeader};
use crate::protocol::Object;
use crate::runtime::Context;

/// Exclusive owner of one exchange-heap box.
///
/// Not copyable. The box is released exactly once: explicitly with
/// [`Owned::release`], which runs the `Object.dtor` hook, or implicitly when
/// the owner goes out of scope.
pub struct Owned<T> {
    ptr: NonNull<T>,
    heap: ExchangeHeap,
    _owns: PhantomData<T>,
}

// SAFETY: `Owned<T>` is a unique owner, like `Box<T>`.
unsafe impl<T: Send> Send for Owned<T> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for Owned<T> {}

impl<T> Owned<T> {
    /// Take ownership of an initialized payload.
    ///
    /// # Safety
    /// `ptr` must be a payload address returned by `heap` holding an
    /// initialized `T`, with no other owner.
    pub(crate) unsafe fn from_raw(ptr: NonNull<T>, heap: ExchangeHeap) -> Self {
        Self {
            ptr,
            heap,
            _owns: PhantomData,
        }
    }

    /// Give up ownership without freeing. The caller becomes the owner.
    pub(crate) fn into_raw(self) -> (NonNull<T>, ExchangeHeap) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the heap handle is moved out once.
        let heap = unsafe { core::ptr::read(&this.heap) };
        (this.ptr, heap)
    }

    /// Borrow the referent; responsibility stays with `self`.
    #[must_use]
    pub fn borrow(&self) -> Borrowed<'_, T> {
        Borrowed::new(&**self)
    }

    /// Payload address.
    #[must_use]
    pub fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Header of the box.
    #[must_use]
    pub fn header(&self) -> OwnedBoxHeader {
        // SAFETY: the box is live while `self` exists.
        unsafe { self.heap.header(self.ptr.cast()) }
    }

    /// Heap the box belongs to.
    #[must_use]
    pub fn heap(&self) -> &ExchangeHeap {
        &self.heap
    }

    /// Move the value out and free the box.
    #[must_use]
    pub fn into_inner(self) -> T {
        let (ptr, heap) = self.into_raw();
        // SAFETY: the payload is initialized and read exactly once before the
        // block is freed.
        unsafe {
            let value = ptr.read();
            heap.free(ptr.cast());
            value
        }
    }
}

impl<T: Object> Owned<T> {
    /// Run the `Object.dtor` hook, drop the value and free the box.
    pub fn release(mut self, ctx: &Context) {
        self.dtor(ctx);
    }
}

impl<T> Pointer for Owned<T> {
    const KIND: OwnershipKind = OwnershipKind::Owned;
}

impl<T> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the payload is initialized and uniquely owned.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for Owned<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the payload is initialized and uniquely owned.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for Owned<T> {
    fn drop(&mut self) {
        // SAFETY: the payload is initialized, dropped once, and the block
        // came from `heap`.
        unsafe {
            core::ptr::drop_in_place(self.ptr.as_ptr());
            self.heap.free(self.ptr.cast());
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Owned").field(&**self).finish()
    }
}

/// Exclusive owner of an exchange-heap box holding `len` elements.
pub struct OwnedArray<T> {
    ptr: NonNull<T>,
    len: usize,
    heap: ExchangeHeap,
    _owns: PhantomData<[T]>,
}

// SAFETY: as for `Owned<T>`.
unsafe impl<T: Send> Send for OwnedArray<T> {}
// SAFETY: as for `Owned<T>`.
unsafe impl<T: Sync> Sync for OwnedArray<T> {}

impl<T> OwnedArray<T> {
    /// Take ownership of an initialized array payload.
    ///
    /// # Safety
    /// `ptr` must be a payload address returned by `heap` holding `len`
    /// initialized elements, with no other owner.
    pub(crate) unsafe fn from_raw(ptr: NonNull<T>, len: usize, heap: ExchangeHeap) -> Self {
        Self {
            ptr,
            len,
            heap,
            _owns: PhantomData,
        }
    }

    /// Header of the box.
    #[must_use]
    pub fn header(&self) -> OwnedBoxHeader {
        // SAFETY: the box is live while `self` exists.
        unsafe { self.heap.header(self.ptr.cast()) }
    }

    /// Payload address.
    #[must_use]
    pub fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<T> Pointer for OwnedArray<T> {
    const KIND: OwnershipKind = OwnershipKind::Owned;
}

impl<T> Deref for OwnedArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: `len` elements are initialized and uniquely owned.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for OwnedArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: `len` elements are initialized and uniquely owned.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for OwnedArray<T> {
    fn drop(&mut self) {
        let elements = core::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len);
        // SAFETY: the elements are initialized and dropped once, and the
        // block came from `heap`.
        unsafe {
            core::ptr::drop_in_place(elements);
            self.heap.free(self.ptr.cast());
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for OwnedArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
