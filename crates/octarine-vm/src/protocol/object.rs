// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Type-erased protocol objects.
//!
//! The ownership kind of a protocol object is part of its type, exactly as
//! for plain pointers: `OwnedObject` must be released, `ConstantObject` and
//! `BorrowedObject` never free anything.

use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use super::vtable::{HashtableKeyVTable, ObjectVTable, hashtable_key_vtable, object_vtable};
use super::{HashtableKey, Object, Type, Typed};
use crate::error::ProtocolError;
use crate::heap::ExchangeHeap;
use crate::ownership::Owned;
use crate::runtime::Context;

pub(crate) fn check_type<T: Typed>(declared: Type) -> Result<(), ProtocolError> {
    if declared == T::TYPE {
        Ok(())
    } else {
        Err(ProtocolError::TypeMismatch {
            expected: T::TYPE.name(),
            found: declared.name(),
        })
    }
}

/// An exchange-heap box viewed through its `Object` table.
///
/// Must be released with [`OwnedObject::release`] so the `dtor` capability
/// runs with a context. Dropping it instead still frees the box, but skips
/// the hook.
pub struct OwnedObject {
    data: NonNull<u8>,
    vtable: &'static ObjectVTable,
    heap: ExchangeHeap,
}

// SAFETY: constructors require the payload to be `Send`.
unsafe impl Send for OwnedObject {}

impl OwnedObject {
    /// Erase an owned box into a protocol object using `T`'s own table.
    #[must_use]
    pub fn new<T: Object + Send>(owned: Owned<T>) -> Self {
        let (ptr, heap) = owned.into_raw();
        Self {
            data: ptr.cast(),
            vtable: object_vtable::<T>(),
            heap,
        }
    }

    /// Erase an owned box into a protocol object using a supplied table.
    ///
    /// # Errors
    /// Returns `ProtocolError::TypeMismatch` if the table was declared for a
    /// type other than `T`. The box is dropped in that case.
    pub fn with_vtable<T: Typed + Send>(
        owned: Owned<T>,
        vtable: &'static ObjectVTable,
    ) -> Result<Self, ProtocolError> {
        check_type::<T>(vtable.type_of())?;
        let (ptr, heap) = owned.into_raw();
        Ok(Self {
            data: ptr.cast(),
            vtable,
            heap,
        })
    }

    /// Runtime type of the payload.
    #[must_use]
    pub fn type_of(&self) -> Type {
        self.vtable.type_of()
    }

    /// The payload as a `T`, if that is its type.
    #[must_use]
    pub fn downcast_ref<T: Typed>(&self) -> Option<&T> {
        // SAFETY: the table's type was checked against the payload at construction.
        (self.type_of() == T::TYPE).then(|| unsafe { self.data.cast::<T>().as_ref() })
    }

    /// Borrow the object without transferring responsibility for it.
    #[must_use]
    pub fn borrow(&self) -> BorrowedObject<'_> {
        BorrowedObject {
            data: self.data,
            vtable: self.vtable,
            _borrow: PhantomData,
        }
    }

    /// Dispatch `Object.gc_mark`.
    pub fn gc_mark(&self, ctx: &Context) {
        self.borrow().gc_mark(ctx);
    }

    /// Run the `dtor` capability, drop the payload and free the box.
    pub fn release(self, ctx: &Context) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used again, so the heap handle is moved out once.
        let heap = unsafe { core::ptr::read(&this.heap) };
        // SAFETY: the table matches the payload, the box is live and released once.
        unsafe {
            (this.vtable.dtor)(ctx, this.data);
            (this.vtable.drop_value)(this.data);
            heap.free(this.data);
        }
    }
}

impl Drop for OwnedObject {
    fn drop(&mut self) {
        tracing::warn!(
            type_name = self.type_of().name(),
            "owned object dropped without release, dtor skipped"
        );
        // SAFETY: the table matches the payload, and drop runs once.
        unsafe {
            (self.vtable.drop_value)(self.data);
            self.heap.free(self.data);
        }
    }
}

impl core::fmt::Debug for OwnedObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwnedObject")
            .field("type", &self.type_of())
            .field("data", &self.data)
            .finish()
    }
}

/// Immutable static data viewed through its `Object` table.
///
/// Acquiring and releasing a constant are no-ops.
#[derive(Clone, Copy)]
pub struct ConstantObject {
    data: NonNull<u8>,
    vtable: &'static ObjectVTable,
}

// SAFETY: constructors require the referent to be `Sync`, and it lives forever.
unsafe impl Send for ConstantObject {}
// SAFETY: as above; the referent is only ever read.
unsafe impl Sync for ConstantObject {}

impl ConstantObject {
    /// View static data through `T`'s own table.
    #[must_use]
    pub fn new<T: Object + Sync>(value: &'static T) -> Self {
        Self {
            data: NonNull::from(value).cast(),
            vtable: object_vtable::<T>(),
        }
    }

    /// View static data through a supplied table.
    ///
    /// # Errors
    /// Returns `ProtocolError::TypeMismatch` if the table was declared for a
    /// type other than `T`.
    pub fn with_vtable<T: Typed + Sync>(
        value: &'static T,
        vtable: &'static ObjectVTable,
    ) -> Result<Self, ProtocolError> {
        check_type::<T>(vtable.type_of())?;
        Ok(Self {
            data: NonNull::from(value).cast(),
            vtable,
        })
    }

    /// Runtime type of the referent.
    #[must_use]
    pub fn type_of(&self) -> Type {
        self.vtable.type_of()
    }

    /// The referent as a `T`, if that is its type.
    #[must_use]
    pub fn downcast_ref<T: Typed>(&self) -> Option<&'static T> {
        // SAFETY: the referent is a `&'static` of the checked type.
        (self.type_of() == T::TYPE).then(|| unsafe { self.data.cast::<T>().as_ref() })
    }

    /// Borrow the constant.
    #[must_use]
    pub fn borrow(&self) -> BorrowedObject<'static> {
        BorrowedObject {
            data: self.data,
            vtable: self.vtable,
            _borrow: PhantomData,
        }
    }

    /// Release the constant. Does nothing; no destructor ever runs.
    pub fn release(self, _ctx: &Context) {}
}

impl core::fmt::Debug for ConstantObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConstantObject")
            .field("type", &self.type_of())
            .field("data", &self.data)
            .finish()
    }
}

/// A non-owning view of an object, valid for `'a`.
#[derive(Clone, Copy)]
pub struct BorrowedObject<'a> {
    data: NonNull<u8>,
    vtable: &'static ObjectVTable,
    _borrow: PhantomData<&'a ()>,
}

impl<'a> BorrowedObject<'a> {
    /// Borrow `value` through `T`'s own table.
    #[must_use]
    pub fn new<T: Object>(value: &'a T) -> Self {
        Self {
            data: NonNull::from(value).cast(),
            vtable: object_vtable::<T>(),
            _borrow: PhantomData,
        }
    }

    /// Runtime type of the referent.
    #[must_use]
    pub fn type_of(&self) -> Type {
        self.vtable.type_of()
    }

    /// The referent as a `T`, if that is its type.
    #[must_use]
    pub fn downcast_ref<T: Typed>(&self) -> Option<&'a T> {
        // SAFETY: the table's type matches the referent, which outlives 'a.
        (self.type_of() == T::TYPE).then(|| unsafe { self.data.cast::<T>().as_ref() })
    }

    /// Dispatch `Object.gc_mark`.
    pub fn gc_mark(&self, ctx: &Context) {
        // SAFETY: the table matches the referent.
        unsafe { (self.vtable.gc_mark)(ctx, self.data) };
    }
}

impl core::fmt::Debug for BorrowedObject<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BorrowedObject")
            .field("type", &self.type_of())
            .finish_non_exhaustive()
    }
}

/// A borrowed hashtable key viewed through its `HashtableKey` table.
#[derive(Clone, Copy)]
pub struct BorrowedKey<'a> {
    data: NonNull<u8>,
    vtable: &'static HashtableKeyVTable,
    _borrow: PhantomData<&'a ()>,
}

impl<'a> BorrowedKey<'a> {
    /// Borrow `key` through `K`'s own table.
    #[must_use]
    pub fn new<K: HashtableKey>(key: &'a K) -> Self {
        Self {
            data: NonNull::from(key).cast(),
            vtable: hashtable_key_vtable::<K>(),
            _borrow: PhantomData,
        }
    }

    /// Borrow `key` through a supplied table.
    ///
    /// # Errors
    /// Returns `ProtocolError::TypeMismatch` if the table was declared for a
    /// type other than `K`.
    pub fn with_vtable<K: Typed>(
        key: &'a K,
        vtable: &'static HashtableKeyVTable,
    ) -> Result<Self, ProtocolError> {
        check_type::<K>(vtable.type_of())?;
        Ok(Self {
            data: NonNull::from(key).cast(),
            vtable,
            _borrow: PhantomData,
        })
    }

    /// Borrow `key` through a table that was checked against `K` earlier.
    ///
    /// # Safety
    /// `vtable` must have been declared for `K`.
    pub(crate) unsafe fn with_checked_vtable<K: Typed>(
        key: &'a K,
        vtable: &'static HashtableKeyVTable,
    ) -> Self {
        debug_assert!(vtable.type_of() == K::TYPE);
        Self {
            data: NonNull::from(key).cast(),
            vtable,
            _borrow: PhantomData,
        }
    }

    /// Runtime type of the key.
    #[must_use]
    pub fn type_of(&self) -> Type {
        self.vtable.type_of()
    }

    /// Dispatch `Hashable.hash`.
    #[must_use]
    pub fn hash(&self, ctx: &Context) -> u64 {
        // SAFETY: the table matches the key.
        unsafe { (self.vtable.hash.hash)(ctx, self.data) }
    }

    /// Dispatch `EqComparable.equals`. Keys of different types are never equal.
    #[must_use]
    pub fn equals(&self, ctx: &Context, other: &BorrowedKey<'_>) -> bool {
        if self.type_of() != other.type_of() {
            return false;
        }
        // SAFETY: both keys are of the table's type, checked above.
        unsafe { (self.vtable.eq.equals)(ctx, self.data, other.data) }
    }
}

impl core::fmt::Debug for BorrowedKey<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BorrowedKey")
            .field("type", &self.type_of())
            .finish_non_exhaustive()
    }
}
