// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Capability tables for the four protocols.
//!
//! Tables for types implementing the protocol traits are promoted constants
//! built from monomorphized shims, one table per type and protocol. Tables
//! assembled from loose function pointers go through `from_functions`, which
//! rejects empty slots, and are kept for the life of the process.

use core::ptr::NonNull;

use super::{EqComparable, Hashable, HashtableKey, Object, Type, Typed};
use crate::error::ProtocolError;
use crate::runtime::Context;

/// Returns the runtime type a table was built for.
pub type TypeFn = fn() -> Type;
/// `Object.dtor` over an erased payload.
pub type DtorFn = unsafe fn(&Context, NonNull<u8>);
/// `Object.gc_mark` over an erased payload.
pub type GcMarkFn = unsafe fn(&Context, NonNull<u8>);
/// Drops an erased payload in place.
pub type DropFn = unsafe fn(NonNull<u8>);
/// `EqComparable.equals` over two erased payloads of the table's type.
pub type EqualsFn = unsafe fn(&Context, NonNull<u8>, NonNull<u8>) -> bool;
/// `Hashable.hash` over an erased payload.
pub type HashFn = unsafe fn(&Context, NonNull<u8>) -> u64;

/// Capability table of the `Object` protocol.
#[derive(Debug)]
pub struct ObjectVTable {
    pub(crate) type_of: TypeFn,
    pub(crate) dtor: DtorFn,
    pub(crate) gc_mark: GcMarkFn,
    pub(crate) drop_value: DropFn,
}

/// Capability table of the `EqComparable` protocol.
#[derive(Debug)]
pub struct EqComparableVTable {
    pub(crate) type_of: TypeFn,
    pub(crate) equals: EqualsFn,
}

/// Capability table of the `Hashable` protocol.
#[derive(Debug)]
pub struct HashableVTable {
    pub(crate) type_of: TypeFn,
    pub(crate) hash: HashFn,
}

/// Capability table of the `HashtableKey` protocol.
#[derive(Debug)]
pub struct HashtableKeyVTable {
    pub(crate) type_of: TypeFn,
    pub(crate) eq: EqComparableVTable,
    pub(crate) hash: HashableVTable,
}

fn missing(type_of: TypeFn, protocol: &'static str, function: &'static str) -> ProtocolError {
    ProtocolError::MissingFunction {
        type_name: type_of().name(),
        protocol,
        function,
    }
}

fn ensure_same_type(declared: TypeFn, other: TypeFn) -> Result<(), ProtocolError> {
    let (declared, other) = (declared(), other());
    if declared == other {
        Ok(())
    } else {
        Err(ProtocolError::TypeMismatch {
            expected: declared.name(),
            found: other.name(),
        })
    }
}

impl ObjectVTable {
    /// Type the table was built for.
    #[must_use]
    pub fn type_of(&self) -> Type {
        (self.type_of)()
    }

    /// Assemble a table from individually supplied functions.
    ///
    /// # Errors
    /// Returns `ProtocolError::MissingFunction` naming the first empty slot.
    ///
    /// # Safety
    /// Every supplied function must accept a payload of the type returned by
    /// `type_of`.
    pub unsafe fn from_functions(
        type_of: TypeFn,
        dtor: Option<DtorFn>,
        gc_mark: Option<GcMarkFn>,
        drop_value: Option<DropFn>,
    ) -> Result<&'static Self, ProtocolError> {
        let table = Self {
            type_of,
            dtor: dtor.ok_or_else(|| missing(type_of, "Object", "dtor"))?,
            gc_mark: gc_mark.ok_or_else(|| missing(type_of, "Object", "gc_mark"))?,
            drop_value: drop_value.ok_or_else(|| missing(type_of, "Object", "drop"))?,
        };
        Ok(Box::leak(Box::new(table)))
    }
}

impl EqComparableVTable {
    /// Type the table was built for.
    #[must_use]
    pub fn type_of(&self) -> Type {
        (self.type_of)()
    }

    /// Assemble a table from a loose `equals` function.
    ///
    /// # Errors
    /// Returns `ProtocolError::MissingFunction` if `equals` is empty.
    ///
    /// # Safety
    /// `equals` must accept two payloads of the type returned by `type_of`.
    pub unsafe fn from_functions(
        type_of: TypeFn,
        equals: Option<EqualsFn>,
    ) -> Result<&'static Self, ProtocolError> {
        let equals = equals.ok_or_else(|| missing(type_of, "EqComparable", "equals"))?;
        Ok(Box::leak(Box::new(Self { type_of, equals })))
    }
}

impl HashableVTable {
    /// Type the table was built for.
    #[must_use]
    pub fn type_of(&self) -> Type {
        (self.type_of)()
    }

    /// Assemble a table from a loose `hash` function.
    ///
    /// # Errors
    /// Returns `ProtocolError::MissingFunction` if `hash` is empty.
    ///
    /// # Safety
    /// `hash` must accept a payload of the type returned by `type_of`.
    pub unsafe fn from_functions(
        type_of: TypeFn,
        hash: Option<HashFn>,
    ) -> Result<&'static Self, ProtocolError> {
        let hash = hash.ok_or_else(|| missing(type_of, "Hashable", "hash"))?;
        Ok(Box::leak(Box::new(Self { type_of, hash })))
    }
}

impl HashtableKeyVTable {
    /// Type the table was built for.
    #[must_use]
    pub fn type_of(&self) -> Type {
        (self.type_of)()
    }

    /// Combine an equality and a hash table into one key table.
    ///
    /// # Errors
    /// Returns `ProtocolError::TypeMismatch` if the two tables were built for
    /// different types.
    pub fn compose(
        eq: &EqComparableVTable,
        hash: &HashableVTable,
    ) -> Result<&'static Self, ProtocolError> {
        ensure_same_type(eq.type_of, hash.type_of)?;
        Ok(Box::leak(Box::new(Self {
            type_of: eq.type_of,
            eq: EqComparableVTable {
                type_of: eq.type_of,
                equals: eq.equals,
            },
            hash: HashableVTable {
                type_of: hash.type_of,
                hash: hash.hash,
            },
        })))
    }
}

fn type_shim<T: Typed>() -> Type {
    T::TYPE
}

unsafe fn dtor_shim<T: Object>(ctx: &Context, data: NonNull<u8>) {
    // SAFETY: the table was built for `T` and the caller holds the only reference.
    unsafe { data.cast::<T>().as_mut().dtor(ctx) };
}

unsafe fn gc_mark_shim<T: Object>(ctx: &Context, data: NonNull<u8>) {
    // SAFETY: the table was built for `T`.
    unsafe { data.cast::<T>().as_ref().gc_mark(ctx) };
}

unsafe fn drop_shim<T>(data: NonNull<u8>) {
    // SAFETY: the table was built for `T` and the payload is dropped once.
    unsafe { core::ptr::drop_in_place(data.cast::<T>().as_ptr()) };
}

unsafe fn equals_shim<T: EqComparable>(ctx: &Context, a: NonNull<u8>, b: NonNull<u8>) -> bool {
    // SAFETY: both payloads are `T`, checked by the caller against `type_of`.
    unsafe { a.cast::<T>().as_ref().equals(ctx, b.cast::<T>().as_ref()) }
}

unsafe fn hash_shim<T: Hashable>(ctx: &Context, data: NonNull<u8>) -> u64 {
    // SAFETY: the table was built for `T`.
    unsafe { data.cast::<T>().as_ref().hash(ctx) }
}

/// The `Object` table of `T`.
#[must_use]
pub fn object_vtable<T: Object>() -> &'static ObjectVTable {
    &ObjectVTable {
        type_of: type_shim::<T>,
        dtor: dtor_shim::<T>,
        gc_mark: gc_mark_shim::<T>,
        drop_value: drop_shim::<T>,
    }
}

/// The `EqComparable` table of `T`.
#[must_use]
pub fn eq_comparable_vtable<T: EqComparable>() -> &'static EqComparableVTable {
    &EqComparableVTable {
        type_of: type_shim::<T>,
        equals: equals_shim::<T>,
    }
}

/// The `Hashable` table of `T`.
#[must_use]
pub fn hashable_vtable<T: Hashable>() -> &'static HashableVTable {
    &HashableVTable {
        type_of: type_shim::<T>,
        hash: hash_shim::<T>,
    }
}

/// The `HashtableKey` table of `T`.
#[must_use]
pub fn hashtable_key_vtable<T: HashtableKey>() -> &'static HashtableKeyVTable {
    &HashtableKeyVTable {
        type_of: type_shim::<T>,
        eq: EqComparableVTable {
            type_of: type_shim::<T>,
            equals: equals_shim::<T>,
        },
        hash: HashableVTable {
            type_of: type_shim::<T>,
            hash: hash_shim::<T>,
        },
    }
}
