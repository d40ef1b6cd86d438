// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Protocol objects: polymorphism through capability tables.
//!
//! A protocol object pairs a type-erased data pointer with a static table of
//! functions for one protocol. Generic algorithms such as hashtable lookup
//! call through the table and never learn the concrete type.
//!
//! ```text
//!   protocol object                   capability table ('static)
//!   ┌──────────────┐                 ┌─────────────────────┐
//!   │ data ────────┼──► payload      │ type_of ─► Type     │
//!   │ vtable ──────┼───────────────► │ fn slot             │
//!   └──────────────┘                 │ fn slot ...         │
//!                                    └─────────────────────┘
//! ```
//!
//! The four protocols are `Object` (destructor hook and collector trace),
//! `EqComparable`, `Hashable`, and `HashtableKey` (both of the previous two
//! in one table). Tables for Rust types implementing the traits below are
//! derived at compile time; hand-assembled tables are validated when they
//! are built and when they are paired with data, so dispatch never fails.

mod object;
mod vtable;


use core::any::TypeId;

pub(crate) use object::check_type;
pub use object::{BorrowedKey, BorrowedObject, ConstantObject, OwnedObject};
pub use vtable::{
    DropFn, DtorFn, EqComparableVTable, EqualsFn, GcMarkFn, HashFn, HashableVTable,
    HashtableKeyVTable, ObjectVTable, TypeFn, eq_comparable_vtable, hashable_vtable,
    hashtable_key_vtable, object_vtable,
};

use crate::runtime::Context;

/// Runtime identity of an octarine type.
///
/// Two `Type`s are equal when they describe the same Rust type; the name is
/// for diagnostics only.
#[derive(Clone, Copy)]
pub struct Type {
    name: &'static str,
    id: fn() -> TypeId,
}

impl Type {
    /// The identity of `T`, reported under `name`.
    #[must_use]
    pub const fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            name,
            id: TypeId::of::<T>,
        }
    }

    /// Diagnostic name of the type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type identity backing this `Type`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (self.id)()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for Type {}

impl core::fmt::Debug for Type {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Type({})", self.name)
    }
}

/// A type with an octarine runtime identity.
pub trait Typed: 'static {
    /// The runtime identity of `Self`.
    const TYPE: Type;
}

/// Base protocol every runtime value satisfies.
pub trait Object: Typed + Sized {
    /// Destructor hook, run with the releasing context before the value is
    /// dropped and its box returned to the heap.
    fn dtor(&mut self, _ctx: &Context) {}

    /// Trace hook for the managed-heap collector.
    fn gc_mark(&self, _ctx: &Context) {}
}

/// Equality between two values of the same type.
pub trait EqComparable: Typed {
    /// Returns true if `self` and `other` are equal.
    fn equals(&self, ctx: &Context, other: &Self) -> bool;
}

/// Stable hash of a value's current contents.
pub trait Hashable: Typed {
    /// Hash of `self`; equal values must hash equal.
    fn hash(&self, ctx: &Context) -> u64;
}

/// Values usable as hashtable keys.
pub trait HashtableKey: EqComparable + Hashable {}

impl<T: EqComparable + Hashable> HashtableKey for T {}
