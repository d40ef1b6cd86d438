// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Ownership-tagged pointer kinds.
//!
//! Every reference to a runtime value carries its ownership kind in its
//! type. The kind is fixed when the pointer is created and conversions are
//! explicit: borrowing from an `Owned` yields a `Borrowed` and leaves the
//! responsibility to release with the owner.
//!
//! | Kind       | Who frees                         | Copyable |
//! |------------|-----------------------------------|----------|
//! | `Owned`    | the holder, exactly once          | no       |
//! | `Borrowed` | nobody (valid for a scope)        | yes      |
//! | `Managed`  | the managed heap                  | yes      |
//! | `Constant` | nobody (static, immutable)        | yes      |

mod borrowed;
mod managed;
mod owned;

#[cfg(test)]
mod ownership_test;

pub use borrowed::{Borrowed, Constant};
pub use managed::Managed;
pub use owned::{Owned, OwnedArray};

/// The four ownership kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnershipKind {
    /// Exclusive; the holder must release it.
    Owned,
    /// Non-owning, valid for a call or scope.
    Borrowed,
    /// Lifetime governed by the managed heap.
    Managed,
    /// Immutable static data; acquire and release do nothing.
    Constant,
}

impl OwnershipKind {
    /// Returns true if releasing a pointer of this kind frees its referent.
    #[must_use]
    pub const fn release_frees(self) -> bool {
        matches!(self, Self::Owned)
    }
}

/// A pointer type tagged with an ownership kind.
pub trait Pointer {
    /// The ownership kind of every pointer of this type.
    const KIND: OwnershipKind;
}
