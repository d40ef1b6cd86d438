// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Non-owning pointer kinds: `Borrowed` and `Constant`.

use core::ops::Deref;

use super::{OwnershipKind, Pointer};
use crate::runtime::Context;

/// A reference valid for `'a` that its holder never releases.
pub struct Borrowed<'a, T: ?Sized> {
    value: &'a T,
}

impl<'a, T: ?Sized> Borrowed<'a, T> {
    /// Borrow `value`.
    #[must_use]
    pub const fn new(value: &'a T) -> Self {
        Self { value }
    }

    /// The underlying reference.
    #[must_use]
    pub const fn get(self) -> &'a T {
        self.value
    }
}

impl<T: ?Sized> Clone for Borrowed<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Borrowed<'_, T> {}

impl<T: ?Sized> Pointer for Borrowed<'_, T> {
    const KIND: OwnershipKind = OwnershipKind::Borrowed;
}

impl<T: ?Sized> Deref for Borrowed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: ?Sized + core::fmt::Debug> core::fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Borrowed").field(&self.value).finish()
    }
}

/// A reference to immutable data that lives for the whole process.
///
/// Acquire and release are no-ops: nothing is counted and nothing is freed.
pub struct Constant<T: ?Sized + 'static> {
    value: &'static T,
}

impl<T: ?Sized + 'static> Constant<T> {
    /// Wrap static data.
    #[must_use]
    pub const fn new(value: &'static T) -> Self {
        Self { value }
    }

    /// The underlying reference.
    #[must_use]
    pub const fn get(self) -> &'static T {
        self.value
    }

    /// Release the constant. Does nothing.
    pub fn release(self, _ctx: &Context) {}
}

impl<T: ?Sized + 'static> Clone for Constant<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized + 'static> Copy for Constant<T> {}

impl<T: ?Sized + 'static> Pointer for Constant<T> {
    const KIND: OwnershipKind = OwnershipKind::Constant;
}

impl<T: ?Sized + 'static> Deref for Constant<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: ?Sized + core::fmt::Debug + 'static> core::fmt::Debug for Constant<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Constant").field(&self.value).finish()
    }
}
