// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Present/absent values.
//!
//! `Maybe` is the runtime's option type and the hashtable's slot occupancy
//! marker. Unlike `Option::unwrap`, reading the value of `Nothing` is an
//! error result, never a panic and never a default.

use crate::error::MissingValue;

/// A value that is either present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Maybe<T> {
    /// No value.
    Nothing,
    /// A value.
    Something(T),
}

impl<T> Default for Maybe<T> {
    fn default() -> Self {
        Self::Nothing
    }
}

impl<T> Maybe<T> {
    /// Returns true if a value is present.
    #[must_use]
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Something(_))
    }

    /// Returns true if no value is present.
    #[must_use]
    pub const fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// The value.
    ///
    /// # Errors
    /// Returns `MissingValue` for `Nothing`.
    pub fn value(self) -> Result<T, MissingValue> {
        match self {
            Self::Something(value) => Ok(value),
            Self::Nothing => Err(MissingValue),
        }
    }

    /// Borrow the value, if any.
    #[must_use]
    pub const fn as_ref(&self) -> Maybe<&T> {
        match self {
            Self::Something(value) => Maybe::Something(value),
            Self::Nothing => Maybe::Nothing,
        }
    }

    /// Mutably borrow the value, if any.
    #[must_use]
    pub fn as_mut(&mut self) -> Maybe<&mut T> {
        match self {
            Self::Something(value) => Maybe::Something(value),
            Self::Nothing => Maybe::Nothing,
        }
    }

    /// Move the value out, leaving `Nothing`.
    #[must_use]
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Map the value, if any.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Maybe<U> {
        match self {
            Self::Something(value) => Maybe::Something(f(value)),
            Self::Nothing => Maybe::Nothing,
        }
    }

    /// Convert into a std `Option`.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Something(value),
            None => Self::Nothing,
        }
    }
}

impl<T> From<Maybe<T>> for Option<T> {
    fn from(value: Maybe<T>) -> Self {
        match value {
            Maybe::Something(value) => Some(value),
            Maybe::Nothing => None,
        }
    }
}
