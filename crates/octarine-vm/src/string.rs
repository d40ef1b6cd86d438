// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Immutable UTF-8 strings on the exchange heap.
//!
//! The bytes are stored with a trailing NUL so the buffer can be handed to
//! C-style consumers unchanged. Text containing a NUL of its own is refused,
//! so the terminator is always the first NUL. `size` counts that terminator,
//! `num_codepoints` does not.

use core::ffi::CStr;
use core::hash::Hasher;

use rustc_hash::FxHasher;

use crate::error::{AllocError, RuntimeError};
use crate::ownership::OwnedArray;
use crate::protocol::{EqComparable, Hashable, Object, Type, Typed};
use crate::runtime::Context;

/// An immutable UTF-8 string.
pub struct OctString {
    num_codepoints: usize,
    /// UTF-8 bytes followed by one NUL.
    data: OwnedArray<u8>,
}

impl OctString {
    /// Copy `text` into a new string.
    ///
    /// # Errors
    /// Returns `RuntimeError::InteriorNul` if `text` contains a NUL byte and
    /// `RuntimeError::Alloc` if the byte array cannot be allocated.
    pub fn create(ctx: &Context, text: &str) -> Result<Self, RuntimeError> {
        if let Some(position) = text.bytes().position(|byte| byte == 0) {
            return Err(RuntimeError::InteriorNul { position });
        }
        Ok(Self::copy(ctx, text.as_bytes(), text.chars().count())?)
    }

    /// Copy `bytes`, which hold no NUL, and append the terminator.
    fn copy(ctx: &Context, bytes: &[u8], num_codepoints: usize) -> Result<Self, AllocError> {
        let data = ctx
            .heap()
            .allocate_array_with(ctx, bytes.len() + 1, |i| bytes.get(i).copied().unwrap_or(0))?;
        Ok(Self {
            num_codepoints,
            data,
        })
    }

    /// Copy a NUL-terminated C string into a new string.
    ///
    /// # Errors
    /// Returns `RuntimeError::InvalidUtf8` if the bytes are not UTF-8 and
    /// `RuntimeError::Alloc` if the byte array cannot be allocated.
    pub fn create_from_c_str(ctx: &Context, text: &CStr) -> Result<Self, RuntimeError> {
        let text = text.to_str().map_err(|e| RuntimeError::InvalidUtf8 {
            valid_up_to: e.valid_up_to(),
        })?;
        Self::create(ctx, text)
    }

    /// Number of Unicode scalar values.
    #[must_use]
    pub const fn num_codepoints(&self) -> usize {
        self.num_codepoints
    }

    /// Number of bytes, terminator included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The bytes including the trailing NUL, the only NUL among them.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.data
    }

    /// The string as a C string.
    #[must_use]
    pub fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_until_nul(&self.data).unwrap_or_default()
    }

    /// The bytes without the trailing NUL.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.data.len() - 1]
    }

    /// The string contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // SAFETY: the bytes were copied from a `&str`.
        unsafe { core::str::from_utf8_unchecked(self.as_bytes()) }
    }

    /// Copy this string into a new allocation.
    ///
    /// # Errors
    /// Returns `AllocError` if the byte array cannot be allocated.
    pub fn duplicate(&self, ctx: &Context) -> Result<Self, AllocError> {
        Self::copy(ctx, self.as_bytes(), self.num_codepoints)
    }
}

impl Typed for OctString {
    const TYPE: Type = Type::of::<Self>("octarine.String");
}

impl Object for OctString {}

impl EqComparable for OctString {
    fn equals(&self, _ctx: &Context, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Hashable for OctString {
    fn hash(&self, _ctx: &Context) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(self.as_bytes());
        hasher.finish()
    }
}

impl core::fmt::Display for OctString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Debug for OctString {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self.as_str(), f)
    }
}
