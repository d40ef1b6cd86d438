// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Namespaces and their bindings.
//!
//! A namespace maps binding names to protocol objects. Each binding slot
//! follows one of two paths:
//!
//! ```text
//!   Absent ──bind_owned──► Owned ──(dtor, free)──► Absent
//!   Absent ──bind_constant──► Constant ──────────► Absent
//! ```
//!
//! Overwriting a binding takes the exit transition of the old binding first,
//! so an owned object's destructor has finished before the new binding can
//! be looked up.

use crate::error::{AllocError, RuntimeError};
use crate::hashtable::Hashtable;
use crate::maybe::Maybe;
use crate::protocol::{BorrowedObject, ConstantObject, Object, OwnedObject, Type, Typed};
use crate::runtime::Context;
use crate::string::OctString;

/// Identifier of a namespace within its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(u32);

impl NamespaceId {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// State of a binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Nothing is bound.
    Absent,
    /// The namespace owns the bound object.
    Owned,
    /// The namespace refers to immutable static data.
    Constant,
}

/// Value of a binding slot.
#[derive(Debug)]
pub enum Binding {
    /// Nothing is bound.
    Absent,
    /// An object the namespace must destroy.
    Owned(OwnedObject),
    /// Static data the namespace never destroys.
    Constant(ConstantObject),
}

impl Binding {
    /// State of this binding.
    #[must_use]
    pub const fn kind(&self) -> BindingKind {
        match self {
            Self::Absent => BindingKind::Absent,
            Self::Owned(_) => BindingKind::Owned,
            Self::Constant(_) => BindingKind::Constant,
        }
    }

    /// Borrow the bound object.
    #[must_use]
    pub fn borrow(&self) -> Maybe<BorrowedObject<'_>> {
        match self {
            Self::Absent => Maybe::Nothing,
            Self::Owned(object) => Maybe::Something(object.borrow()),
            Self::Constant(constant) => Maybe::Something(constant.borrow()),
        }
    }

    /// Leave the slot: run an owned object's destructor and free it.
    pub fn release(self, ctx: &Context) {
        match self {
            Self::Absent => {}
            Self::Owned(object) => object.release(ctx),
            Self::Constant(constant) => constant.release(ctx),
        }
    }
}

impl Typed for Binding {
    const TYPE: Type = Type::of::<Self>("octarine.Binding");
}

impl Object for Binding {
    fn dtor(&mut self, ctx: &Context) {
        core::mem::replace(self, Self::Absent).release(ctx);
    }

    fn gc_mark(&self, ctx: &Context) {
        if let Maybe::Something(object) = self.borrow() {
            object.gc_mark(ctx);
        }
    }
}

/// A named table of bindings.
pub struct Namespace {
    id: NamespaceId,
    name: OctString,
    bindings: Hashtable<OctString, Binding>,
}

impl Namespace {
    /// Create an empty namespace.
    ///
    /// # Errors
    /// Returns `RuntimeError::InteriorNul` if `name` contains a NUL byte and
    /// `RuntimeError::Alloc` if the name or the binding table cannot be
    /// allocated.
    pub fn new(ctx: &Context, id: NamespaceId, name: &str, capacity: usize) -> Result<Self, RuntimeError> {
        Ok(Self {
            id,
            name: OctString::create(ctx, name)?,
            bindings: Hashtable::new(ctx, capacity)?,
        })
    }

    /// Identifier of this namespace.
    #[must_use]
    pub const fn id(&self) -> NamespaceId {
        self.id
    }

    /// Name of this namespace.
    #[must_use]
    pub const fn name(&self) -> &OctString {
        &self.name
    }

    /// Number of bindings.
    #[must_use]
    pub const fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Install `binding` under `name`, releasing whatever was bound before.
    ///
    /// Binding `Binding::Absent` just releases the previous binding.
    ///
    /// # Errors
    /// Returns `AllocError` if the binding table had to grow and could not.
    /// The previous binding stays in place then, and `binding` is released
    /// with its `dtor` run.
    pub fn bind(&mut self, ctx: &Context, name: OctString, binding: Binding) -> Result<(), AllocError> {
        if matches!(binding, Binding::Absent) {
            self.unbind(ctx, &name);
            return Ok(());
        }
        if !self.bindings.contains_key(ctx, &name) {
            if let Err(err) = self.bindings.reserve(ctx, 1) {
                tracing::debug!(namespace = %self.name, %name, "binding table full, releasing new binding");
                binding.release(ctx);
                return Err(err);
            }
        }
        // Room is reserved or the key is replaced in place, so this cannot grow.
        if let Maybe::Something(previous) = self.bindings.put(ctx, name, binding)? {
            previous.release(ctx);
        }
        Ok(())
    }

    /// Bind an object the namespace takes ownership of.
    ///
    /// # Errors
    /// Same as [`Namespace::bind`].
    pub fn bind_owned(&mut self, ctx: &Context, name: OctString, object: OwnedObject) -> Result<(), AllocError> {
        self.bind(ctx, name, Binding::Owned(object))
    }

    /// Bind static data the namespace never destroys.
    ///
    /// # Errors
    /// Same as [`Namespace::bind`].
    pub fn bind_constant(
        &mut self,
        ctx: &Context,
        name: OctString,
        constant: ConstantObject,
    ) -> Result<(), AllocError> {
        self.bind(ctx, name, Binding::Constant(constant))
    }

    /// The object bound under `name`.
    #[must_use]
    pub fn lookup(&self, ctx: &Context, name: &OctString) -> Maybe<BorrowedObject<'_>> {
        match self.bindings.get(ctx, name) {
            Maybe::Something(binding) => binding.borrow(),
            Maybe::Nothing => Maybe::Nothing,
        }
    }

    /// State of the slot for `name`.
    #[must_use]
    pub fn binding_kind(&self, ctx: &Context, name: &OctString) -> BindingKind {
        match self.bindings.get(ctx, name) {
            Maybe::Something(binding) => binding.kind(),
            Maybe::Nothing => BindingKind::Absent,
        }
    }

    /// Release the binding under `name`. Returns false if nothing was bound.
    pub fn unbind(&mut self, ctx: &Context, name: &OctString) -> bool {
        match self.bindings.remove(ctx, name) {
            Maybe::Something(binding) => {
                binding.release(ctx);
                true
            }
            Maybe::Nothing => false,
        }
    }

    /// Names of all bindings, in table order.
    pub fn names(&self) -> impl Iterator<Item = &OctString> {
        self.bindings.iter().map(|(name, _)| name)
    }

    /// Release every binding and free the namespace.
    pub fn destroy(mut self, ctx: &Context) {
        self.dtor(ctx);
    }
}

impl Typed for Namespace {
    const TYPE: Type = Type::of::<Self>("octarine.Namespace");
}

impl Object for Namespace {
    fn dtor(&mut self, ctx: &Context) {
        tracing::debug!(
            namespace = %self.name,
            bindings = self.bindings.len(),
            "destroying namespace"
        );
        for (_, binding) in self.bindings.drain() {
            binding.release(ctx);
        }
    }

    fn gc_mark(&self, ctx: &Context) {
        for (_, binding) in self.bindings.iter() {
            binding.gc_mark(ctx);
        }
    }
}

impl core::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Namespace")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .finish()
    }
}
