// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-logical-thread execution contexts.

use crate::error::AllocError;
use crate::heap::ExchangeHeap;
use crate::maybe::Maybe;
use crate::namespace::NamespaceId;
use crate::ownership::{Owned, OwnedArray};

/// Identifier of a context within its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    /// Contexts that belong to no runtime.
    pub const DETACHED: Self = Self(0);
    /// The main context every runtime creates at construction.
    pub const MAIN: Self = Self(1);
    /// The context a runtime uses while destroying its namespaces.
    pub const TEARDOWN: Self = Self(u32::MAX);

    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identifier of a runtime instance, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(pub(crate) u64);

impl RuntimeId {
    /// Owner of detached contexts.
    pub const NONE: Self = Self(0);
}

/// A logical thread's view of its runtime.
///
/// Carries the runtime it belongs to, the heap it allocates from and the
/// namespace currently in scope. Every allocation takes the context so the
/// heap can attribute it. A context is never shared between threads.
///
/// The runtime is referenced by [`RuntimeId`], not by pointer; resolve it
/// with [`Runtime::owns_context`](super::Runtime::owns_context). The
/// namespace can be replaced directly on a context obtained from
/// [`Runtime::context_mut`](super::Runtime::context_mut), or for the calling
/// thread through [`Runtime::set_current_namespace`](super::Runtime::set_current_namespace),
/// which also checks that the namespace exists.
#[derive(Debug)]
pub struct Context {
    id: ContextId,
    runtime: RuntimeId,
    heap: ExchangeHeap,
    namespace: Maybe<NamespaceId>,
}

impl Context {
    pub(crate) fn new(id: ContextId, runtime: RuntimeId, heap: ExchangeHeap) -> Self {
        Self {
            id,
            runtime,
            heap,
            namespace: Maybe::Nothing,
        }
    }

    /// A context outside any runtime, for using a heap on its own.
    #[must_use]
    pub fn detached(heap: ExchangeHeap) -> Self {
        Self::new(ContextId::DETACHED, RuntimeId::NONE, heap)
    }

    /// Identifier of this context.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// Runtime this context belongs to.
    #[must_use]
    pub const fn runtime_id(&self) -> RuntimeId {
        self.runtime
    }

    /// Exchange heap this context allocates from.
    #[must_use]
    pub const fn heap(&self) -> &ExchangeHeap {
        &self.heap
    }

    /// Namespace in scope, if one was selected.
    #[must_use]
    pub const fn namespace(&self) -> Maybe<NamespaceId> {
        self.namespace
    }

    /// Put `namespace` in scope.
    ///
    /// Lookups through the runtime fail with `RuntimeError::Missing` while it
    /// names a namespace the runtime does not have.
    pub fn set_namespace(&mut self, namespace: NamespaceId) {
        self.namespace = Maybe::Something(namespace);
    }

    /// Move `value` into a box on this context's heap.
    ///
    /// # Errors
    /// Returns `AllocError::OutOfMemory` if the system allocator has no memory.
    pub fn allocate<T>(&self, value: T) -> Result<Owned<T>, AllocError> {
        self.heap.allocate(self, value)
    }

    /// Allocate an array of `length` default elements on this context's heap.
    ///
    /// # Errors
    /// Same as [`ExchangeHeap::allocate_array_with`].
    pub fn allocate_array<T: Default>(&self, length: usize) -> Result<OwnedArray<T>, AllocError> {
        self.heap.allocate_array(self, length)
    }
}
