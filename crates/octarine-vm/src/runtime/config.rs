// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Runtime construction parameters.

use std::sync::Arc;

use crate::backend::{Backend, NullBackend};
use crate::hashtable::DEFAULT_HASHTABLE_CAPACITY;
use crate::platform::{SystemAllocator, SystemHeap};

/// Name of the namespace every runtime creates at construction.
pub const ROOT_NAMESPACE: &str = "octarine";

/// What a `Runtime` is built from.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Source of raw memory for both heaps.
    pub allocator: Arc<dyn SystemAllocator>,
    /// Code-generation backend.
    pub backend: Arc<dyn Backend>,
    /// Name of the root namespace.
    pub root_namespace: String,
    /// Initial binding-table capacity of new namespaces.
    pub namespace_capacity: usize,
}

impl RuntimeConfig {
    /// Use `allocator` for all box allocations.
    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn SystemAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Use `backend` for target initialization and the execution engine.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Name the root namespace `name`.
    #[must_use]
    pub fn with_root_namespace(mut self, name: impl Into<String>) -> Self {
        self.root_namespace = name.into();
        self
    }

    /// Start namespace binding tables at `capacity` slots.
    #[must_use]
    pub fn with_namespace_capacity(mut self, capacity: usize) -> Self {
        self.namespace_capacity = capacity;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            allocator: Arc::new(SystemHeap),
            backend: Arc::new(NullBackend),
            root_namespace: ROOT_NAMESPACE.to_owned(),
            namespace_capacity: DEFAULT_HASHTABLE_CAPACITY,
        }
    }
}

impl core::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("backend", &self.backend.name())
            .field("root_namespace", &self.root_namespace)
            .field("namespace_capacity", &self.namespace_capacity)
            .finish_non_exhaustive()
    }
}
