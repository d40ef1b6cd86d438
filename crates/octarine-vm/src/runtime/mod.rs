// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The runtime: top-level owner of heaps, namespaces and contexts.
//!
//! Construction runs in this order:
//!
//! 1. One-time backend target initialization (shared by all runtimes)
//! 2. Execution engine with its `"JITModule"` module
//! 3. Exchange and managed heaps over the configured system allocator
//! 4. The main context, bound to the constructing thread
//! 5. The root namespace (`"octarine"`), made current for the main context
//!
//! Teardown unbinds every thread that still has a context, destroys all
//! contexts, then all namespaces (releasing every binding through its
//! `Object` table), then the execution engine, and finally the managed heap. Contexts go first so no binding destructor can
//! observe a context that is about to disappear.
//!
//! A `Runtime` is `Send` but not `Sync`. Threads that share one runtime wrap
//! it in a lock; each thread attaches its own context and finds it again
//! through [`Runtime::current_context`].

mod config;
mod context;


pub use config::{ROOT_NAMESPACE, RuntimeConfig};
pub use context::{Context, ContextId, RuntimeId};

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::{self, ExecutionEngine, JIT_MODULE_NAME, Module};
use crate::error::RuntimeError;
use crate::heap::{ExchangeHeap, ManagedHeap};
use crate::maybe::Maybe;
use crate::namespace::{Namespace, NamespaceId};
use crate::ownership::{Managed, Owned};
use crate::platform::{ThreadLocal, nano_timestamp};
use crate::protocol::{BorrowedObject, ConstantObject, Object, OwnedObject};
use crate::string::OctString;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Process-level owner of the octarine substrate.
pub struct Runtime {
    id: RuntimeId,
    config: RuntimeConfig,
    exchange_heap: ExchangeHeap,
    managed_heap: ManagedHeap,
    current_context: ThreadLocal<ContextId>,
    contexts: Vec<Context>,
    /// Indexed by `NamespaceId`; namespaces live as long as the runtime.
    namespaces: Vec<Namespace>,
    engine: Maybe<Box<dyn ExecutionEngine>>,
    next_context: u32,
}

/// The context bound to the calling thread, looked up in `contexts`.
fn bound_context<'a>(
    contexts: &'a [Context],
    current: &ThreadLocal<ContextId>,
) -> Result<&'a Context, RuntimeError> {
    let id = current.get().ok_or(RuntimeError::NoCurrentContext)?;
    contexts
        .iter()
        .find(|ctx| ctx.id() == id)
        .ok_or(RuntimeError::NoCurrentContext)
}

impl Runtime {
    /// Create a runtime with the default configuration.
    ///
    /// # Errors
    /// See [`Runtime::with_config`].
    pub fn new() -> Result<Self, RuntimeError> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime, binding its main context to the calling thread.
    ///
    /// # Errors
    /// Returns `RuntimeError::Backend` if target initialization or engine
    /// creation fails, and `RuntimeError::Alloc` if the root namespace cannot
    /// be allocated.
    pub fn with_config(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let start = nano_timestamp();

        backend::initialize(config.backend.as_ref())?;
        let engine = config.backend.create_engine(Module::new(JIT_MODULE_NAME))?;

        let id = RuntimeId(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed));
        let exchange_heap = ExchangeHeap::new(Arc::clone(&config.allocator));
        let managed_heap = ManagedHeap::new(Arc::clone(&config.allocator));
        let main = Context::new(ContextId::MAIN, id, exchange_heap.clone());

        let mut runtime = Self {
            id,
            config,
            exchange_heap,
            managed_heap,
            current_context: ThreadLocal::new(),
            contexts: vec![main],
            namespaces: Vec::new(),
            engine: Maybe::Something(engine),
            next_context: ContextId::MAIN.as_u32() + 1,
        };
        runtime.current_context.set(Some(ContextId::MAIN));

        let root_name = runtime.config.root_namespace.clone();
        let root = runtime.get_or_create_namespace(&root_name)?;
        runtime.set_current_namespace(root)?;

        tracing::debug!(
            runtime = runtime.id.0,
            root_namespace = %root_name,
            elapsed_ns = nano_timestamp().saturating_sub(start),
            "runtime constructed"
        );
        Ok(runtime)
    }

    /// Identifier of this runtime.
    #[must_use]
    pub const fn id(&self) -> RuntimeId {
        self.id
    }

    /// Configuration this runtime was built from.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Exchange heap shared by all contexts.
    #[must_use]
    pub const fn exchange_heap(&self) -> &ExchangeHeap {
        &self.exchange_heap
    }

    /// Managed heap of this runtime.
    #[must_use]
    pub const fn managed_heap(&self) -> &ManagedHeap {
        &self.managed_heap
    }

    /// The execution engine, present until teardown.
    #[must_use]
    pub fn engine(&self) -> Maybe<&dyn ExecutionEngine> {
        match &self.engine {
            Maybe::Something(engine) => Maybe::Something(engine.as_ref()),
            Maybe::Nothing => Maybe::Nothing,
        }
    }

    // --- contexts ---

    /// The context bound to the calling thread.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext` if the thread has none.
    pub fn current_context(&self) -> Result<&Context, RuntimeError> {
        bound_context(&self.contexts, &self.current_context)
    }

    fn current_context_mut(&mut self) -> Result<&mut Context, RuntimeError> {
        let id = self.current_context.get().ok_or(RuntimeError::NoCurrentContext)?;
        self.contexts
            .iter_mut()
            .find(|ctx| ctx.id() == id)
            .ok_or(RuntimeError::NoCurrentContext)
    }

    /// The context with identifier `id`.
    #[must_use]
    pub fn context(&self, id: ContextId) -> Maybe<&Context> {
        self.contexts.iter().find(|ctx| ctx.id() == id).into()
    }

    /// The context with identifier `id`, for modification.
    #[must_use]
    pub fn context_mut(&mut self, id: ContextId) -> Maybe<&mut Context> {
        self.contexts.iter_mut().find(|ctx| ctx.id() == id).into()
    }

    /// Returns true if `ctx` belongs to this runtime.
    #[must_use]
    pub fn owns_context(&self, ctx: &Context) -> bool {
        ctx.runtime_id() == self.id
    }

    /// Number of live contexts.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Create a context for the calling thread and bind it.
    ///
    /// The new context starts in the root namespace.
    pub fn attach_context(&mut self) -> ContextId {
        let id = ContextId::new(self.next_context);
        self.next_context += 1;

        let mut ctx = Context::new(id, self.id, self.exchange_heap.clone());
        if let Some(root) = self.namespaces.first() {
            ctx.set_namespace(root.id());
        }
        self.contexts.push(ctx);
        self.current_context.set(Some(id));

        tracing::debug!(runtime = self.id.0, context = id.as_u32(), "context attached");
        id
    }

    /// Bind an existing context to the calling thread.
    ///
    /// # Errors
    /// Returns `RuntimeError::ContextNotFound` if no such context is live.
    pub fn switch_context(&self, id: ContextId) -> Result<(), RuntimeError> {
        if self.context(id).is_nothing() {
            return Err(RuntimeError::ContextNotFound { id: id.as_u32() });
        }
        self.current_context.set(Some(id));
        Ok(())
    }

    /// Destroy a context. Returns false if it was not live.
    ///
    /// If the calling thread was bound to it, the thread is left unbound.
    pub fn detach_context(&mut self, id: ContextId) -> bool {
        let Some(index) = self.contexts.iter().position(|ctx| ctx.id() == id) else {
            return false;
        };
        self.contexts.remove(index);
        if self.current_context.get() == Some(id) {
            self.current_context.set(None);
        }
        tracing::debug!(runtime = self.id.0, context = id.as_u32(), "context detached");
        true
    }

    // --- namespaces ---

    /// The namespace with identifier `id`.
    #[must_use]
    pub fn namespace(&self, id: NamespaceId) -> Maybe<&Namespace> {
        self.namespaces.get(id.as_u32() as usize).into()
    }

    /// The namespace named `name`.
    #[must_use]
    pub fn find_namespace(&self, name: &str) -> Maybe<&Namespace> {
        self.namespaces
            .iter()
            .find(|ns| ns.name().as_str() == name)
            .into()
    }

    /// Number of namespaces.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// The namespace named `name`, created in the calling thread's context
    /// if it does not exist yet.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext` if the thread has no context
    /// and `RuntimeError::Alloc` if the namespace cannot be allocated.
    pub fn get_or_create_namespace(&mut self, name: &str) -> Result<NamespaceId, RuntimeError> {
        if let Maybe::Something(ns) = self.find_namespace(name) {
            return Ok(ns.id());
        }

        let ctx = bound_context(&self.contexts, &self.current_context)?;
        let raw = u32::try_from(self.namespaces.len()).unwrap_or(u32::MAX);
        let id = NamespaceId::new(raw);
        let namespace = Namespace::new(ctx, id, name, self.config.namespace_capacity)?;
        self.namespaces.push(namespace);

        tracing::debug!(
            runtime = self.id.0,
            namespace = name,
            id = raw,
            "namespace created"
        );
        Ok(id)
    }

    /// The namespace in scope for the calling thread.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext` if the thread has no context
    /// and `RuntimeError::Missing` if its context has no namespace selected.
    pub fn current_namespace(&self) -> Result<&Namespace, RuntimeError> {
        let id = self.current_context()?.namespace().value()?;
        Ok(self.namespace(id).value()?)
    }

    /// Make namespace `id` current for the calling thread's context.
    ///
    /// # Errors
    /// Returns `RuntimeError::Missing` if no such namespace exists and
    /// `RuntimeError::NoCurrentContext` if the thread has no context.
    pub fn set_current_namespace(&mut self, id: NamespaceId) -> Result<(), RuntimeError> {
        self.namespace(id).value()?;
        self.current_context_mut()?.set_namespace(id);
        Ok(())
    }

    /// Split borrow: the calling thread's context and its current namespace.
    fn context_and_namespace(&mut self) -> Result<(&Context, &mut Namespace), RuntimeError> {
        let ctx = bound_context(&self.contexts, &self.current_context)?;
        let id = ctx.namespace().value()?;
        let namespace = self
            .namespaces
            .get_mut(id.as_u32() as usize)
            .ok_or(RuntimeError::NamespaceNotFound {
                name: format!("#{}", id.as_u32()),
            })?;
        Ok((ctx, namespace))
    }

    /// Bind an owned object in the current namespace.
    ///
    /// The object is released on every error path, so its `dtor` always runs.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext`, `RuntimeError::Missing` if no
    /// namespace is selected, or `RuntimeError::Alloc`.
    pub fn bind_owned(&mut self, name: &str, object: OwnedObject) -> Result<(), RuntimeError> {
        let runtime = self.id;
        let heap = self.exchange_heap.clone();
        let (ctx, namespace) = match self.context_and_namespace() {
            Ok(found) => found,
            Err(err) => {
                object.release(&Context::new(ContextId::DETACHED, runtime, heap));
                return Err(err);
            }
        };
        let name = match OctString::create(ctx, name) {
            Ok(name) => name,
            Err(err) => {
                object.release(ctx);
                return Err(err);
            }
        };
        namespace.bind_owned(ctx, name, object)?;
        Ok(())
    }

    /// Bind a constant in the current namespace.
    ///
    /// # Errors
    /// Same as [`Runtime::bind_owned`].
    pub fn bind_constant(&mut self, name: &str, constant: ConstantObject) -> Result<(), RuntimeError> {
        let (ctx, namespace) = self.context_and_namespace()?;
        let name = OctString::create(ctx, name)?;
        namespace.bind_constant(ctx, name, constant)?;
        Ok(())
    }

    /// Release the binding `name` in the current namespace.
    ///
    /// Returns false if nothing was bound.
    ///
    /// # Errors
    /// Same as [`Runtime::bind_owned`].
    pub fn unbind(&mut self, name: &str) -> Result<bool, RuntimeError> {
        let (ctx, namespace) = self.context_and_namespace()?;
        let name = OctString::create(ctx, name)?;
        Ok(namespace.unbind(ctx, &name))
    }

    /// Look up `name` in the current namespace.
    ///
    /// # Errors
    /// Same as [`Runtime::current_namespace`], plus `RuntimeError::Alloc` for
    /// the temporary key.
    pub fn lookup(&self, name: &str) -> Result<Maybe<BorrowedObject<'_>>, RuntimeError> {
        let ctx = self.current_context()?;
        let namespace = self.current_namespace()?;
        let key = OctString::create(ctx, name)?;
        Ok(namespace.lookup(ctx, &key))
    }

    // --- allocation ---

    /// Box `value` on the exchange heap in the calling thread's context.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext` or `RuntimeError::Alloc`.
    pub fn allocate<T>(&self, value: T) -> Result<Owned<T>, RuntimeError> {
        Ok(self.current_context()?.allocate(value)?)
    }

    /// Box `value` on the managed heap in the calling thread's context.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext` or `RuntimeError::Alloc`.
    pub fn allocate_managed<T: Object + Send>(&mut self, value: T) -> Result<Managed<T>, RuntimeError> {
        let ctx = bound_context(&self.contexts, &self.current_context)?;
        Ok(self.managed_heap.allocate(ctx, value)?)
    }

    /// Mark a managed box, dispatching its `Object.gc_mark` capability.
    ///
    /// Returns false if the handle belongs to another runtime.
    ///
    /// # Errors
    /// Returns `RuntimeError::NoCurrentContext` if the thread has no context.
    pub fn mark_managed<T>(&mut self, handle: Managed<T>) -> Result<bool, RuntimeError> {
        let ctx = bound_context(&self.contexts, &self.current_context)?;
        Ok(self.managed_heap.mark(ctx, handle))
    }

    /// Clear the mark flag of every managed box.
    pub fn clear_managed_marks(&mut self) {
        self.managed_heap.clear_marks();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let start = nano_timestamp();
        let contexts = self.contexts.len();
        let namespaces = self.namespaces.len();

        // Threads that attached contexts and never detached are unbound too.
        self.current_context.clear_all();
        self.contexts.clear();

        let teardown = Context::new(ContextId::TEARDOWN, self.id, self.exchange_heap.clone());
        while let Some(namespace) = self.namespaces.pop() {
            namespace.destroy(&teardown);
        }
        drop(teardown);

        self.engine = Maybe::Nothing;

        tracing::debug!(
            runtime = self.id.0,
            contexts,
            namespaces,
            outstanding = self.exchange_heap.live_allocations(),
            elapsed_ns = nano_timestamp().saturating_sub(start),
            "runtime destroyed"
        );
    }
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("contexts", &self.contexts.len())
            .field("namespaces", &self.namespaces.len())
            .field("exchange_heap", &self.exchange_heap)
            .field("managed_heap", &self.managed_heap)
            .finish_non_exhaustive()
    }
}
