// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Execution backend seam.
//!
//! Code generation is a collaborator of the runtime, not part of it. A
//! backend performs one-time, process-wide target initialization and then
//! hands each runtime one execution engine owning one module container. The
//! runtime never looks inside the engine; dropping the engine drops its
//! module.
//!
//! ```text
//!   Runtime::with_config
//!        │
//!        ▼
//!   initialize(backend) ── target_init().call(initialize_target) ── once per process
//!        │
//!        ▼
//!   create_engine(Module "JITModule") ──► Box<dyn ExecutionEngine>
//! ```

use crate::error::BackendError;
use crate::platform::{InitOnce, nano_timestamp};

/// Name of the module container every runtime creates.
pub const JIT_MODULE_NAME: &str = "JITModule";

/// Container of generated code handed to an execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
}

impl Module {
    /// Create an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A native execution engine owning its module.
pub trait ExecutionEngine: Send {
    /// The module this engine executes.
    fn module(&self) -> &Module;
}

/// A code-generation backend.
pub trait Backend: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Guard for the process-wide target initialization.
    ///
    /// Must return the same guard on every call, normally a `static`.
    fn target_init(&self) -> &InitOnce;

    /// One-time target setup. Runs at most once successfully per process.
    ///
    /// # Errors
    /// Returns `BackendError::TargetInit` if the target cannot be set up.
    fn initialize_target(&self) -> Result<(), BackendError>;

    /// Create an execution engine owning `module`.
    ///
    /// # Errors
    /// Returns `BackendError::EngineCreation` if no engine can be created.
    fn create_engine(&self, module: Module) -> Result<Box<dyn ExecutionEngine>, BackendError>;
}

/// Run the backend's target initialization unless it already ran.
///
/// Concurrent callers wait, yielding, for the one that runs it. When this
/// returns `Ok`, every effect of the initializer is visible to the caller.
///
/// # Errors
/// Returns the initializer's error to the caller that ran it.
pub fn initialize(backend: &dyn Backend) -> Result<(), BackendError> {
    let start = nano_timestamp();
    let ran = backend
        .target_init()
        .call(|| backend.initialize_target())?;
    if ran {
        tracing::debug!(
            backend = backend.name(),
            elapsed_ns = nano_timestamp().saturating_sub(start),
            "backend target initialized"
        );
    }
    Ok(())
}

static NULL_TARGET_INIT: InitOnce = InitOnce::new();

/// Backend without code generation.
///
/// Its engine only holds the module; nothing is ever compiled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[derive(Debug)]
struct NullEngine {
    module: Module,
}

impl ExecutionEngine for NullEngine {
    fn module(&self) -> &Module {
        &self.module
    }
}

impl Backend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn target_init(&self) -> &InitOnce {
        &NULL_TARGET_INIT
    }

    fn initialize_target(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn create_engine(&self, module: Module) -> Result<Box<dyn ExecutionEngine>, BackendError> {
        Ok(Box::new(NullEngine { module }))
    }
}
