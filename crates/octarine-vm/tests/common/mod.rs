// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared test infrastructure for integration tests.
//!
//! This module provides:
//! - [`tracked_runtime`] - A runtime over a [`TrackingAllocator`]
//! - [`Tracked`] - An object type that records its destructor calls
//! - [`CountingBackend`] - A backend that counts target initializations
//!
//! This module is **not** a test file, so it must comply with full clippy rules.
//! Test-specific allowances (like `unwrap_used`) are only permitted in `*_test.rs` files.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use octarine_vm::backend::{Backend, ExecutionEngine, Module, NullBackend};
use octarine_vm::platform::{InitOnce, TrackingAllocator, sleep_millis};
use octarine_vm::protocol::{Object, Type, Typed};
use octarine_vm::{BackendError, Context, Runtime, RuntimeConfig, RuntimeError};

/// Shared record of destructor calls, in call order.
pub type DtorLog = Arc<Mutex<Vec<String>>>;

/// Create an empty destructor log.
pub fn dtor_log() -> DtorLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Snapshot of a destructor log.
pub fn logged(log: &DtorLog) -> Vec<String> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// A runtime whose heaps are backed by a fresh tracking allocator.
///
/// # Errors
///
/// Returns the runtime construction error.
pub fn tracked_runtime() -> Result<(Arc<TrackingAllocator>, Runtime), RuntimeError> {
    let tracker = Arc::new(TrackingAllocator::new());
    let config = RuntimeConfig::default().with_allocator(tracker.clone());
    Ok((tracker, Runtime::with_config(config)?))
}

/// Object that appends its label to a log when its destructor runs.
#[derive(Debug)]
pub struct Tracked {
    label: String,
    log: DtorLog,
}

impl Tracked {
    /// Create a tracked value.
    pub fn new(label: impl Into<String>, log: &DtorLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
        }
    }

    /// The label recorded on destruction.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Typed for Tracked {
    const TYPE: Type = Type::of::<Self>("test.Tracked");
}

impl Object for Tracked {
    fn dtor(&mut self, _ctx: &Context) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.label.clone());
    }
}

/// Backend that counts target initializations.
///
/// Engine creation fails unless the initializer's effects are visible, so a
/// runtime that was handed a half-initialized target cannot be built.
#[derive(Debug)]
pub struct CountingBackend {
    init: &'static InitOnce,
    ready: AtomicBool,
    init_calls: AtomicUsize,
    delay_millis: u64,
}

impl CountingBackend {
    /// Create a backend with its own initialization guard.
    ///
    /// The initializer sleeps for `delay_millis` before publishing its result.
    pub fn new(delay_millis: u64) -> Self {
        Self {
            init: Box::leak(Box::new(InitOnce::new())),
            ready: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            delay_millis,
        }
    }

    /// How often the target initializer ran.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }
}

impl Backend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn target_init(&self) -> &InitOnce {
        self.init
    }

    fn initialize_target(&self) -> Result<(), BackendError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        sleep_millis(self.delay_millis);
        self.ready.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn create_engine(&self, module: Module) -> Result<Box<dyn ExecutionEngine>, BackendError> {
        if !self.ready.load(Ordering::Relaxed) {
            return Err(BackendError::EngineCreation(
                "target not initialized".into(),
            ));
        }
        NullBackend.create_engine(module)
    }
}
