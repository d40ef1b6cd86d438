// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Octarine VM
//!
//! Memory and dispatch substrate of the octarine runtime.
//!
//! This crate provides:
//! - Ownership-tagged pointer kinds (`Owned`, `Borrowed`, `Managed`, `Constant`)
//! - Protocol objects: a data pointer paired with a capability table
//! - The exchange heap, a box allocator with an out-of-band header per allocation
//! - A protocol-dispatched hashtable and the `Maybe` present/absent value
//! - Namespaces holding owned or constant bindings
//! - The `Runtime` and its per-logical-thread `Context`s
//!
//! Code generation, the REPL and process bootstrap are collaborators that
//! plug in through the [`backend`] and [`platform`] seams.

pub mod backend;
pub mod error;
pub mod hashtable;
pub mod heap;
pub mod maybe;
pub mod namespace;
pub mod ownership;
pub mod platform;
pub mod protocol;
pub mod runtime;
pub mod string;


// Re-export commonly used types at crate root
pub use error::{AllocError, BackendError, MissingValue, ProtocolError, RuntimeError};
pub use maybe::Maybe;
pub use runtime::{Context, ContextId, Runtime, RuntimeConfig};
pub use string::OctString;

/// Crate version.
pub const VERSION: &str = match option_env!("OCTARINE_VERSION") {
    Some(v) => v,
    None => "unknown",
};
