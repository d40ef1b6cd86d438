// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Error types for the octarine substrate.
//!
//! Every failure family is its own enum so call sites can match on exactly
//! what they may receive. `RuntimeError` aggregates them for the `Runtime`
//! surface. Nothing here is retried internally.

use thiserror::Error;

/// The system allocator could not satisfy a box allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The backing allocator returned no memory.
    #[error("out of memory allocating a box of {size} bytes")]
    OutOfMemory {
        /// Total block size requested, header included.
        size: usize,
    },
    /// The requested size does not fit a valid layout.
    #[error("a box of {size} payload bytes exceeds the addressable range")]
    InvalidLayout {
        /// Payload size that overflowed.
        size: usize,
    },
}

/// The value of a `Maybe::Nothing` was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempted to read the value of an empty option")]
pub struct MissingValue;

/// The execution backend could not be brought up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// One-time target initialization failed.
    #[error("backend target initialization failed: {0}")]
    TargetInit(String),
    /// The execution engine could not be created.
    #[error("could not create execution engine: {0}")]
    EngineCreation(String),
}

/// A capability table or protocol object was built incorrectly.
///
/// These are authoring errors: they are only reported while a table or a
/// protocol object is being constructed, never during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A function slot required by the protocol was left empty.
    #[error("type `{type_name}` does not supply `{protocol}.{function}`")]
    MissingFunction {
        /// Type the table was declared for.
        type_name: &'static str,
        /// Protocol being satisfied.
        protocol: &'static str,
        /// Name of the empty slot.
        function: &'static str,
    },
    /// The table was declared for a different type than the data pointer.
    #[error("capability table for `{found}` paired with a value of type `{expected}`")]
    TypeMismatch {
        /// Type of the data pointer.
        expected: &'static str,
        /// Type declared by the table.
        found: &'static str,
    },
}

/// Errors surfaced by `Runtime` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Box allocation failed.
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// Backend initialization failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A protocol table or object was malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// An empty value was read.
    #[error(transparent)]
    Missing(#[from] MissingValue),
    /// No namespace is registered under this name.
    #[error("namespace `{name}` does not exist")]
    NamespaceNotFound {
        /// Requested namespace name.
        name: String,
    },
    /// The calling thread has no context bound in this runtime.
    #[error("no context is bound to the current thread")]
    NoCurrentContext,
    /// No live context has this identifier.
    #[error("context {id} does not exist")]
    ContextNotFound {
        /// Requested context identifier.
        id: u32,
    },
    /// Bytes handed to the string constructor were not UTF-8.
    #[error("string data is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },

    /// Text handed to the string constructor contained a NUL byte.
    #[error("string data contains a NUL byte at offset {position}")]
    InteriorNul {
        /// Byte offset of the first NUL.
        position: usize,
    },
}
