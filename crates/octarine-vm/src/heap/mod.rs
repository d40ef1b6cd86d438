// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Box allocators for octarine values.
//!
//! Two heaps share one box format (a fixed-size header directly before the
//! payload, see [`boxed`]):
//!
//! - [`ExchangeHeap`] hands out `Owned` boxes that are freed exactly once
//!   by their owner.
//! - [`ManagedHeap`] hands out `Managed` handles whose reclamation is left
//!   to a future collector.

pub mod boxed;
mod exchange;
mod managed;


pub use boxed::{BOX_ALIGN, HEADER_SIZE, ManagedBoxHeader, OwnedBoxHeader};
pub use exchange::ExchangeHeap;
pub use managed::ManagedHeap;
