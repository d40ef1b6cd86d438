// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the pointer kinds.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Borrowed, Constant, Managed, Owned, OwnedArray, OwnershipKind, Pointer};
use crate::heap::ExchangeHeap;
use crate::platform::TrackingAllocator;
use crate::protocol::{Object, Type, Typed};
use crate::runtime::Context;

fn setup() -> (Arc<TrackingAllocator>, Context) {
    let tracker = Arc::new(TrackingAllocator::new());
    let ctx = Context::detached(ExchangeHeap::new(tracker.clone()));
    (tracker, ctx)
}

struct Resource {
    dtors: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl Typed for Resource {
    const TYPE: Type = Type::of::<Self>("test.Resource");
}

impl Object for Resource {
    fn dtor(&mut self, _ctx: &Context) {
        self.dtors.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn kinds_are_fixed_per_type() {
    assert_eq!(<Owned<u8> as Pointer>::KIND, OwnershipKind::Owned);
    assert_eq!(<OwnedArray<u8> as Pointer>::KIND, OwnershipKind::Owned);
    assert_eq!(<Borrowed<'static, u8> as Pointer>::KIND, OwnershipKind::Borrowed);
    assert_eq!(<Managed<u8> as Pointer>::KIND, OwnershipKind::Managed);
    assert_eq!(<Constant<u8> as Pointer>::KIND, OwnershipKind::Constant);
}

#[test]
fn only_owned_release_frees() {
    assert!(OwnershipKind::Owned.release_frees());
    assert!(!OwnershipKind::Borrowed.release_frees());
    assert!(!OwnershipKind::Managed.release_frees());
    assert!(!OwnershipKind::Constant.release_frees());
}

#[test]
fn release_runs_dtor_then_frees() {
    let (tracker, ctx) = setup();
    let dtors = Arc::new(AtomicUsize::new(0));
    let drops = Arc::new(AtomicUsize::new(0));

    let owned = ctx
        .allocate(Resource {
            dtors: dtors.clone(),
            drops: drops.clone(),
        })
        .unwrap();
    owned.release(&ctx);

    assert_eq!(dtors.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.live_allocations(), 0);
}

#[test]
fn scope_exit_frees_without_dtor() {
    let (tracker, ctx) = setup();
    let dtors = Arc::new(AtomicUsize::new(0));
    let drops = Arc::new(AtomicUsize::new(0));

    {
        let _owned = ctx
            .allocate(Resource {
                dtors: dtors.clone(),
                drops: drops.clone(),
            })
            .unwrap();
    }

    assert_eq!(dtors.load(Ordering::SeqCst), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.live_allocations(), 0);
}

#[test]
fn borrowing_does_not_transfer_ownership() {
    let (tracker, ctx) = setup();
    let mut owned = ctx.allocate(10u32).unwrap();

    {
        let borrowed = owned.borrow();
        let copy = borrowed;
        assert_eq!(*borrowed + *copy, 20);
        assert_eq!(*copy.get(), 10);
    }
    *owned += 1;
    assert_eq!(*owned, 11);
    assert_eq!(tracker.live_allocations(), 1);
}

#[test]
fn constant_release_is_a_no_op() {
    static ANSWER: u32 = 42;
    let (tracker, ctx) = setup();

    let constant = Constant::new(&ANSWER);
    let copy = constant;
    constant.release(&ctx);
    assert_eq!(*copy, 42);
    assert_eq!(*copy.get(), 42);
    assert_eq!(tracker.alloc_calls(), 0);
    assert_eq!(tracker.dealloc_calls(), 0);
}

#[test]
fn owned_array_derefs_to_slice() {
    let (_tracker, ctx) = setup();
    let mut array = ctx.allocate_array::<u16>(3).unwrap();
    array[1] = 7;
    array.sort_unstable_by(|a, b| b.cmp(a));

    assert_eq!(&*array, &[7, 0, 0]);
    assert_eq!(format!("{array:?}"), "[7, 0, 0]");
}
