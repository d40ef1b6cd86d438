// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the hashtable.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use core::ptr::NonNull;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

use super::{DEFAULT_HASHTABLE_CAPACITY, Hashtable};
use crate::error::{AllocError, ProtocolError, RuntimeError};
use crate::heap::ExchangeHeap;
use crate::maybe::Maybe;
use crate::platform::TrackingAllocator;
use crate::protocol::{
    EqComparable, EqComparableVTable, Hashable, HashableVTable, HashtableKeyVTable, Object, Type,
    Typed,
};
use crate::runtime::Context;
use crate::string::OctString;

fn setup() -> (Arc<TrackingAllocator>, Context) {
    let tracker = Arc::new(TrackingAllocator::new());
    let ctx = Context::detached(ExchangeHeap::new(tracker.clone()));
    (tracker, ctx)
}

/// Key whose hash is its value modulo `buckets`, to force collisions.
#[derive(Debug, Clone, Copy)]
struct Bucketed {
    value: u32,
    buckets: u32,
}

impl Bucketed {
    const fn new(value: u32, buckets: u32) -> Self {
        Self { value, buckets }
    }
}

impl Typed for Bucketed {
    const TYPE: Type = Type::of::<Self>("test.Bucketed");
}

impl EqComparable for Bucketed {
    fn equals(&self, _ctx: &Context, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Hashable for Bucketed {
    fn hash(&self, _ctx: &Context) -> u64 {
        u64::from(self.value % self.buckets)
    }
}

fn key(ctx: &Context, text: &str) -> OctString {
    OctString::create(ctx, text).unwrap()
}

#[test]
fn put_then_get() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::with_default_capacity(&ctx).unwrap();
    assert_eq!(table.capacity(), DEFAULT_HASHTABLE_CAPACITY);

    assert!(table.put(&ctx, key(&ctx, "one"), 1).unwrap().is_nothing());
    assert!(table.put(&ctx, key(&ctx, "two"), 2).unwrap().is_nothing());

    assert_eq!(table.get(&ctx, &key(&ctx, "one")), Maybe::Something(&1));
    assert_eq!(table.get(&ctx, &key(&ctx, "two")), Maybe::Something(&2));
    assert_eq!(table.len(), 2);
}

#[test]
fn get_does_not_remove() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 8).unwrap();
    table.put(&ctx, key(&ctx, "k"), 'v').unwrap();

    let k = key(&ctx, "k");
    assert_eq!(table.get(&ctx, &k), Maybe::Something(&'v'));
    assert_eq!(table.get(&ctx, &k), Maybe::Something(&'v'));
    assert_eq!(table.len(), 1);
}

#[test]
fn missing_key_is_nothing() {
    let (_tracker, ctx) = setup();
    let mut table: Hashtable<OctString, u8> = Hashtable::new(&ctx, 8).unwrap();
    assert!(table.get(&ctx, &key(&ctx, "absent")).is_nothing());

    table.put(&ctx, key(&ctx, "present"), 1).unwrap();
    assert!(table.get(&ctx, &key(&ctx, "absent")).is_nothing());
    assert!(!table.contains_key(&ctx, &key(&ctx, "absent")));
    assert!(table.contains_key(&ctx, &key(&ctx, "present")));
}

#[test]
fn put_replaces_and_returns_previous() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 8).unwrap();

    table.put(&ctx, key(&ctx, "k"), 1).unwrap();
    let previous = table.put(&ctx, key(&ctx, "k"), 2).unwrap();

    assert_eq!(previous, Maybe::Something(1));
    assert_eq!(table.get(&ctx, &key(&ctx, "k")), Maybe::Something(&2));
    assert_eq!(table.len(), 1);
}

#[test]
fn get_mut_updates_in_place() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 8).unwrap();
    table.put(&ctx, key(&ctx, "n"), 10).unwrap();

    if let Maybe::Something(value) = table.get_mut(&ctx, &key(&ctx, "n")) {
        *value += 5;
    }
    assert_eq!(table.get(&ctx, &key(&ctx, "n")), Maybe::Something(&15));
}

#[test]
fn colliding_keys_stay_reachable() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 32).unwrap();
    for value in 0..10 {
        table.put(&ctx, Bucketed::new(value, 1), value * 100).unwrap();
    }

    for value in 0..10 {
        assert_eq!(
            table.get(&ctx, &Bucketed::new(value, 1)),
            Maybe::Something(&(value * 100))
        );
    }
}

#[test]
fn removal_shifts_cluster_back() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 16).unwrap();
    for value in 0..8 {
        table.put(&ctx, Bucketed::new(value, 2), value).unwrap();
    }

    assert_eq!(table.remove(&ctx, &Bucketed::new(2, 2)), Maybe::Something(2));
    assert_eq!(table.remove(&ctx, &Bucketed::new(5, 2)), Maybe::Something(5));
    assert!(table.remove(&ctx, &Bucketed::new(5, 2)).is_nothing());

    for value in [0, 1, 3, 4, 6, 7] {
        assert_eq!(
            table.get(&ctx, &Bucketed::new(value, 2)),
            Maybe::Something(&value)
        );
    }
    assert_eq!(table.len(), 6);
}

#[test]
fn grows_past_load_limit() {
    let (tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 4).unwrap();
    for value in 0..100u32 {
        table.put(&ctx, Bucketed::new(value, 1000), value).unwrap();
    }

    assert_eq!(table.len(), 100);
    assert!(table.capacity() * 3 >= table.len() * 4);
    for value in 0..100u32 {
        assert!(table.contains_key(&ctx, &Bucketed::new(value, 1000)));
    }
    // Old slot arrays were returned to the heap.
    assert_eq!(tracker.live_allocations(), 1);
}

#[test]
fn zero_capacity_table_grows_on_first_put() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 0).unwrap();
    assert!(table.get(&ctx, &Bucketed::new(1, 4)).is_nothing());
    assert!(table.remove(&ctx, &Bucketed::new(1, 4)).is_nothing());

    table.put(&ctx, Bucketed::new(1, 4), "x").unwrap();
    assert!(table.capacity() > 0);
    assert_eq!(table.get(&ctx, &Bucketed::new(1, 4)), Maybe::Something(&"x"));
}

#[test]
fn iter_and_drain() {
    let (_tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 8).unwrap();
    for value in 0..5 {
        table.put(&ctx, Bucketed::new(value, 8), value).unwrap();
    }

    let mut seen: Vec<u32> = table.iter().map(|(_, v)| *v).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);

    for (_, value) in table.iter_mut() {
        *value *= 2;
    }
    let mut drained: Vec<u32> = table.drain().into_iter().map(|(_, v)| v).collect();
    drained.sort_unstable();
    assert_eq!(drained, vec![0, 2, 4, 6, 8]);
    assert!(table.is_empty());
    assert!(table.get(&ctx, &Bucketed::new(1, 8)).is_nothing());
}

struct Tracked(Arc<AtomicUsize>);

impl Typed for Tracked {
    const TYPE: Type = Type::of::<Self>("test.Tracked");
}

impl Object for Tracked {
    fn dtor(&mut self, _ctx: &Context) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn destroy_runs_key_and_value_dtors() {
    let (tracker, ctx) = setup();
    let dtors = Arc::new(AtomicUsize::new(0));
    let mut table = Hashtable::new(&ctx, 8).unwrap();
    for name in ["a", "b", "c"] {
        table
            .put(&ctx, key(&ctx, name), Tracked(dtors.clone()))
            .unwrap();
    }

    table.destroy(&ctx);
    assert_eq!(dtors.load(Ordering::SeqCst), 3);
    assert_eq!(tracker.live_allocations(), 0);
}

#[test]
fn reserve_makes_room_up_front() {
    let (tracker, ctx) = setup();
    let mut table = Hashtable::new(&ctx, 0).unwrap();
    table.reserve(&ctx, 6).unwrap();
    assert_eq!(table.capacity(), 8);

    let allocations = tracker.alloc_calls();
    for value in 0..6 {
        table.put(&ctx, Bucketed::new(value, 8), value).unwrap();
    }
    assert_eq!(tracker.alloc_calls(), allocations);
    assert_eq!(table.len(), 6);
}

#[test]
fn failed_reserve_leaves_table_unchanged() {
    let tracker = Arc::new(TrackingAllocator::with_limit(1));
    let ctx = Context::detached(ExchangeHeap::new(tracker.clone()));
    let mut table = Hashtable::new(&ctx, 2).unwrap();
    table.put(&ctx, Bucketed::new(1, 8), 'a').unwrap();

    let err = table.reserve(&ctx, 4).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { .. }));
    assert_eq!(table.capacity(), 2);
    assert_eq!(table.get(&ctx, &Bucketed::new(1, 8)), Maybe::Something(&'a'));
    assert_eq!(tracker.failed_allocs(), 1);
}

/// Key type with no key capabilities of its own.
#[derive(Debug)]
struct Code(u32);

impl Typed for Code {
    const TYPE: Type = Type::of::<Self>("test.Code");
}

fn code_type() -> Type {
    Code::TYPE
}

// Codes are compared and hashed by their last two digits.
unsafe fn code_equals(_ctx: &Context, a: NonNull<u8>, b: NonNull<u8>) -> bool {
    // SAFETY: only used in tables declared for `Code`.
    unsafe { a.cast::<Code>().as_ref().0 % 100 == b.cast::<Code>().as_ref().0 % 100 }
}

unsafe fn code_hash(_ctx: &Context, data: NonNull<u8>) -> u64 {
    // SAFETY: only used in tables declared for `Code`.
    unsafe { u64::from(data.cast::<Code>().as_ref().0 % 100) }
}

fn code_key_vtable() -> &'static HashtableKeyVTable {
    // SAFETY: both functions read a `Code`.
    let (eq, hash) = unsafe {
        (
            EqComparableVTable::from_functions(code_type, Some(code_equals)).unwrap(),
            HashableVTable::from_functions(code_type, Some(code_hash)).unwrap(),
        )
    };
    HashtableKeyVTable::compose(eq, hash).unwrap()
}

#[test]
fn assembled_key_table_drives_hashing_and_equality() {
    let (tracker, ctx) = setup();
    let key_vtable = code_key_vtable();
    let mut table = Hashtable::with_key_vtable(&ctx, 0, key_vtable).unwrap();
    assert!(core::ptr::eq(table.key_vtable(), key_vtable));

    for value in 0..20 {
        table.put(&ctx, Code(value), value).unwrap();
    }
    assert_eq!(table.get(&ctx, &Code(107)), Maybe::Something(&7));
    assert_eq!(table.put(&ctx, Code(215), 99).unwrap(), Maybe::Something(15));
    assert_eq!(table.len(), 20);

    let Maybe::Something((stored, value)) = table.remove_entry(&ctx, &Code(303)) else {
        panic!("entry not found");
    };
    assert_eq!((stored.0, value), (3, 3));
    assert!(!table.contains_key(&ctx, &Code(3)));

    drop(table);
    assert_eq!(tracker.live_allocations(), 0);
}

#[test]
fn key_table_for_another_type_is_rejected() {
    let (tracker, ctx) = setup();
    let err = Hashtable::<OctString, u32>::with_key_vtable(&ctx, 4, code_key_vtable()).unwrap_err();

    assert_eq!(
        err,
        RuntimeError::Protocol(ProtocolError::TypeMismatch {
            expected: "octarine.String",
            found: "test.Code",
        })
    );
    assert_eq!(tracker.alloc_calls(), 0);
}

#[derive(Debug, Clone)]
enum Op {
    Put(u32, u32),
    Remove(u32),
    Get(u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..32, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        (0u32..32).prop_map(Op::Remove),
        (0u32..32).prop_map(Op::Get),
    ]
}

proptest! {
    /// The table behaves like a map under any sequence of operations,
    /// including heavy collisions (four hash buckets for 32 keys).
    #[test]
    fn behaves_like_a_map(
        capacity in 0usize..8,
        ops in prop::collection::vec(arb_op(), 0..200),
    ) {
        let (tracker, ctx) = setup();
        let mut table = Hashtable::new(&ctx, capacity).unwrap();
        let mut model = HashMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    let previous = table.put(&ctx, Bucketed::new(k, 4), v).unwrap();
                    prop_assert_eq!(previous.into_option(), model.insert(k, v));
                }
                Op::Remove(k) => {
                    let removed = table.remove(&ctx, &Bucketed::new(k, 4));
                    prop_assert_eq!(removed.into_option(), model.remove(&k));
                }
                Op::Get(k) => {
                    let found = table.get(&ctx, &Bucketed::new(k, 4)).into_option();
                    prop_assert_eq!(found, model.get(&k));
                }
            }
            prop_assert_eq!(table.len(), model.len());
        }

        for (k, v) in &model {
            prop_assert_eq!(table.get(&ctx, &Bucketed::new(*k, 4)), Maybe::Something(v));
        }
        drop(table);
        prop_assert_eq!(tracker.live_allocations(), 0);
    }
}
