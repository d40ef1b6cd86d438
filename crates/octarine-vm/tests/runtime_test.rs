// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end runtime lifecycle tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{Tracked, dtor_log, logged, tracked_runtime};
use octarine_vm::hashtable::Hashtable;
use octarine_vm::namespace::BindingKind;
use octarine_vm::protocol::{ConstantObject, Object, OwnedObject, Type, Typed};
use octarine_vm::{Context, Maybe, OctString, RuntimeError};

#[derive(Debug)]
struct Version(u32);

impl Typed for Version {
    const TYPE: Type = Type::of::<Self>("test.Version");
}

impl Object for Version {}

static VERSION: Version = Version(7);

#[test]
fn runtime_lifecycle_returns_every_allocation() {
    let (tracker, mut runtime) = tracked_runtime().unwrap();
    let log = dtor_log();

    for name in ["a", "b", "c"] {
        let value = runtime.allocate(Tracked::new(name, &log)).unwrap();
        runtime.bind_owned(name, OwnedObject::new(value)).unwrap();
    }
    runtime
        .bind_constant("version", ConstantObject::new(&VERSION))
        .unwrap();

    let lib = runtime.get_or_create_namespace("lib").unwrap();
    runtime.set_current_namespace(lib).unwrap();
    let value = runtime.allocate(Tracked::new("lib.a", &log)).unwrap();
    runtime.bind_owned("a", OwnedObject::new(value)).unwrap();

    assert!(tracker.live_allocations() > 0);
    drop(runtime);

    let mut released = logged(&log);
    released.sort();
    assert_eq!(released, vec!["a", "b", "c", "lib.a"]);
    assert_eq!(tracker.live_allocations(), 0);
    assert_eq!(tracker.invalid_frees(), 0);
}

#[test]
fn rebinding_releases_the_previous_value_once() {
    let (tracker, mut runtime) = tracked_runtime().unwrap();
    let log = dtor_log();

    let first = runtime.allocate(Tracked::new("first", &log)).unwrap();
    runtime.bind_owned("x", OwnedObject::new(first)).unwrap();
    let second = runtime.allocate(Tracked::new("second", &log)).unwrap();
    runtime.bind_owned("x", OwnedObject::new(second)).unwrap();
    assert_eq!(logged(&log), vec!["first"]);

    runtime
        .bind_constant("x", ConstantObject::new(&VERSION))
        .unwrap();
    assert_eq!(logged(&log), vec!["first", "second"]);

    let Maybe::Something(found) = runtime.lookup("x").unwrap() else {
        panic!("x is unbound");
    };
    assert_eq!(found.downcast_ref::<Version>().map(|v| v.0), Some(7));
    let ns = runtime.current_namespace().unwrap();
    let ctx = runtime.current_context().unwrap();
    let name = OctString::create(ctx, "x").unwrap();
    assert_eq!(ns.binding_kind(ctx, &name), BindingKind::Constant);
    drop(name);

    drop(runtime);
    assert_eq!(logged(&log), vec!["first", "second"]);
    assert_eq!(tracker.live_allocations(), 0);
}

#[test]
fn lookup_of_unknown_name_is_nothing() {
    let (_tracker, runtime) = tracked_runtime().unwrap();
    assert!(runtime.lookup("nope").unwrap().is_nothing());
}

#[test]
fn unbound_thread_cannot_use_the_runtime() {
    let (_tracker, mut runtime) = tracked_runtime().unwrap();
    let main = runtime.current_context().unwrap().id();
    let other = runtime.attach_context();
    assert!(runtime.detach_context(other));

    assert_eq!(
        runtime.lookup("x").unwrap_err(),
        RuntimeError::NoCurrentContext
    );
    assert_eq!(
        runtime.bind_constant("x", ConstantObject::new(&VERSION)),
        Err(RuntimeError::NoCurrentContext)
    );

    runtime.switch_context(main).unwrap();
    assert!(runtime.lookup("x").unwrap().is_nothing());
}

#[test]
fn context_heap_backs_user_tables() {
    let (tracker, runtime) = tracked_runtime().unwrap();
    let ctx: &Context = runtime.current_context().unwrap();
    let baseline = tracker.live_allocations();

    let mut table = Hashtable::new(ctx, 4).unwrap();
    for word in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        let key = OctString::create(ctx, word).unwrap();
        table.put(ctx, key, word.len()).unwrap();
    }
    let wanted = OctString::create(ctx, "gamma").unwrap();
    assert_eq!(table.get(ctx, &wanted), Maybe::Something(&5));

    drop(wanted);
    drop(table);
    assert_eq!(tracker.live_allocations(), baseline);
}
