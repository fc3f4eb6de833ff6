//! Integration Tests for the Reactive System and Reconciler
//!
//! These tests verify that cells, effects, the scheduler and the reconciler
//! work together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use runes_core::reactive::{Cleanup, LocalSetQueue, MicrotaskQueue, Runtime, SignalRegistry};
use runes_core::render::{reconcile, Component, Element, TreeNode};
use runes_core::Error;

fn runtime() -> (Runtime, MicrotaskQueue) {
    let queue = MicrotaskQueue::new();
    (Runtime::new(queue.clone()), queue)
}

fn para(text: &str) -> Element {
    Element::new("p").child(Element::text(text))
}

/// Writes to cells a computed cell did not read leave it clean.
#[test]
fn computed_depends_only_on_what_it_read() {
    let (rt, _queue) = runtime();
    let a = rt.state(1);
    let b = rt.state(2);
    let others: Vec<_> = (0..5).map(|i| rt.state(i)).collect();

    let (left, right) = (a.clone(), b.clone());
    let sum = rt.computed(move || left.get() + right.get());
    assert_eq!(sum.get(), 3);

    for (i, other) in others.iter().enumerate() {
        other.set(i * 10);
        assert!(!sum.is_dirty());
    }

    b.set(5);
    assert!(sum.is_dirty());
    assert_eq!(sum.get(), 6);
}

/// State(0) written to 1, 2, 3 before the flush: one extra run, seeing 3.
#[test]
fn writes_before_the_flush_coalesce() {
    let (rt, queue) = runtime();
    let state = rt.state(0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (reader, log) = (state.clone(), seen.clone());
    let effect = rt.effect(move || log.borrow_mut().push(reader.get()));

    state.set(1);
    state.set(2);
    state.set(3);
    assert_eq!(*seen.borrow(), vec![0]);

    queue.run_until_idle();
    assert_eq!(*seen.borrow(), vec![0, 3]);
    assert_eq!(effect.run_count(), 2);
}

/// A computed callback runs on first read and again only after invalidation.
#[test]
fn computed_pulls_lazily() {
    let (rt, _queue) = runtime();
    let state = rt.state(2);
    let calls = Rc::new(Cell::new(0));

    let (source, counter) = (state.clone(), calls.clone());
    let squared = rt.computed(move || {
        counter.set(counter.get() + 1);
        source.get() * source.get()
    });
    assert_eq!(calls.get(), 0);

    assert_eq!(squared.get(), 4);
    assert_eq!(squared.get(), 4);
    assert_eq!(calls.get(), 1);

    state.set(3);
    state.set(4);
    assert_eq!(calls.get(), 1);
    assert_eq!(squared.get(), 16);
    assert_eq!(calls.get(), 2);
}

/// Cells read inside `untrack` do not re-trigger the effect.
#[test]
fn untracked_reads_do_not_retrigger() {
    let (rt, queue) = runtime();
    let tracked = rt.state(0);
    let ignored = rt.state(0);
    let runs = Rc::new(Cell::new(0));

    let (a, b, counter, inner) = (tracked.clone(), ignored.clone(), runs.clone(), rt.clone());
    let _effect = rt.effect(move || {
        a.get();
        inner.untrack(|| b.get());
        counter.set(counter.get() + 1);
    });

    ignored.set(1);
    queue.run_until_idle();
    assert_eq!(runs.get(), 1);

    tracked.set(1);
    queue.run_until_idle();
    assert_eq!(runs.get(), 2);
}

/// Effects reading a computed chain re-run once per flush.
#[test]
fn effect_over_computed_chain() {
    let (rt, queue) = runtime();
    let first = rt.state("Ada".to_string());
    let last = rt.state("Lovelace".to_string());

    let (f, l) = (first.clone(), last.clone());
    let full = rt.computed(move || format!("{} {}", f.get(), l.get()));
    let greeting = {
        let full = full.clone();
        rt.computed(move || format!("Hello, {}", full.get()))
    };

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let _effect = rt.effect(move || log.borrow_mut().push(greeting.get()));

    first.set("Grace".into());
    last.set("Hopper".into());
    queue.run_until_idle();

    assert_eq!(
        *seen.borrow(),
        vec!["Hello, Ada Lovelace".to_string(), "Hello, Grace Hopper".to_string()]
    );
    assert_eq!(full.run_count(), 2);
}

/// Cleanups run before each re-run and on disposal, never after.
#[test]
fn cleanup_lifecycle() {
    let (rt, queue) = runtime();
    let state = rt.state(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let (reader, events) = (state.clone(), log.clone());
    let effect = rt.effect(move || {
        let value = reader.get();
        events.borrow_mut().push(format!("run {value}"));
        let events = events.clone();
        Cleanup::new(move || events.borrow_mut().push(format!("cleanup {value}")))
    });

    state.set(1);
    queue.run_until_idle();
    effect.dispose();
    state.set(2);
    queue.run_until_idle();

    assert_eq!(
        *log.borrow(),
        vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
    );
}

/// A panicking effect reaches the host; the rest of its batch still runs.
#[test]
fn effect_panic_leaves_the_scheduler_consistent() {
    let (rt, queue) = runtime();
    let state = rt.state(0);
    let healthy_runs = Rc::new(Cell::new(0));

    let reader = state.clone();
    let _faulty = rt.effect(move || {
        if reader.get() == 1 {
            panic!("effect failed");
        }
    });

    let (reader, counter) = (state.clone(), healthy_runs.clone());
    let _healthy = rt.effect(move || {
        reader.get();
        counter.set(counter.get() + 1);
    });

    state.set(1);
    let flushed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| queue.run_until_idle()));

    assert!(flushed.is_err());
    assert!(!rt.is_tracking());
    assert_eq!(healthy_runs.get(), 1);
    assert_eq!(rt.pending_effects(), 1);

    // The healthy effect was re-queued for the next tick
    queue.run_until_idle();
    assert_eq!(healthy_runs.get(), 2);
    assert_eq!(rt.pending_effects(), 0);

    state.set(2);
    queue.run_until_idle();
    assert_eq!(healthy_runs.get(), 3);
}

/// Effects registered under a barrier first run after it is released.
#[test]
fn barrier_defers_first_runs() {
    let (rt, queue) = runtime();
    let log = Rc::new(RefCell::new(Vec::new()));

    let guard = rt.barrier();
    let a = rt.state(1);
    let events = log.clone();
    let reader = a.clone();
    let _effect = rt.effect(move || events.borrow_mut().push(reader.get()));
    let b = rt.state(2);
    assert!(log.borrow().is_empty());

    drop(guard);
    a.set(10);
    queue.run_until_idle();

    // One run: the deferred first run already sees the write
    assert_eq!(*log.borrow(), vec![10]);
    assert_eq!(b.get(), 2);
}

/// Registry lookups with bad keys fail immediately.
#[test]
fn registry_rejects_bad_keys() {
    let (rt, _queue) = runtime();
    let mut registry = SignalRegistry::new(&rt);
    registry.declare_value("count", 0_u32).unwrap();

    assert!(matches!(
        registry.get::<u32>("$count"),
        Err(Error::InvalidKey { .. })
    ));
    assert!(matches!(registry.get::<u32>("nope"), Err(Error::UnknownKey(_))));
    assert!(matches!(
        registry.get::<i64>("count"),
        Err(Error::TypeMismatch { .. })
    ));
    assert_eq!(registry.get::<u32>("count"), Ok(0));
}

/// reconcile(T, T) performs no mutations.
#[test]
fn reconcile_is_idempotent() {
    let mut tree = Element::new("div").attr("id", "app").children([
        Element::new("h1").child(Element::text("Title")),
        Element::new("ul").children((0..5).map(|i| {
            Element::new("li")
                .attr("data-index", i.to_string())
                .child(Element::text(format!("item {i}")))
        })),
    ]);
    let before = tree.to_json();

    let same = tree.clone();
    let mutations = reconcile(&mut tree, same);

    assert!(mutations.is_empty());
    assert_eq!(tree.to_json(), before);
}

/// After reconcile(P, C), P serializes like C.
#[test]
fn reconcile_converges() {
    let cases = [
        (
            Element::new("div").child(para("a")),
            Element::new("div").children([para("a"), para("b")]),
        ),
        (
            Element::new("div").attr("class", "x").child(Element::text("t")),
            Element::new("div").attr("id", "y").child(Element::new("em")),
        ),
        (Element::text("plain"), Element::new("span")),
        (
            Element::new("ol").children([para("1"), para("2"), para("3")]),
            Element::new("ol").children([para("3"), para("2"), para("1")]),
        ),
        (Element::new("table"), Element::new("section")),
    ];

    for (mut previous, candidate) in cases {
        let expected = candidate.to_json();
        reconcile(&mut previous, candidate);
        assert_eq!(previous.to_json(), expected);
    }
}

/// div[p[text("a")]] -> div[p[text("b")]] only rewrites the text.
#[test]
fn text_change_keeps_wrappers() {
    let mut previous = Element::new("div").child(para("a"));
    let keys = |tree: &Element| {
        let p = tree.child_at(0);
        (
            tree.key(),
            p.map(Element::key),
            p.and_then(|p| p.child_at(0)).map(Element::key),
        )
    };
    let before = keys(&previous);

    let mutations = reconcile(&mut previous, Element::new("div").child(para("b")));

    assert_eq!(mutations.texts, 1);
    assert_eq!(mutations.total(), 1);
    assert_eq!(keys(&previous), before);
    assert_eq!(
        previous.child_at(0).and_then(|p| p.child_at(0)).and_then(Element::as_text),
        Some("b")
    );
}

/// div[p, p] -> div[p] replaces the children wholesale.
#[test]
fn child_count_change_replaces_children() {
    let mut previous = Element::new("div").children([Element::new("p"), Element::new("p")]);
    let old_keys: Vec<_> = (0..2)
        .filter_map(|i| previous.child_at(i).map(Element::key))
        .collect();

    let mutations = reconcile(&mut previous, Element::new("div").child(Element::new("p")));

    assert_eq!(mutations.children_replaced, 1);
    assert_eq!(previous.child_count(), 1);
    let key = previous.child_at(0).map(Element::key);
    assert!(key.is_some_and(|k| !old_keys.contains(&k)));
}

/// Component-owned children are never entered, even when they differ.
#[test]
fn component_children_are_opaque() {
    let inside = Rc::new(RefCell::new(Element::new("span").child(Element::text("mine"))));
    let other = Rc::new(RefCell::new(Element::new("span").child(Element::text("theirs"))));

    let mut previous = Element::new("div").children([para("x"), Element::hosted(inside.clone())]);
    let candidate = Element::new("div").children([para("y"), Element::hosted(other)]);

    let mutations = reconcile(&mut previous, candidate);

    assert_eq!(mutations.components_skipped, 1);
    assert_eq!(mutations.texts, 1);
    let kept = previous.child_at(1).and_then(Element::as_hosted);
    assert!(kept.is_some_and(|h| Rc::ptr_eq(h.root(), &inside)));
    assert_eq!(
        inside.borrow().child_at(0).and_then(Element::as_text),
        Some("mine")
    );
}

/// A component and a plain node facing each other swap wholesale.
#[test]
fn component_against_plain_node_is_replaced() {
    let root = Rc::new(RefCell::new(Element::new("span")));
    let mut previous = Element::new("div").children([Element::hosted(root.clone())]);
    let candidate = Element::new("div").children([para("plain")]);
    let expected = candidate.to_json();

    let mutations = reconcile(&mut previous, candidate);

    assert_eq!(mutations.nodes_replaced, 1);
    assert_eq!(previous.to_json(), expected);
}

/// End to end: a component re-renders after writes, in place.
#[test]
fn component_tracks_its_cells() {
    let (rt, queue) = runtime();
    let items = rt.state(vec!["a".to_string(), "b".to_string()]);

    let list = items.clone();
    let component = Component::with_render(&rt, Element::new("ul"), move || {
        list.get()
            .into_iter()
            .map(|item| Element::new("li").child(Element::text(item)))
            .collect()
    });
    queue.run_until_idle();
    assert_eq!(component.root().borrow().child_count(), 2);

    let first = component.root().borrow().child_at(0).map(Element::key);
    items.update(|items| items[1] = "c".into());
    queue.run_until_idle();
    assert_eq!(component.root().borrow().child_at(0).map(Element::key), first);

    items.update(|items| items.push("d".into()));
    queue.run_until_idle();
    assert_eq!(component.root().borrow().child_count(), 3);
    assert_ne!(component.root().borrow().child_at(0).map(Element::key), first);
}

async fn settle() {
    // Local tasks run in spawn order, so the flush queued earlier runs first
    tokio::task::spawn_local(async {}).await.unwrap();
}

/// Flushes deferred through a tokio LocalSet.
#[tokio::test]
async fn local_set_queue_flushes_on_the_next_tick() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let rt = Runtime::new(LocalSetQueue);
            let state = rt.state(0);
            let seen = Rc::new(RefCell::new(Vec::new()));

            let (reader, log) = (state.clone(), seen.clone());
            let _effect = rt.effect(move || log.borrow_mut().push(reader.get()));

            state.set(1);
            state.set(2);
            state.set(3);
            assert_eq!(*seen.borrow(), vec![0]);

            settle().await;
            assert_eq!(*seen.borrow(), vec![0, 3]);
        })
        .await;
}
