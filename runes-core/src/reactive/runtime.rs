//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects state cells, computed
//! cells and effects. It owns the dependency graph, the tracking stack, the
//! pending-effect queue and the active ordering barrier.
//!
//! # How It Works
//!
//! 1. Cells and effects register a node in the graph when created.
//!
//! 2. Reading a cell inside an evaluation records an edge from the cell to
//!    the evaluation on top of the tracking stack.
//!
//! 3. Writing a state cell:
//!    a. Marks every downstream computed cell and effect dirty
//!    b. Queues each reached effect unless it is already queued
//!    c. Defers one flush task onto the host queue if none is outstanding
//!
//! 4. The flush task re-runs every queued effect that is still dirty, then
//!    re-arms the batch so later writes can queue the effects again.
//!
//! # Threading
//!
//! A runtime is single-threaded: handles are `!Send` and every evaluation runs
//! on the thread that owns the runtime. Re-entrancy is handled with short
//! `RefCell` borrows that are never held while user code runs.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::barrier::Barrier;
use super::context::{ContextStack, Frame};
use super::effect::{Disposer, EffectOutput, EffectRecord};
use super::memo::Computed;
use super::queue::TaskQueue;
use super::signal::State;
use crate::config::RuntimeConfig;
use crate::graph::{DependencyGraph, NodeId, NodeKind};

pub(crate) struct RuntimeInner {
    pub(crate) graph: RefCell<DependencyGraph>,
    pub(crate) context: ContextStack,
    effects: RefCell<HashMap<NodeId, Rc<EffectRecord>>>,
    pending: RefCell<VecDeque<Rc<EffectRecord>>>,
    flush_scheduled: Cell<bool>,
    pub(crate) barrier: RefCell<Option<Rc<Barrier>>>,
    queue: Box<dyn TaskQueue>,
    debug: Cell<bool>,
}

impl RuntimeInner {
    /// Attribute a read of `id` to the current evaluation, if any.
    pub(crate) fn track(&self, id: NodeId) {
        if let Some(subscriber) = self.context.current_subscriber() {
            self.graph.borrow_mut().add_edge(id, subscriber);
        }
    }

    pub(crate) fn insert_node(&self, kind: NodeKind) -> NodeId {
        self.graph.borrow_mut().insert(kind)
    }

    pub(crate) fn remove_node(&self, id: NodeId) {
        // Graph borrows never span user code, so a cell dropped by an effect,
        // a cleanup or a computed callback always finds the graph free.
        match self.graph.try_borrow_mut() {
            Ok(mut graph) => graph.remove(id),
            Err(_) => tracing::warn!(node = %id, "graph busy; node not removed"),
        }
    }

    pub(crate) fn is_dirty(&self, id: NodeId) -> bool {
        self.graph.borrow().is_dirty(id)
    }

    /// Run `f` as the evaluation of `id`.
    ///
    /// The node's previous dependencies are dropped and it is marked clean
    /// before `f` runs, so reads made by `f` rebuild the dependency set and
    /// writes made by `f` can dirty it again.
    pub(crate) fn evaluate<R>(&self, id: NodeId, f: impl FnOnce() -> R) -> R {
        {
            let mut graph = self.graph.borrow_mut();
            graph.clear_dependencies(id);
            graph.mark_clean(id);
        }
        let _frame = self.context.enter(Frame::Tracking(id));
        f()
    }

    /// Propagate a write to `source`.
    pub(crate) fn invalidate(self: &Rc<Self>, source: NodeId) {
        let reached = self.graph.borrow_mut().invalidate(source);
        for id in reached {
            let record = self.effects.borrow().get(&id).cloned();
            if let Some(record) = record {
                self.enqueue(record);
            }
        }
    }

    /// Queue an effect for the next flush. An effect is queued at most once
    /// until the flush that runs it re-arms it.
    pub(crate) fn enqueue(self: &Rc<Self>, record: Rc<EffectRecord>) {
        if record.is_disposed() || record.queued.replace(true) {
            return;
        }
        self.pending.borrow_mut().push_back(record);
        self.schedule_flush();
    }

    fn schedule_flush(self: &Rc<Self>) {
        if self.flush_scheduled.replace(true) {
            return;
        }
        let runtime = Rc::downgrade(self);
        self.queue.defer(Box::new(move || {
            if let Some(runtime) = runtime.upgrade() {
                runtime.flush();
            }
        }));
    }

    /// Run every queued effect that is still dirty. Returns how many ran.
    pub(crate) fn flush(self: &Rc<Self>) -> usize {
        self.flush_scheduled.set(false);
        let batch: SmallVec<[Rc<EffectRecord>; 8]> = self.pending.borrow_mut().drain(..).collect();
        if batch.is_empty() {
            return 0;
        }

        let _span = tracing::debug_span!("flush", effects = batch.len()).entered();
        let rearm = Rearm {
            runtime: self,
            batch: &batch,
        };

        let mut ran = 0;
        for record in rearm.batch {
            if record.run_if_dirty(self) {
                ran += 1;
            }
        }

        drop(rearm);
        tracing::trace!(ran, "flush complete");
        ran
    }

    pub(crate) fn unregister_effect(&self, id: NodeId) {
        self.effects.borrow_mut().remove(&id);
        self.remove_node(id);
    }
}

/// Re-arms a flushed batch once every effect in it has been drained, and
/// re-queues those that were dirtied again in the meantime. Runs on unwind
/// too, so a panicking effect leaves the rest of its batch scheduled.
struct Rearm<'a> {
    runtime: &'a Rc<RuntimeInner>,
    batch: &'a [Rc<EffectRecord>],
}

impl Drop for Rearm<'_> {
    fn drop(&mut self) {
        for record in self.batch {
            record.queued.set(false);
        }
        for record in self.batch {
            if self.runtime.is_dirty(record.id()) {
                self.runtime.enqueue(record.clone());
            }
        }
    }
}

/// Handle to a reactive runtime.
///
/// Clones share the same runtime. Cells created by a runtime hold a weak
/// reference to it, so dropping every `Runtime` handle turns remaining cells
/// into plain untracked containers.
///
/// # Example
///
/// ```rust,ignore
/// let queue = MicrotaskQueue::new();
/// let rt = Runtime::new(queue.clone());
///
/// let count = rt.state(0);
/// let doubled = rt.computed({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// rt.effect(move || println!("doubled: {}", doubled.get()));
///
/// count.set(5);
/// queue.run_until_idle(); // prints "doubled: 10"
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new(queue: impl TaskQueue + 'static) -> Self {
        Self::with_config(RuntimeConfig::default(), queue)
    }

    pub fn with_config(config: RuntimeConfig, queue: impl TaskQueue + 'static) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(DependencyGraph::new()),
                context: ContextStack::default(),
                effects: RefCell::new(HashMap::new()),
                pending: RefCell::new(VecDeque::new()),
                flush_scheduled: Cell::new(false),
                barrier: RefCell::new(None),
                queue: Box::new(queue),
                debug: Cell::new(config.debug),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<RuntimeInner> {
        &self.inner
    }

    /// Create a mutable state cell.
    pub fn state<T: 'static>(&self, value: T) -> State<T> {
        State::new(&self.inner, value)
    }

    /// Create a lazily evaluated, memoized derived cell.
    ///
    /// `compute` does not run until the first read.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Computed::new(&self.inner, compute)
    }

    /// Register an effect.
    ///
    /// The callback runs once immediately, or when the active barrier is
    /// released if one is held, and again after any flush in which one of
    /// the cells it read has changed. It may return a [`Cleanup`] that runs
    /// right before the next run and on disposal.
    ///
    /// [`Cleanup`]: super::Cleanup
    pub fn effect<F, O>(&self, mut callback: F) -> Disposer
    where
        F: FnMut() -> O + 'static,
        O: EffectOutput,
    {
        let inner = &self.inner;
        let id = inner.insert_node(NodeKind::Effect);
        let record = Rc::new(EffectRecord::new(
            id,
            Box::new(move || callback().into_cleanup()),
        ));
        inner.effects.borrow_mut().insert(id, record.clone());

        let barrier = inner.barrier.borrow().clone();
        match barrier {
            Some(barrier) => {
                tracing::debug!(effect = %id, barrier = barrier.id(), "effect registered; first run deferred");
                barrier.defer(record.clone());
            }
            None => {
                tracing::debug!(effect = %id, "effect registered");
                record.run(inner);
            }
        }

        Disposer::new(Rc::downgrade(inner), record)
    }

    /// Run `f` without letting its reads become dependencies of the enclosing
    /// evaluation.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = self.inner.context.enter(Frame::Untracked);
        f()
    }

    /// Synchronously run every queued effect. Returns how many ran.
    ///
    /// A flush task that is already on the host queue becomes a no-op.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    /// Number of effects waiting for the next flush.
    pub fn pending_effects(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Number of live (not disposed) effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Whether a read right now would be recorded as a dependency.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_tracking()
    }

    pub fn is_debug(&self) -> bool {
        self.inner.debug.get()
    }

    /// Toggle debug mode. Affects debug hooks registered afterwards.
    pub fn set_debug(&self, debug: bool) {
        self.inner.debug.set(debug);
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.inner.is_dirty(id)
    }

    /// How many cells `id` read during its last evaluation.
    pub fn dependency_count(&self, id: NodeId) -> usize {
        self.inner.graph.borrow().dependency_count(id)
    }

    /// How many evaluations read `id` during their last run.
    pub fn dependent_count(&self, id: NodeId) -> usize {
        self.inner.graph.borrow().dependent_count(id)
    }

    pub fn node_count(&self) -> usize {
        self.inner.graph.borrow().node_count()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.node_count())
            .field("effects", &self.effect_count())
            .field("pending", &self.pending_effects())
            .field("tracking_depth", &self.inner.context.depth())
            .field("debug", &self.is_debug())
            .finish()
    }
}
