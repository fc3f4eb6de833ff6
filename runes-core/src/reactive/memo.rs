//! Computed Implementation
//!
//! A `Computed` is a cached derived value that re-evaluates only when read
//! after one of its dependencies changed.
//!
//! # How Computed Cells Work
//!
//! 1. Creation registers a dirty node; the callback does not run.
//!
//! 2. On first read, the callback runs inside a tracking frame and the result
//!    is cached.
//!
//! 3. When a dependency changes, the node is marked dirty. Nothing is
//!    recomputed yet.
//!
//! 4. On the next read, the callback runs again and the dependency set is
//!    rebuilt from the reads made during that run.
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation:
//!
//! - A state cell changes
//! - 10 computed cells depend on it
//! - Only the cells actually read will recompute
//! - Cells that are never read stay dirty (no wasted work)

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::context::Frame;
use super::runtime::RuntimeInner;
use super::signal::Signal;
use crate::graph::{NodeId, NodeKind};

struct ComputedInner<T> {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    runs: Cell<usize>,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_node(self.id);
        }
    }
}

/// Puts the node back to dirty if the callback unwinds, so the next read
/// retries instead of returning a stale value.
struct DirtyOnUnwind<'a> {
    runtime: &'a RuntimeInner,
    id: NodeId,
}

impl Drop for DirtyOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Ok(mut graph) = self.runtime.graph.try_borrow_mut() {
                graph.mark_dirty(self.id);
            }
        }
    }
}

/// A lazily evaluated, memoized derived value.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = rt.state(2);
/// let squared = rt.computed({
///     let count = count.clone();
///     move || count.get() * count.get()
/// });
///
/// assert_eq!(squared.get(), 4);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: 'static> Computed<T> {
    pub(crate) fn new<F>(runtime: &Rc<RuntimeInner>, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            inner: Rc::new(ComputedInner {
                id: runtime.insert_node(NodeKind::Derived),
                runtime: Rc::downgrade(runtime),
                compute: Box::new(compute),
                value: RefCell::new(None),
                runs: Cell::new(0),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Borrow the current value, recomputing first if it is stale, and
    /// record a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.track(self.inner.id);
        }
        self.refresh();

        let value = self.inner.value.borrow();
        match value.as_ref() {
            Some(value) => f(value),
            None => unreachable!("computed {} has no value after refresh", self.inner.id),
        }
    }

    /// Whether the next read will run the callback.
    pub fn is_dirty(&self) -> bool {
        match self.inner.runtime.upgrade() {
            Some(runtime) => runtime.is_dirty(self.inner.id),
            None => self.inner.value.borrow().is_none(),
        }
    }

    /// Number of times the callback has run.
    pub fn run_count(&self) -> usize {
        self.inner.runs.get()
    }

    fn refresh(&self) {
        let inner = &*self.inner;
        let Some(runtime) = inner.runtime.upgrade() else {
            // Detached from its runtime: compute once, never invalidate
            if inner.value.borrow().is_none() {
                let value = (inner.compute)();
                *inner.value.borrow_mut() = Some(value);
                inner.runs.set(inner.runs.get() + 1);
            }
            return;
        };

        assert!(
            !runtime.context.is_evaluating(inner.id),
            "computed {} read itself while recomputing",
            inner.id
        );
        if !runtime.is_dirty(inner.id) {
            return;
        }

        let guard = DirtyOnUnwind {
            runtime: &runtime,
            id: inner.id,
        };
        let value = runtime.evaluate(inner.id, || (inner.compute)());
        drop(guard);

        *inner.value.borrow_mut() = Some(value);
        inner.runs.set(inner.runs.get() + 1);
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Get the current value, recording a dependency.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without recording a dependency.
    ///
    /// The cell itself still tracks its own dependencies if it recomputes.
    pub fn get_untracked(&self) -> T {
        match self.inner.runtime.upgrade() {
            Some(runtime) => {
                let _frame = runtime.context.enter(Frame::Untracked);
                self.get()
            }
            None => self.get(),
        }
    }
}

impl<T: Clone + 'static> Signal<T> for Computed<T> {
    fn id(&self) -> NodeId {
        self.inner.id
    }

    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        Computed::get_untracked(self)
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Computed");
        debug.field("id", &self.inner.id);
        match self.inner.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &"<borrowed>"),
        };
        debug.field("runs", &self.inner.runs.get()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
