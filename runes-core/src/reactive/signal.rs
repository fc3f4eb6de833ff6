//! State Cells
//!
//! A `State` is the fundamental reactive primitive. It holds a value and is
//! the only kind of cell that can be written.
//!
//! # How State Cells Work
//!
//! 1. When a state cell is read within an evaluation (computed or effect),
//!    the evaluation is recorded as a dependent.
//!
//! 2. When a state cell is written, every transitive dependent is marked
//!    dirty and every reached effect is queued.
//!
//! 3. Every write counts as a change; there is no equality short-circuit.
//!
//! # Memory Layout
//!
//! Each state cell consists of:
//! - A node ID in its runtime's dependency graph
//! - A weak handle to the runtime
//! - The value, behind a `RefCell`

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::runtime::RuntimeInner;
use crate::graph::{NodeId, NodeKind};

/// Read access shared by [`State`] and [`Computed`](super::Computed).
pub trait Signal<T> {
    /// The cell's node in the dependency graph.
    fn id(&self) -> NodeId;

    /// Read the current value, recording a dependency if an evaluation is
    /// running.
    fn get(&self) -> T;

    /// Read the current value without recording a dependency.
    fn get_untracked(&self) -> T;
}

struct StateInner<T> {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    value: RefCell<T>,
}

impl<T> Drop for StateInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_node(self.id);
        }
    }
}

/// A mutable reactive cell holding a value of type `T`.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = rt.state(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (invalidates dependents)
/// count.set(5);
/// ```
pub struct State<T> {
    inner: Rc<StateInner<T>>,
}

impl<T: 'static> State<T> {
    pub(crate) fn new(runtime: &Rc<RuntimeInner>, value: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                id: runtime.insert_node(NodeKind::Source),
                runtime: Rc::downgrade(runtime),
                value: RefCell::new(value),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Borrow the current value, recording a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.track(self.inner.id);
        }
        f(&*self.inner.value.borrow())
    }

    /// Borrow the current value without recording a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.borrow())
    }

    /// Replace the value and invalidate every dependent.
    pub fn set(&self, value: T) {
        drop(self.inner.value.replace(value));
        self.notify();
    }

    /// Mutate the value in place and invalidate every dependent.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.inner.value.borrow_mut());
        self.notify();
    }

    fn notify(&self) {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.invalidate(self.inner.id);
        }
    }
}

impl<T: Clone + 'static> State<T> {
    /// Get the current value, recording a dependency.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: Clone + 'static> Signal<T> for State<T> {
    fn id(&self) -> NodeId {
        self.inner.id
    }

    fn get(&self) -> T {
        State::get(self)
    }

    fn get_untracked(&self) -> T {
        State::get_untracked(self)
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("State");
        debug.field("id", &self.inner.id);
        match self.inner.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &"<borrowed>"),
        };
        debug.finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
