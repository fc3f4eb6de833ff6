//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever the cells
//! it read during its previous run change.
//!
//! # How Effects Work
//!
//! 1. When registered, the effect runs once to establish its dependencies
//!    (deferred until release if an ordering barrier is held).
//!
//! 2. When a dependency changes, the effect is queued exactly once and a
//!    flush is deferred onto the host queue.
//!
//! 3. Before re-running, the previous run's cleanup executes and the old
//!    dependency set is dropped; the run records a fresh one.
//!
//! # Differences from Computed
//!
//! - Computed cells return a value; effects do not.
//! - Computed cells are lazy (recompute on read); effects are pushed by the
//!   scheduler.
//!
//! # Cleanup
//!
//! A cleanup that panics is isolated: the panic is logged and the flush
//! carries on with the remaining effects. A panic in the effect body itself
//! is not caught.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::runtime::RuntimeInner;
use crate::graph::NodeId;

/// Work to run before an effect's next run or on its disposal.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    fn call(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// What an effect callback may return.
pub trait EffectOutput {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl EffectOutput for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl EffectOutput for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl EffectOutput for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

type Callback = Box<dyn FnMut() -> Option<Cleanup>>;

pub(crate) struct EffectRecord {
    id: NodeId,
    callback: RefCell<Callback>,
    cleanup: RefCell<Option<Cleanup>>,
    /// Set while the effect sits in the pending queue or in a batch being
    /// flushed.
    pub(crate) queued: Cell<bool>,
    disposed: Cell<bool>,
    runs: Cell<usize>,
}

impl EffectRecord {
    pub(crate) fn new(id: NodeId, callback: Callback) -> Self {
        Self {
            id,
            callback: RefCell::new(callback),
            cleanup: RefCell::new(None),
            queued: Cell::new(false),
            disposed: Cell::new(false),
            runs: Cell::new(0),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Run the effect if it is live and dirty. Returns whether it ran.
    pub(crate) fn run_if_dirty(&self, runtime: &RuntimeInner) -> bool {
        if self.disposed.get() || !runtime.is_dirty(self.id) {
            return false;
        }
        self.run(runtime);
        true
    }

    pub(crate) fn run(&self, runtime: &RuntimeInner) {
        let Ok(mut callback) = self.callback.try_borrow_mut() else {
            tracing::warn!(effect = %self.id, "effect re-entered while running; skipped");
            return;
        };

        let previous = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous {
            run_cleanup(self.id, cleanup);
        }

        let next = runtime.evaluate(self.id, || (&mut **callback)());
        drop(callback);
        self.runs.set(self.runs.get() + 1);

        // Disposed from inside its own run: nothing will call this later
        if self.disposed.get() {
            if let Some(cleanup) = next {
                run_cleanup(self.id, cleanup);
            }
        } else {
            *self.cleanup.borrow_mut() = next;
        }
    }
}

pub(crate) fn run_cleanup(effect: NodeId, cleanup: Cleanup) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || cleanup.call())) {
        tracing::error!(
            %effect,
            panic = panic_message(&*payload),
            "effect cleanup panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

/// Handle returned by [`Runtime::effect`](super::Runtime::effect).
///
/// Dropping the handle does not stop the effect; call [`dispose`](Self::dispose).
/// Clones refer to the same effect.
#[derive(Clone)]
pub struct Disposer {
    runtime: Weak<RuntimeInner>,
    record: Rc<EffectRecord>,
}

impl Disposer {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, record: Rc<EffectRecord>) -> Self {
        Self { runtime, record }
    }

    pub fn id(&self) -> NodeId {
        self.record.id
    }

    /// Stop the effect and run its outstanding cleanup.
    ///
    /// Unsubscribes from every dependency; later writes are ignored. Calling
    /// this more than once has no further effect.
    pub fn dispose(&self) {
        if self.record.disposed.replace(true) {
            return;
        }
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.unregister_effect(self.record.id);
        }
        tracing::debug!(effect = %self.record.id, "effect disposed");

        let cleanup = self.record.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            run_cleanup(self.record.id, cleanup);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.record.disposed.get()
    }

    /// Number of times the effect body has run.
    pub fn run_count(&self) -> usize {
        self.record.runs.get()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("id", &self.record.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
