//! Ordering Barriers
//!
//! A barrier holds back the first run of every effect registered while it is
//! active. Releasing it queues those runs for the next flush, so a group of
//! cells created together all exist before any effect observing them fires.
//!
//! At most one barrier is active per runtime. Acquiring a new one saves the
//! current barrier and releasing restores it, so nested acquisitions compose
//! without leaking effects across unrelated batches.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::EffectRecord;
use super::runtime::{Runtime, RuntimeInner};

pub(crate) struct Barrier {
    id: u64,
    deferred: RefCell<Vec<Rc<EffectRecord>>>,
}

impl Barrier {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            deferred: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn defer(&self, record: Rc<EffectRecord>) {
        self.deferred.borrow_mut().push(record);
    }
}

/// Scoped acquisition of an ordering barrier.
///
/// Returned by [`Runtime::barrier`]. The barrier is released when the guard
/// drops. Guards must be dropped in reverse order of acquisition.
#[must_use = "the barrier is released as soon as the guard is dropped"]
pub struct BarrierGuard {
    runtime: Rc<RuntimeInner>,
    barrier: Rc<Barrier>,
    previous: Option<Rc<Barrier>>,
}

impl BarrierGuard {
    /// Number of effects whose first run is waiting on this barrier.
    pub fn deferred_effects(&self) -> usize {
        self.barrier.deferred.borrow().len()
    }

    /// Release the barrier now.
    pub fn release(self) {}
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        let current = self.runtime.barrier.replace(self.previous.take());
        debug_assert!(
            current.as_ref().is_some_and(|c| Rc::ptr_eq(c, &self.barrier)),
            "barriers must be released in reverse order of acquisition"
        );

        let deferred = std::mem::take(&mut *self.barrier.deferred.borrow_mut());
        tracing::debug!(
            barrier = self.barrier.id,
            effects = deferred.len(),
            "barrier released"
        );
        for record in deferred {
            self.runtime.enqueue(record);
        }
    }
}

impl Runtime {
    /// Acquire an ordering barrier.
    ///
    /// Effects registered while the guard is alive do not run until it is
    /// released; their first runs then happen on the next flush.
    pub fn barrier(&self) -> BarrierGuard {
        let runtime = self.inner().clone();
        let barrier = Rc::new(Barrier::new());
        let previous = runtime.barrier.replace(Some(barrier.clone()));
        BarrierGuard {
            runtime,
            barrier,
            previous,
        }
    }

    /// Whether an ordering barrier is currently held.
    pub fn has_barrier(&self) -> bool {
        self.inner().barrier.borrow().is_some()
    }
}
