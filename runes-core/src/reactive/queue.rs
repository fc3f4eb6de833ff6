//! Host Task Queues
//!
//! The runtime never runs a re-triggered effect inside the write that
//! invalidated it. Instead it defers a single flush task onto a queue owned by
//! the host, so any number of writes made before that task runs fold into one
//! re-run per effect.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Something that runs deferred tasks later on the same thread.
pub trait TaskQueue {
    /// Schedule `task` to run after the current synchronous block.
    fn defer(&self, task: Task);
}

/// A first-in first-out queue drained explicitly by the host.
///
/// Clones share the same queue.
///
/// ```rust,ignore
/// let queue = MicrotaskQueue::new();
/// let rt = Runtime::new(queue.clone());
/// // ... writes ...
/// queue.run_until_idle();
/// ```
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run queued tasks until none remain, including tasks queued by the
    /// tasks themselves. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs so it may queue more work
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }
}

impl TaskQueue for MicrotaskQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}

/// Defers onto the current tokio `LocalSet`.
///
/// Tasks are spawned with [`tokio::task::spawn_local`], which panics when
/// called outside a `LocalSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSetQueue;

impl TaskQueue for LocalSetQueue {
    fn defer(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}
