//! Tracking Context
//!
//! The tracking context records which evaluation is currently running so
//! that reads can register the reader as a dependent.
//!
//! # Implementation
//!
//! Each runtime owns a stack of frames. Evaluating a computed cell or an
//! effect pushes a `Tracking` frame; `untrack` pushes an `Untracked` frame that
//! hides the enclosing evaluation. Only the top frame is consulted, so nested
//! evaluations (a computed read inside an effect) track into themselves.

use std::cell::RefCell;

use crate::graph::NodeId;

/// An entry in the tracking stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Reads register the given node as a dependent.
    Tracking(NodeId),
    /// Reads register nothing.
    Untracked,
}

#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: RefCell<Vec<Frame>>,
}

impl ContextStack {
    /// Push a frame. It is popped when the returned guard drops, including
    /// during unwinding.
    pub(crate) fn enter(&self, frame: Frame) -> FrameGuard<'_> {
        self.frames.borrow_mut().push(frame);
        FrameGuard { stack: self, frame }
    }

    /// The node that reads should currently be attributed to.
    pub(crate) fn current_subscriber(&self) -> Option<NodeId> {
        match self.frames.borrow().last() {
            Some(Frame::Tracking(id)) => Some(*id),
            Some(Frame::Untracked) | None => None,
        }
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.current_subscriber().is_some()
    }

    /// Whether `id` is being evaluated anywhere on the stack.
    pub(crate) fn is_evaluating(&self, id: NodeId) -> bool {
        self.frames.borrow().contains(&Frame::Tracking(id))
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Pops its frame when dropped.
pub(crate) struct FrameGuard<'a> {
    stack: &'a ContextStack,
    frame: Frame,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.frames.borrow_mut().pop();
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "tracking frames must be released in reverse order"
        );
    }
}
