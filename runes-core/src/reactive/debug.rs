//! Debug inspection hooks.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::effect::Disposer;
use super::runtime::Runtime;
use super::signal::Signal;

type Inspector<T> = Box<dyn FnMut(&[T])>;

/// Handle returned by [`Runtime::debug`].
///
/// Outside debug mode the hook is inert: no effect is registered and the
/// inspector never runs, but every method still works.
pub struct DebugHook<T> {
    inspector: Rc<RefCell<Inspector<T>>>,
    effect: Option<Disposer>,
}

impl<T: 'static> DebugHook<T> {
    /// Replace the inspector. Takes effect from the next change.
    pub fn with(self, inspector: impl FnMut(&[T]) + 'static) -> Self {
        *self.inspector.borrow_mut() = Box::new(inspector);
        self
    }

    /// Whether the hook is watching its cells.
    pub fn is_active(&self) -> bool {
        self.effect.as_ref().is_some_and(|e| !e.is_disposed())
    }

    /// Stop inspecting.
    pub fn dispose(&self) {
        if let Some(effect) = &self.effect {
            effect.dispose();
        }
    }
}

impl<T> Debug for DebugHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugHook")
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}

fn log_values<T: Debug>(values: &[T]) {
    tracing::debug!(target: "runes::inspect", ?values, "signal values");
}

impl Runtime {
    /// Inspect the values of `cells` every time any of them changes.
    ///
    /// The default inspector logs the values through `tracing` at debug
    /// level; replace it with [`DebugHook::with`]. Only functional when the
    /// runtime is in debug mode, checked once per call.
    pub fn debug<T, S, I>(&self, cells: I) -> DebugHook<T>
    where
        T: Debug + 'static,
        S: Signal<T> + 'static,
        I: IntoIterator<Item = S>,
    {
        let default: Inspector<T> = Box::new(log_values::<T>);
        let inspector = Rc::new(RefCell::new(default));
        if !self.is_debug() {
            return DebugHook {
                inspector,
                effect: None,
            };
        }

        let cells: Vec<S> = cells.into_iter().collect();
        let effect = {
            let inspector = inspector.clone();
            self.effect(move || {
                let values: Vec<T> = cells.iter().map(|cell| cell.get()).collect();
                match inspector.try_borrow_mut() {
                    Ok(mut inspect) => (&mut **inspect)(&values),
                    Err(_) => tracing::warn!("debug inspector re-entered; values dropped"),
                }
            })
        };

        DebugHook {
            inspector,
            effect: Some(effect),
        }
    }
}
