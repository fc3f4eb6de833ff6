//! Reactive Primitives
//!
//! This module implements the core reactive system: state cells, computed
//! cells and effects, all owned by a [`Runtime`].
//!
//! # Concepts
//!
//! ## State
//!
//! A [`State`] is a container for mutable data. When a state cell is read
//! within a tracking context (a computed recompute or an effect run), the
//! reader is registered as a dependent. Every write invalidates all
//! dependents, even if the new value equals the old one.
//!
//! ## Computed
//!
//! A [`Computed`] is a derived value that caches its result. It is lazy:
//! invalidation only marks it dirty, and the callback runs again on the next
//! read.
//!
//! ## Effects
//!
//! An effect is a side-effecting computation that re-runs whenever its
//! dependencies change. Re-runs are coalesced: any number of writes before the
//! next flush produce a single run that sees the final values. Flushes are
//! deferred onto a host [`TaskQueue`].
//!
//! # Implementation Notes
//!
//! Dependencies are detected automatically. Each runtime keeps a stack of
//! tracking frames; a read consults the top frame and, if it names an
//! evaluation, records an edge in the dependency graph. `untrack` pushes a
//! frame that records nothing.
//!
//! | Operation         | Method                                    |
//! |-------------------|-------------------------------------------|
//! | create            | [`Runtime::state`]                        |
//! | derive            | [`Runtime::computed`]                     |
//! | effect            | [`Runtime::effect`]                       |
//! | ignore            | [`Runtime::untrack`], `get_untracked`     |
//! | debug             | [`Runtime::debug`]                        |

mod barrier;
mod context;
mod debug;
mod effect;
mod memo;
mod queue;
mod registry;
mod runtime;
mod signal;

pub use barrier::BarrierGuard;
pub use debug::DebugHook;
pub use effect::{Cleanup, Disposer, EffectOutput};
pub use memo::Computed;
pub use queue::{LocalSetQueue, MicrotaskQueue, Task, TaskQueue};
pub use registry::SignalRegistry;
pub use runtime::Runtime;
pub use signal::{Signal, State};
