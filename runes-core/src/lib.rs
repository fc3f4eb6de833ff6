//! Runes Core
//!
//! This crate provides the core of the Runes reactive UI toolkit. It
//! implements:
//!
//! - Reactive primitives (state cells, computed cells, effects)
//! - Coalesced, deferred effect scheduling on a host task queue
//! - In-place reconciliation of rendered trees
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: The runtime, its cells and effects, ordering barriers, the
//!   named signal registry and debug hooks
//! - `graph`: The dependency graph the runtime tracks reads in
//! - `render`: The host tree interface, the reconciler and components
//! - `config`: Runtime configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use runes_core::reactive::{MicrotaskQueue, Runtime};
//!
//! let queue = MicrotaskQueue::new();
//! let rt = Runtime::new(queue.clone());
//!
//! // Create a state cell
//! let count = rt.state(0);
//!
//! // Create a derived value
//! let doubled = rt.computed({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! rt.effect(move || println!("Doubled: {}", doubled.get()));
//!
//! // Update the state cell, then let the host drain its queue
//! count.set(5);
//! queue.run_until_idle();
//! // Effect runs once, prints: "Doubled: 10"
//! ```

pub mod config;
pub mod graph;
pub mod reactive;
pub mod render;

mod error;

pub use error::{Error, Result};
