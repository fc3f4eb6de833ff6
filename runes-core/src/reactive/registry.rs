//! Named Signal Registry
//!
//! A registry maps identifier keys to lazily created state cells, so an owner
//! can expose its signals by name without reflection. Each key is declared
//! once with a factory and a fixed value type; the cell is built on first
//! access.
//!
//! # Creation Order
//!
//! Factories run inside an ordering barrier. A factory that registers effects
//! observing other keys of the same registry therefore never sees a half-built
//! registry: those effects first run after the factory has returned and the
//! new cell has been cached.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::runtime::Runtime;
use super::signal::State;
use crate::error::{Error, Result};

/// Marks a key as referring to the signal itself rather than its value.
const RESERVED_PREFIX: char = '$';

type Factory = Box<dyn Fn(&SignalRegistry) -> Rc<dyn Any>>;

struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    factory: Factory,
}

/// Typed mapping from names to state cells.
pub struct SignalRegistry {
    runtime: Runtime,
    slots: IndexMap<String, Slot>,
    cells: RefCell<IndexMap<String, Rc<dyn Any>>>,
}

impl SignalRegistry {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            runtime: runtime.clone(),
            slots: IndexMap::new(),
            cells: RefCell::new(IndexMap::new()),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Declare `key` with a factory that builds its cell on first access.
    ///
    /// The factory receives the registry, so it can read other keys or
    /// register effects on them.
    pub fn declare<T, F>(&mut self, key: &str, factory: F) -> Result<&mut Self>
    where
        T: 'static,
        F: Fn(&SignalRegistry) -> State<T> + 'static,
    {
        validate_key(key)?;
        if self.slots.contains_key(key) {
            return Err(Error::DuplicateKey(key.to_owned()));
        }

        self.slots.insert(
            key.to_owned(),
            Slot {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                factory: Box::new(move |registry: &SignalRegistry| {
                    Rc::new(factory(registry)) as Rc<dyn Any>
                }),
            },
        );
        Ok(self)
    }

    /// Declare `key` with a plain initial value.
    pub fn declare_value<T: Clone + 'static>(&mut self, key: &str, value: T) -> Result<&mut Self> {
        self.declare(key, move |registry| registry.runtime.state(value.clone()))
    }

    /// The cell behind `key`, creating it if this is the first access.
    pub fn state<T: 'static>(&self, key: &str) -> Result<State<T>> {
        validate_key(key)?;
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| Error::UnknownKey(key.to_owned()))?;
        if slot.type_id != TypeId::of::<T>() {
            return Err(mismatch::<T>(key, slot.type_name));
        }

        let cached = self.cells.borrow().get(key).cloned();
        let cell = match cached {
            Some(cell) => cell,
            None => {
                let barrier = self.runtime.barrier();
                let cell = (slot.factory)(self);
                tracing::debug!(key, deferred = barrier.deferred_effects(), "signal created");
                self.cells.borrow_mut().insert(key.to_owned(), cell.clone());
                drop(barrier);
                cell
            }
        };

        cell.downcast_ref::<State<T>>()
            .cloned()
            .ok_or_else(|| mismatch::<T>(key, slot.type_name))
    }

    /// Read `key`, recording a dependency.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Result<T> {
        Ok(self.state::<T>(key)?.get())
    }

    /// Read `key` without recording a dependency.
    pub fn get_untracked<T: Clone + 'static>(&self, key: &str) -> Result<T> {
        Ok(self.state::<T>(key)?.get_untracked())
    }

    pub fn set<T: 'static>(&self, key: &str, value: T) -> Result<()> {
        self.state::<T>(key)?.set(value);
        Ok(())
    }

    pub fn update<T: 'static>(&self, key: &str, f: impl FnOnce(&mut T)) -> Result<()> {
        self.state::<T>(key)?.update(f);
        Ok(())
    }

    /// Whether `key` has been declared.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Whether the cell behind `key` has been created yet.
    pub fn is_created(&self, key: &str) -> bool {
        self.cells.borrow().contains_key(key)
    }

    /// Declared keys, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

impl fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: IndexMap<&str, &str> = self
            .slots
            .iter()
            .map(|(key, slot)| (key.as_str(), slot.type_name))
            .collect();
        f.debug_struct("SignalRegistry")
            .field("slots", &types)
            .field("created", &self.cells.try_borrow().map(|c| c.len()).ok())
            .finish()
    }
}

fn mismatch<T>(key: &str, actual: &'static str) -> Error {
    Error::TypeMismatch {
        key: key.to_owned(),
        requested: type_name::<T>(),
        actual,
    }
}

/// Keys are identifiers: non-empty, ASCII alphanumeric or `_`, not starting
/// with a digit.
///
/// This is stricter than plain string keys: names such as `my-key` or
/// `with space` are rejected on purpose so every key can also be used as a
/// Rust field or method name by owners that expose their signals statically.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidKey {
            key: key.to_owned(),
            reason,
        })
    };

    let Some(first) = key.chars().next() else {
        return invalid("key is empty");
    };
    if first == RESERVED_PREFIX {
        return invalid("the `$` prefix is reserved");
    }
    if first.is_ascii_digit() {
        return invalid("key starts with a digit");
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid("key contains characters other than ASCII letters, digits and `_`");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::MicrotaskQueue;
    use std::cell::Cell;

    fn runtime() -> (Runtime, MicrotaskQueue) {
        let queue = MicrotaskQueue::new();
        (Runtime::new(queue.clone()), queue)
    }

    #[test]
    fn cells_are_created_lazily_and_cached() {
        let (rt, _queue) = runtime();
        let builds = Rc::new(Cell::new(0));

        let mut registry = SignalRegistry::new(&rt);
        let counter = builds.clone();
        registry
            .declare("count", move |registry| {
                counter.set(counter.get() + 1);
                registry.runtime().state(0)
            })
            .unwrap();

        assert!(!registry.is_created("count"));
        assert_eq!(builds.get(), 0);

        registry.set("count", 5).unwrap();
        assert_eq!(registry.get::<i32>("count").unwrap(), 5);
        assert_eq!(builds.get(), 1);

        let a = registry.state::<i32>("count").unwrap();
        let b = registry.state::<i32>("count").unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn rejects_invalid_keys() {
        let (rt, _queue) = runtime();
        let mut registry = SignalRegistry::new(&rt);

        for key in ["", "$count", "1st", "with space", "my-key"] {
            assert!(
                matches!(registry.declare_value(key, 0), Err(Error::InvalidKey { .. })),
                "{key:?} should be rejected"
            );
        }
        assert!(matches!(
            registry.get::<i32>("$count"),
            Err(Error::InvalidKey { .. })
        ));
        assert!(registry.declare_value("_private2", 0).is_ok());
    }

    #[test]
    fn unknown_duplicate_and_mistyped_keys() {
        let (rt, _queue) = runtime();
        let mut registry = SignalRegistry::new(&rt);
        registry.declare_value("name", String::from("runes")).unwrap();

        assert_eq!(
            registry.get::<i32>("missing"),
            Err(Error::UnknownKey("missing".into()))
        );
        assert_eq!(
            registry.declare_value("name", String::new()).err(),
            Some(Error::DuplicateKey("name".into()))
        );
        assert!(matches!(
            registry.get::<i32>("name"),
            Err(Error::TypeMismatch { actual, .. }) if actual.contains("String")
        ));
    }

    #[test]
    fn untracked_access_does_not_subscribe() {
        let (rt, queue) = runtime();
        let mut registry = SignalRegistry::new(&rt);
        registry.declare_value("a", 1).unwrap().declare_value("b", 2).unwrap();
        let registry = Rc::new(registry);
        let runs = Rc::new(Cell::new(0));

        let (reader, counter) = (registry.clone(), runs.clone());
        let _effect = rt.effect(move || {
            reader.get::<i32>("a").unwrap();
            reader.get_untracked::<i32>("b").unwrap();
            counter.set(counter.get() + 1);
        });

        registry.set("b", 20).unwrap();
        queue.run_until_idle();
        assert_eq!(runs.get(), 1);

        registry.update::<i32>("a", |a| *a += 1).unwrap();
        queue.run_until_idle();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn factory_effects_see_the_finished_registry() {
        let (rt, queue) = runtime();
        let seen = Rc::new(Cell::new(None));

        let mut registry = SignalRegistry::new(&rt);
        registry.declare_value("base", 10).unwrap();
        let out = seen.clone();
        registry
            .declare("mirror", move |registry| {
                let mirror = registry.runtime().state(0);
                let base = registry.state::<i32>("base").unwrap();
                let (target, out) = (mirror.clone(), out.clone());
                registry.runtime().effect(move || {
                    target.set(base.get());
                    out.set(Some(base.get()));
                });
                mirror
            })
            .unwrap();

        let mirror = registry.state::<i32>("mirror").unwrap();
        // The effect was held back until the cell was cached
        assert_eq!(seen.get(), None);
        assert!(!rt.has_barrier());

        queue.run_until_idle();
        assert_eq!(seen.get(), Some(10));
        assert_eq!(mirror.get(), 10);
    }

    #[test]
    fn keys_keep_declaration_order() {
        let (rt, _queue) = runtime();
        let mut registry = SignalRegistry::new(&rt);
        registry
            .declare_value("render", ())
            .unwrap()
            .declare_value("styles", String::new())
            .unwrap();

        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["render", "styles"]);
        assert!(registry.contains("styles"));
        assert!(!registry.contains("missing"));
    }
}
