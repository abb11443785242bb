//! Compute-once caches, parameterised by a concurrency strategy.
//!
//! The shape, rule-reachability and program caches all go through
//! [`OnceMap`]. The strategy picks the implementation:
//!
//! * [`ThreadSafe`] publishes each value at most once. The first caller for a
//!   key runs the initializer while later callers for the same key block on
//!   the cell and observe the published value.
//! * [`SingleWriter`] uses a plain `RefCell<HashMap>`. It is `!Sync`, so a
//!   validator built with it cannot be shared across threads at all.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::compiler::ProgramPair;
use crate::shape::TypeShape;

/// A map whose values are computed at most once per key (on success).
///
/// A failed initializer publishes nothing; the next caller retries.
pub trait OnceMap<K, V>: Default {
    fn get_or_try_init<E>(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E>;

    fn get(&self, key: &K) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Publish-once concurrent map.
pub struct SyncOnceMap<K, V> {
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K: Eq + Hash, V> Default for SyncOnceMap<K, V> {
    fn default() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> OnceMap<K, V> for SyncOnceMap<K, V> {
    fn get_or_try_init<E>(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        // Clone the cell out so the shard lock is released before `init` runs;
        // the initializer may re-enter the map for other keys.
        let cell = self.cells.entry(key).or_default().clone();
        cell.get_or_try_init(init).cloned()
    }

    fn get(&self, key: &K) -> Option<V> {
        let cell = self.cells.get(key)?.clone();
        cell.get().cloned()
    }

    fn len(&self) -> usize {
        self.cells.iter().filter(|entry| entry.value().get().is_some()).count()
    }
}

/// Non-locking map for single-writer use.
pub struct LocalOnceMap<K, V> {
    values: RefCell<HashMap<K, V>>,
}

impl<K, V> Default for LocalOnceMap<K, V> {
    fn default() -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> OnceMap<K, V> for LocalOnceMap<K, V> {
    fn get_or_try_init<E>(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(value) = self.values.borrow().get(&key) {
            return Ok(value.clone());
        }
        // No borrow is held across `init`, which may re-enter for other keys.
        let value = init()?;
        Ok(self.values.borrow_mut().entry(key).or_insert(value).clone())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.values.borrow().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.values.borrow().len()
    }
}

/// Selects the cache implementations used by a [`crate::Validator`].
pub trait CacheStrategy: 'static {
    type ShapeCache: OnceMap<TypeId, Arc<TypeShape>>;
    /// Whether any rule is reachable from a type.
    type ReachCache: OnceMap<TypeId, bool>;
    type ProgramCache: OnceMap<TypeId, Arc<ProgramPair>>;
}

/// Lock-once publication; the validator is `Send + Sync`.
#[derive(Debug, Clone, Copy)]
pub enum ThreadSafe {}

impl CacheStrategy for ThreadSafe {
    type ShapeCache = SyncOnceMap<TypeId, Arc<TypeShape>>;
    type ReachCache = SyncOnceMap<TypeId, bool>;
    type ProgramCache = SyncOnceMap<TypeId, Arc<ProgramPair>>;
}

/// The caller promises never to trigger concurrent first use of a type.
#[derive(Debug, Clone, Copy)]
pub enum SingleWriter {}

impl CacheStrategy for SingleWriter {
    type ShapeCache = LocalOnceMap<TypeId, Arc<TypeShape>>;
    type ReachCache = LocalOnceMap<TypeId, bool>;
    type ProgramCache = LocalOnceMap<TypeId, Arc<ProgramPair>>;
}
