use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type InFlight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

enum Slot<V, E> {
    Ready(V),
    Pending(InFlight<V, E>),
}

/// Observable state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Constructing,
    Ready,
}

/// Process-scoped map whose values are built at most once per key at a time.
///
/// Concurrent callers for the same missing key await one shared construction
/// and all observe its outcome. On success the value is cached; on failure
/// the slot is cleared so the next call starts over. Different keys never
/// wait on each other: the shard lock is only held to read or swap a slot.
pub struct SingleFlight<K, V, E> {
    slots: Arc<DashMap<K, Slot<V, E>>>,
    constructions: Arc<AtomicUsize>,
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            constructions: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `make` (once, shared) to build it.
    ///
    /// `make` is called with the key's shard locked; it must only create the
    /// future, never touch this map itself.
    pub async fn get_or_try_init<F, Fut>(&self, key: K, make: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let in_flight = match self.slots.entry(key.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::Pending(fut) => fut.clone(),
            },
            Entry::Vacant(vacant) => {
                self.constructions.fetch_add(1, Ordering::Relaxed);
                let slots = Arc::clone(&self.slots);
                let build = make();
                let fut: BoxFuture<'static, Result<V, E>> = Box::pin(async move {
                    let result = build.await;
                    // Publish before any waiter is woken with the result.
                    match &result {
                        Ok(value) => {
                            slots.insert(key, Slot::Ready(value.clone()));
                        }
                        Err(_) => {
                            slots.remove(&key);
                        }
                    }
                    result
                });
                let shared = fut.shared();
                vacant.insert(Slot::Pending(shared.clone()));
                shared
            }
        };
        in_flight.await
    }

    /// Cached value for `key`, without constructing or waiting.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.slots.get(key)?.value() {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending(_) => None,
        }
    }

    pub fn state(&self, key: &K) -> Option<SlotState> {
        self.slots.get(key).map(|slot| match slot.value() {
            Slot::Ready(_) => SlotState::Ready,
            Slot::Pending(_) => SlotState::Constructing,
        })
    }

    /// Number of keys with a ready value.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Constructions started since creation, successful or not.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::Relaxed)
    }
}
