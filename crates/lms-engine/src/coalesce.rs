//! Request coalescing.
//!
//! Concurrent callers asking for the same key share one computation: the
//! first caller runs it, everyone arriving before it finishes waits on a
//! broadcast channel and receives a clone of the same value. Errors travel
//! inside the value, so all waiters also observe the same failure.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::broadcast;

use crate::metrics;

/// Pending computations keyed by request key.
///
/// The mutex is only held for insert-if-absent and remove-and-publish, never
/// across an await.
pub struct InFlightRegistry<K, V> {
    kind: &'static str,
    pending: Mutex<HashMap<K, broadcast::Sender<V>>>,
}

impl<K, V> fmt::Debug for InFlightRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<K, V> InFlightRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<K, broadcast::Sender<V>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of keys with a computation in progress
    pub fn in_flight(&self) -> usize {
        self.pending().len()
    }

    /// Run `compute` for `key`, or wait for the run already in progress.
    pub async fn coalesce<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        loop {
            let waiting = {
                let mut pending = self.pending();
                match pending.get(&key) {
                    Some(sender) => Some(sender.subscribe()),
                    None => {
                        let (sender, _) = broadcast::channel(1);
                        pending.insert(key.clone(), sender);
                        None
                    }
                }
            };

            let Some(mut receiver) = waiting else {
                break;
            };

            metrics::record_coalesced(self.kind);
            match receiver.recv().await {
                Ok(value) => return value,
                // The leading caller was cancelled before publishing; try again
                Err(_) => continue,
            }
        }

        let leader = Leader {
            registry: self,
            key: Some(key),
        };
        let value = compute().await;
        leader.publish(value.clone());
        value
    }
}

/// Registration of the caller running the computation.
///
/// Dropping it without publishing (cancellation) removes the registration,
/// which closes the channel and wakes the waiters.
struct Leader<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    registry: &'a InFlightRegistry<K, V>,
    key: Option<K>,
}

impl<K, V> Leader<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn publish(mut self, value: V) {
        if let Some(key) = self.key.take() {
            // Removal and delivery happen under the same lock, so no new caller
            // can subscribe to a channel that will never be written again.
            let mut pending = self.registry.pending();
            if let Some(sender) = pending.remove(&key) {
                // No receivers is fine: nobody was waiting
                let _ = sender.send(value);
            }
        }
    }
}

impl<K, V> Drop for Leader<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.pending().remove(&key);
        }
    }
}
