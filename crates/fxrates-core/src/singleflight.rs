//! Coalescing of duplicate concurrent operations for the same key.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

/// Deduplicates concurrent calls per key: the first caller runs the
/// operation, everyone arriving while it is in flight waits on the same
/// cell and receives a clone of the outcome (success or failure alike).
/// The cell is dropped once resolved, so later calls run fresh.
pub struct SingleFlight<K, V> {
    inflight: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run<F, Fut>(&self, key: K, op: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut inflight = self
                .inflight
                .lock()
                .expect("single-flight mutex poisoned");
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let value = cell.get_or_init(op).await.clone();

        let mut inflight = self
            .inflight
            .lock()
            .expect("single-flight mutex poisoned");
        if let Some(current) = inflight.get(&key) {
            if Arc::ptr_eq(current, &cell) {
                inflight.remove(&key);
            }
        }

        value
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .expect("single-flight mutex poisoned")
            .len()
    }
}
