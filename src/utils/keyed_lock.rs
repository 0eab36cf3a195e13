use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async mutex map.
///
/// Serializes all mutation paths for one logical key, e.g. one
/// (employee, date) attendance record or one employee's leave ledger.
/// Lock entries are created on demand and kept for the life of the process;
/// the key space (employees x recent dates) is small.
pub struct KeyedLock<K> {
    inner: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().await;
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serializes_same_key() {
        let lock = Arc::new(KeyedLock::new());
        let counter = Arc::new(Mutex::new(0i32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _g = lock.acquire("k").await;
                let mut c = counter.lock().await;
                *c += 1;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*counter.lock().await, 8);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let lock = KeyedLock::new();
        let _a = lock.acquire(1u64).await;
        // Would deadlock if keys shared a mutex.
        let _b = lock.acquire(2u64).await;
    }
}
