//! In-memory LRU cache backend.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use super::KeyValueCache;

/// Bounded in-process cache. The lock is held only for the map operation
/// itself, never across an await point.
pub struct MemoryCache<V> {
    inner: Mutex<LruCache<String, V>>,
}

impl<V> MemoryCache<V> {
    /// `capacity` is clamped up to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[async_trait]
impl<V> KeyValueCache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    async fn set(&self, key: &str, value: V) {
        self.inner.lock().put(key.to_string(), value);
    }
}
