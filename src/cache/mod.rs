//! Pluggable cache chain.
//!
//! Every cache the engine touches is an externally supplied, independently
//! optional keyed async store. The engine checks stages from cheapest to
//! most expensive to bypass (computed result, decoded buffer, raw response)
//! and treats an absent handle as an always-miss store whose `set` is a
//! no-op. Two backends ship with the crate: [`MemoryCache`] (LRU, in
//! process) and [`LmdbCache`] (embedded persistent store); hosts may supply
//! anything else that implements [`KeyValueCache`].

pub mod lmdb;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use lmdb::LmdbCache;
pub use memory::MemoryCache;

use crate::biome::{BiomeParameters, BiomeResult};
use crate::raster::RasterBuffer;

/// A keyed async store. Both operations are infallible from the engine's
/// point of view: a backend failure surfaces as a miss (`get`) or is
/// dropped (`set`) — caches fail open, they never fail a sampling call.
#[async_trait]
pub trait KeyValueCache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V>;
    async fn set(&self, key: &str, value: V);
}

/// Shared handle to one cache stage.
pub type CacheHandle<V> = Arc<dyn KeyValueCache<V>>;

pub(crate) async fn cache_get<V>(cache: &Option<CacheHandle<V>>, key: &str) -> Option<V>
where
    V: Clone + Send + Sync + 'static,
{
    match cache {
        Some(cache) => cache.get(key).await,
        None => None,
    }
}

pub(crate) async fn cache_set<V>(cache: &Option<CacheHandle<V>>, key: &str, value: V)
where
    V: Clone + Send + Sync + 'static,
{
    if let Some(cache) = cache {
        cache.set(key, value).await;
    }
}

/// Cache handles for topology sampling: raw PNG response bytes per tile
/// URL, decoded raster per tile URL, and computed elevation per
/// `{location}-{address}` key.
#[derive(Clone, Default)]
pub struct TopologyCaches {
    pub response: Option<CacheHandle<Vec<u8>>>,
    pub buffer: Option<CacheHandle<Arc<RasterBuffer>>>,
    pub result: Option<CacheHandle<u8>>,
}

/// Cache handles for biome classification. Topology handles are nested
/// because classification samples elevation on the way.
#[derive(Clone, Default)]
pub struct BiomeCaches {
    pub topology: TopologyCaches,
    /// Computed biome per `{address}-{location}` key.
    pub result: Option<CacheHandle<BiomeResult>>,
    /// Derived biome parameters per city-precision region key.
    pub parameters: Option<CacheHandle<BiomeParameters>>,
}
