//! Terrain raster fetch and decode.
//!
//! Topology is published as one lossless PNG per 2-character tile key at
//! `{base}/{key}.png`; the first 8-bit channel of each pixel directly
//! encodes elevation 0-255. [`RasterStore`] resolves a tile URL to a
//! decoded [`RasterBuffer`] through the response/buffer cache stages,
//! hitting the network only when both miss.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{cache_get, cache_set, TopologyCaches};
use crate::errors::WorldError;

/// Decoded single-channel pixel grid for one tile. Never mutated after
/// decode; shared read-only through the buffer cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    /// Row-major intensity channel, `width * height` bytes.
    pub data: Vec<u8>,
}

impl RasterBuffer {
    /// Decode PNG bytes, keeping the first channel of each pixel as the
    /// intensity value. `url` is only used for error context.
    pub fn from_png_bytes(url: &str, bytes: &[u8]) -> Result<Self, WorldError> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|e| WorldError::raster_unavailable(url, format!("PNG decode failed: {e}")))?;
        let rgba = image.into_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let data = rgba.into_raw().into_iter().step_by(4).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer directly from an intensity grid.
    pub fn from_intensities(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Intensity at a pixel. Callers are responsible for bounds.
    pub fn intensity(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }
}

/// Capability interface over the raster transport. The production
/// implementation is HTTP; tests substitute counting or in-memory doubles.
#[async_trait]
pub trait RasterFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, WorldError>;
}

/// HTTP fetcher. No internal retries or timeouts; a failed or slow fetch
/// surfaces to the caller, who owns retry policy.
pub struct HttpRasterFetcher {
    client: reqwest::Client,
}

impl HttpRasterFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRasterFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterFetcher for HttpRasterFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, WorldError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WorldError::raster_unavailable(url, format!("fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorldError::raster_unavailable(
                url,
                format!("unexpected status {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WorldError::raster_unavailable(url, format!("body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Resolves tile URLs to decoded rasters through the cache chain.
pub struct RasterStore {
    base_url: String,
    fetcher: Arc<dyn RasterFetcher>,
}

impl RasterStore {
    pub fn new(base_url: impl Into<String>, fetcher: Arc<dyn RasterFetcher>) -> Self {
        Self {
            base_url: base_url.into(),
            fetcher,
        }
    }

    /// Content URL for a 2-character tile key.
    pub fn tile_url(&self, key: &str) -> String {
        format!("{}/{}.png", self.base_url.trim_end_matches('/'), key)
    }

    /// Resolve a tile URL to its decoded raster.
    ///
    /// Stage order: buffer cache (skips decode), response cache (skips
    /// network), network fetch (populates the response cache with an
    /// independent copy of the body). Decode failures propagate; no partial
    /// buffer is ever cached.
    pub async fn buffer_for(
        &self,
        url: &str,
        caches: &TopologyCaches,
    ) -> Result<Arc<RasterBuffer>, WorldError> {
        if let Some(buffer) = cache_get(&caches.buffer, url).await {
            debug!("buffer cache hit for {url}");
            return Ok(buffer);
        }

        let bytes = match cache_get(&caches.response, url).await {
            Some(bytes) => {
                debug!("response cache hit for {url}");
                bytes
            }
            None => {
                debug!("fetching raster {url}");
                let bytes = self.fetcher.fetch(url).await?;
                cache_set(&caches.response, url, bytes.clone()).await;
                bytes
            }
        };

        let buffer = Arc::new(RasterBuffer::from_png_bytes(url, &bytes)?);
        cache_set(&caches.buffer, url, Arc::clone(&buffer)).await;
        Ok(buffer)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::cache::{CacheHandle, MemoryCache};

    #[test]
    fn test_decode_constant_png() {
        let bytes = constant_png(16, 8, 128);
        let buffer = RasterBuffer::from_png_bytes("mem://w2.png", &bytes).unwrap();
        assert_eq!(buffer.width, 16);
        assert_eq!(buffer.height, 8);
        assert!(buffer.data.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let err = RasterBuffer::from_png_bytes("mem://w2.png", b"not a png").unwrap_err();
        assert!(matches!(err, WorldError::RasterUnavailable { .. }));
    }

    #[test]
    fn test_tile_url() {
        let store = RasterStore::new(
            "https://assets.example.com/topology/",
            Arc::new(FailingFetcher),
        );
        assert_eq!(
            store.tile_url("w2"),
            "https://assets.example.com/topology/w2.png"
        );
    }

    #[tokio::test]
    async fn test_buffer_cache_skips_fetch_and_decode() {
        let fetcher = Arc::new(CountingFetcher::new(constant_png(8, 4, 10)));
        let store = RasterStore::new("mem://topology", fetcher.clone());
        let buffer: CacheHandle<Arc<RasterBuffer>> = Arc::new(MemoryCache::new(4));
        let caches = TopologyCaches {
            buffer: Some(buffer),
            ..Default::default()
        };

        let url = store.tile_url("w2");
        let first = store.buffer_for(&url, &caches).await.unwrap();
        let second = store.buffer_for(&url, &caches).await.unwrap();
        assert_eq!(fetcher.call_count(), 1, "second call must not refetch");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_response_cache_skips_fetch_only() {
        let fetcher = Arc::new(CountingFetcher::new(constant_png(8, 4, 10)));
        let store = RasterStore::new("mem://topology", fetcher.clone());
        let response: CacheHandle<Vec<u8>> = Arc::new(MemoryCache::new(4));
        let caches = TopologyCaches {
            response: Some(response),
            ..Default::default()
        };

        let url = store.tile_url("w2");
        store.buffer_for(&url, &caches).await.unwrap();
        store.buffer_for(&url, &caches).await.unwrap();
        assert_eq!(
            fetcher.call_count(),
            1,
            "response cache should satisfy the second call"
        );
    }

    #[tokio::test]
    async fn test_no_caches_fetches_each_time() {
        let fetcher = Arc::new(CountingFetcher::new(constant_png(8, 4, 10)));
        let store = RasterStore::new("mem://topology", fetcher.clone());
        let caches = TopologyCaches::default();

        let url = store.tile_url("w2");
        store.buffer_for(&url, &caches).await.unwrap();
        store.buffer_for(&url, &caches).await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_and_nothing_cached() {
        let store = RasterStore::new("mem://topology", Arc::new(FailingFetcher));
        let buffer_cache = Arc::new(MemoryCache::<Arc<RasterBuffer>>::new(4));
        let handle: CacheHandle<Arc<RasterBuffer>> = buffer_cache.clone();
        let caches = TopologyCaches {
            buffer: Some(handle),
            ..Default::default()
        };

        let url = store.tile_url("w2");
        let err = store.buffer_for(&url, &caches).await.unwrap_err();
        assert!(matches!(err, WorldError::RasterUnavailable { .. }));
        assert!(buffer_cache.is_empty(), "no partial buffer may be cached");
    }

    #[tokio::test]
    async fn test_corrupt_response_not_cached_as_buffer() {
        let fetcher = Arc::new(CountingFetcher::new(b"corrupt".to_vec()));
        let store = RasterStore::new("mem://topology", fetcher);
        let buffer_cache = Arc::new(MemoryCache::<Arc<RasterBuffer>>::new(4));
        let handle: CacheHandle<Arc<RasterBuffer>> = buffer_cache.clone();
        let caches = TopologyCaches {
            buffer: Some(handle),
            ..Default::default()
        };

        let url = store.tile_url("w2");
        let err = store.buffer_for(&url, &caches).await.unwrap_err();
        assert!(matches!(err, WorldError::RasterUnavailable { .. }));
        assert!(buffer_cache.is_empty());
    }
}
