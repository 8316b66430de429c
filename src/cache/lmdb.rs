//! Persistent LMDB cache backend.
//!
//! Embedded, memory-mapped, crash-safe store for cache stages that should
//! survive process restarts (computed elevations and biome results are good
//! candidates; decoded raster buffers are not worth persisting). Values are
//! stored as JSON so any serde type fits the same database.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::KeyValueCache;

#[derive(Debug, Error)]
pub enum LmdbCacheError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LMDB-backed cache stage.
pub struct LmdbCache<V> {
    env: Arc<Env>,
    db: Database<Str, Bytes>,
    _value: PhantomData<fn() -> V>,
}

impl<V> LmdbCache<V> {
    /// Open (or create) the database under `path`, bounded to
    /// `max_size_bytes` of mapped storage. `name` separates cache stages
    /// sharing one directory.
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size_bytes: usize,
        name: &str,
    ) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_bytes)
                .max_dbs(8)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let db = env.create_database::<Str, Bytes>(&mut wtxn, Some(name))?;
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            db,
            _value: PhantomData,
        })
    }

    pub fn entry_count(&self) -> Result<u64, LmdbCacheError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db.len(&rtxn)?)
    }

    pub fn clear_all(&self) -> Result<(), LmdbCacheError> {
        let mut wtxn = self.env.write_txn()?;
        self.db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl<V> KeyValueCache<V> for LmdbCache<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let rtxn = match self.env.read_txn() {
            Ok(txn) => txn,
            Err(e) => {
                error!("failed to open LMDB read transaction: {e}");
                return None;
            }
        };

        match self.db.get(&rtxn, key) {
            Ok(Some(bytes)) => match serde_json::from_slice(bytes) {
                Ok(value) => {
                    debug!("LMDB hit for {key}");
                    Some(value)
                }
                Err(e) => {
                    warn!("failed to decode LMDB entry {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!("LMDB get error for {key}: {e}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: V) {
        let bytes = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode LMDB entry {key}: {e}");
                return;
            }
        };

        let result = self.env.write_txn().and_then(|mut wtxn| {
            self.db.put(&mut wtxn, key, &bytes)?;
            wtxn.commit()
        });
        if let Err(e) = result {
            warn!("LMDB set failed for {key}: {e}");
        }
    }
}
