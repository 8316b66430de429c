//! Deterministic world sampling for a persistent geohash-gridded world.
//!
//! The world surface is a base-32 geohash grid. Terrain comes from raster
//! tiles published as PNGs; elevation at any address is sampled from the
//! tile raster, and biomes are drawn from seeded per-region probability
//! tables layered on top of the elevation. Everything is a pure function of
//! the [`WorldSeed`](seed::WorldSeed) and the address, so any number of
//! server processes agree on the world without coordination.
//!
//! [`WorldEngine`](engine::WorldEngine) is the main entry point; the
//! individual modules are public for hosts that want to compose the pieces
//! themselves.

pub mod biome;
pub mod cache;
pub mod engine;
pub mod errors;
pub mod geohash;
pub mod location;
pub mod logging;
pub mod raster;
pub mod rng;
pub mod seed;
pub mod topology;

pub use biome::{BedrockResolver, BiomeParameters, BiomeResult, BiomeType, DungeonBiomeResolver};
pub use cache::{BiomeCaches, CacheHandle, KeyValueCache, LmdbCache, MemoryCache, TopologyCaches};
pub use engine::{BiomeOptions, ElevationOptions, WorldEngine, WorldEngineBuilder};
pub use errors::WorldError;
pub use geohash::{Geohash, TopologyTile};
pub use location::LocationType;
pub use raster::{HttpRasterFetcher, RasterBuffer, RasterFetcher, RasterStore};
pub use seed::WorldSeed;
pub use topology::{GradingEntry, LandGrading, TopologySample};
