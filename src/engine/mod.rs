//! Engine facade.
//!
//! [`WorldEngine`] binds a world seed, a raster store and a dungeon
//! resolver into one sampling surface. All cache handles stay caller-owned
//! and are passed per call, so one engine can serve request paths with
//! different cache policies (or none).

use std::sync::Arc;

use crate::biome::{
    self, BedrockResolver, BiomeParameters, BiomeResult, DungeonBiomeResolver,
};
use crate::cache::{BiomeCaches, TopologyCaches};
use crate::errors::WorldError;
use crate::geohash::Geohash;
use crate::location::LocationType;
use crate::raster::{HttpRasterFetcher, RasterFetcher, RasterStore};
use crate::seed::WorldSeed;
use crate::topology::{self, LandGrading, TopologySample};

/// Published topology tiles for the stock world.
pub const DEFAULT_TOPOLOGY_URL: &str = "https://assets.yggdrasil.world/topology";

/// Per-call options for elevation sampling.
#[derive(Clone, Default)]
pub struct ElevationOptions {
    pub caches: TopologyCaches,
    /// Manual overrides; takes precedence over every cache stage.
    pub land_grading: Option<Arc<LandGrading>>,
}

/// Per-call options for biome classification.
#[derive(Clone, Default)]
pub struct BiomeOptions {
    pub caches: BiomeCaches,
}

pub struct WorldEngine {
    seed: Arc<WorldSeed>,
    store: RasterStore,
    dungeon: Arc<dyn DungeonBiomeResolver>,
}

impl WorldEngine {
    pub fn builder() -> WorldEngineBuilder {
        WorldEngineBuilder::default()
    }

    pub fn seed(&self) -> &WorldSeed {
        &self.seed
    }

    /// Elevation in `[0, 255]` at an address.
    pub async fn elevation_at(
        &self,
        address: &Geohash,
        location: LocationType,
        options: &ElevationOptions,
    ) -> Result<u8, WorldError> {
        topology::elevation_at(
            &self.store,
            address,
            location,
            &options.caches,
            options.land_grading.as_deref(),
        )
        .await
    }

    /// Biome and intensity at an address.
    pub async fn biome_at(
        &self,
        address: &Geohash,
        location: LocationType,
        options: &BiomeOptions,
    ) -> Result<BiomeResult, WorldError> {
        biome::biome_at(
            &self.seed,
            &self.store,
            self.dungeon.as_ref(),
            address,
            location,
            &options.caches,
        )
        .await
    }

    /// Raw topology sample (intensity plus raster and tile context) at a
    /// surface address. Useful for tooling that renders or debugs terrain.
    pub async fn topology_at(
        &self,
        address: &Geohash,
        caches: &TopologyCaches,
    ) -> Result<TopologySample, WorldError> {
        topology::topology_at(&self.store, address, caches).await
    }

    /// Biome weight table for the city-precision region containing
    /// `address`.
    pub async fn region_parameters(
        &self,
        address: &Geohash,
        options: &BiomeOptions,
    ) -> Result<BiomeParameters, WorldError> {
        let city = address.prefix(self.seed.spatial.city.precision);
        biome::region_parameters(&self.seed, city, &options.caches.parameters).await
    }
}

/// Builder with stock-world defaults: the default seed, HTTP raster
/// transport against [`DEFAULT_TOPOLOGY_URL`], and solid rock below the
/// surface.
pub struct WorldEngineBuilder {
    seed: WorldSeed,
    topology_base_url: String,
    fetcher: Option<Arc<dyn RasterFetcher>>,
    dungeon: Option<Arc<dyn DungeonBiomeResolver>>,
}

impl Default for WorldEngineBuilder {
    fn default() -> Self {
        Self {
            seed: WorldSeed::default(),
            topology_base_url: DEFAULT_TOPOLOGY_URL.to_string(),
            fetcher: None,
            dungeon: None,
        }
    }
}

impl WorldEngineBuilder {
    pub fn seed(mut self, seed: WorldSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn topology_base_url(mut self, url: impl Into<String>) -> Self {
        self.topology_base_url = url.into();
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn RasterFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn dungeon_resolver(mut self, resolver: Arc<dyn DungeonBiomeResolver>) -> Self {
        self.dungeon = Some(resolver);
        self
    }

    pub fn build(self) -> WorldEngine {
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpRasterFetcher::new()));
        let dungeon = self.dungeon.unwrap_or_else(|| Arc::new(BedrockResolver));
        WorldEngine {
            seed: Arc::new(self.seed),
            store: RasterStore::new(self.topology_base_url, fetcher),
            dungeon,
        }
    }
}
