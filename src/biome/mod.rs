//! Biome classification.
//!
//! Surface biomes come from a seeded weighted draw against per-region
//! probability tables: each city-precision region perturbs its continent's
//! base weights with deterministic noise, renormalizes, and the address
//! itself seeds the draw. Non-surface locations delegate to the injected
//! [`DungeonBiomeResolver`]. For a fixed [`WorldSeed`] the whole pipeline
//! is a pure function of `(address, location)`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::{cache_get, cache_set, BiomeCaches, CacheHandle};
use crate::errors::WorldError;
use crate::geohash::Geohash;
use crate::location::LocationType;
use crate::raster::RasterStore;
use crate::rng::seeded_unit;
use crate::seed::WorldSeed;
use crate::topology::elevation_at;

/// Reserved surface region forced to tundra for traversal testing; the
/// intensity of 0 marks "no decorative overlay".
const TEST_REGION_PREFIX: &str = "h9";

/// Blend of base weight kept vs. noise added when deriving region
/// parameters from the continent table.
const NOISE_BASE_SHARE: f64 = 0.7;
const NOISE_SHARE: f64 = 0.3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BiomeType {
    Grassland,
    Forest,
    Desert,
    Tundra,
    Underground,
    Aquatic,
}

impl BiomeType {
    /// The fixed classification order; cumulative weights are accumulated
    /// in exactly this sequence, so it is part of the deterministic
    /// contract.
    pub const ALL: [BiomeType; 6] = [
        BiomeType::Grassland,
        BiomeType::Forest,
        BiomeType::Desert,
        BiomeType::Tundra,
        BiomeType::Underground,
        BiomeType::Aquatic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Grassland => "grassland",
            Self::Forest => "forest",
            Self::Desert => "desert",
            Self::Tundra => "tundra",
            Self::Underground => "underground",
            Self::Aquatic => "aquatic",
        }
    }
}

impl std::fmt::Display for BiomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-region biome weights, renormalized to sum to 1.
pub type BiomeParameters = BTreeMap<BiomeType, f64>;

/// Classification outcome: the biome and an intensity in `[0, 1]` that is
/// 1 at the center of the chosen probability band and falls toward 0 at
/// its edges. Downstream rendering uses it for visual blending.
pub type BiomeResult = (BiomeType, f64);

/// Terrain sprite metadata for one biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub path: String,
    /// Variant name -> sprite frame.
    pub variants: BTreeMap<String, String>,
    /// Variant name -> selection probability.
    pub probability: BTreeMap<String, f64>,
    /// Footprint in cells.
    pub width: f64,
    pub height: f64,
    pub precision: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    Simplex,
    Random,
}

/// Decorative overlay spawned on top of a biome cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    pub asset: AssetMetadata,
    pub probability: f64,
    pub noise: NoiseKind,
    pub min_instances: u32,
    pub max_instances: u32,
    /// Scatter radius in cells.
    pub radius: u32,
}

/// Static description of one biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub biome: BiomeType,
    pub name: String,
    /// 0.0 (impassable) to 1.0 (full speed).
    pub traversable_speed: f64,
    pub asset: Option<AssetMetadata>,
    pub decorations: BTreeMap<String, Decoration>,
}

fn terrain_asset(variants: &[(&str, &str, f64)], precision: usize) -> AssetMetadata {
    AssetMetadata {
        path: "biomes/terrain".to_string(),
        variants: variants
            .iter()
            .map(|(k, v, _)| (k.to_string(), v.to_string()))
            .collect(),
        probability: variants
            .iter()
            .map(|(k, _, p)| (k.to_string(), *p))
            .collect(),
        width: 1.0,
        height: 1.0,
        precision,
    }
}

fn grass_decoration(precision: usize) -> Decoration {
    Decoration {
        asset: AssetMetadata {
            path: "biomes/grass".to_string(),
            variants: [("default", "0053"), ("alt1", "0052"), ("alt2", "0054")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            probability: [("default", 0.33), ("alt1", 0.33), ("alt2", 0.33)]
                .into_iter()
                .map(|(k, p)| (k.to_string(), p))
                .collect(),
            width: 0.5,
            height: 0.5,
            precision,
        },
        probability: 0.5,
        noise: NoiseKind::Simplex,
        min_instances: 1,
        max_instances: 5,
        radius: 1,
    }
}

/// Static biome registry. Asset precision follows the default unit
/// precision; hosts with a different spatial layout rebuild their own
/// registry.
pub fn biomes() -> &'static BTreeMap<BiomeType, Biome> {
    static BIOMES: LazyLock<BTreeMap<BiomeType, Biome>> = LazyLock::new(|| {
        let unit = crate::seed::SpatialSettings::default().unit.precision;
        let grass = [
            ("default", "grass1", 0.33),
            ("alt1", "grass2", 0.33),
            ("alt2", "grass3", 0.33),
        ];
        let rocks = [
            ("default", "rocks1", 0.33),
            ("alt1", "rocks2", 0.33),
            ("alt2", "rocks3", 0.33),
        ];

        let mut map = BTreeMap::new();
        map.insert(
            BiomeType::Grassland,
            Biome {
                biome: BiomeType::Grassland,
                name: "Grassland".to_string(),
                traversable_speed: 1.0,
                asset: Some(terrain_asset(&grass, unit)),
                decorations: [("grass".to_string(), grass_decoration(unit))].into(),
            },
        );
        map.insert(
            BiomeType::Forest,
            Biome {
                biome: BiomeType::Forest,
                name: "Forest".to_string(),
                traversable_speed: 0.8,
                asset: Some(terrain_asset(&grass, unit)),
                decorations: [("grass".to_string(), grass_decoration(unit))].into(),
            },
        );
        map.insert(
            BiomeType::Desert,
            Biome {
                biome: BiomeType::Desert,
                name: "Desert".to_string(),
                traversable_speed: 1.0,
                asset: Some(terrain_asset(&grass, unit)),
                decorations: BTreeMap::new(),
            },
        );
        map.insert(
            BiomeType::Tundra,
            Biome {
                biome: BiomeType::Tundra,
                name: "Tundra".to_string(),
                traversable_speed: 1.0,
                asset: Some(terrain_asset(&grass, unit)),
                decorations: BTreeMap::new(),
            },
        );
        map.insert(
            BiomeType::Underground,
            Biome {
                biome: BiomeType::Underground,
                name: "Rocks".to_string(),
                traversable_speed: 0.0,
                asset: Some(terrain_asset(&rocks[..1], unit)),
                decorations: BTreeMap::new(),
            },
        );
        map.insert(
            BiomeType::Aquatic,
            Biome {
                biome: BiomeType::Aquatic,
                name: "Water".to_string(),
                traversable_speed: 0.0,
                asset: Some(terrain_asset(&rocks, unit)),
                decorations: BTreeMap::new(),
            },
        );
        map
    });
    &BIOMES
}

/// Strategy interface for non-surface biome resolution. The dungeon
/// subsystem supplies the real implementation; the engine only needs the
/// call shape.
#[async_trait]
pub trait DungeonBiomeResolver: Send + Sync {
    async fn dungeon_biome_at(
        &self,
        address: &Geohash,
        location: LocationType,
        caches: &BiomeCaches,
    ) -> Result<BiomeResult, WorldError>;
}

/// Fallback resolver: solid rock everywhere below the surface.
pub struct BedrockResolver;

#[async_trait]
impl DungeonBiomeResolver for BedrockResolver {
    async fn dungeon_biome_at(
        &self,
        _address: &Geohash,
        _location: LocationType,
        _caches: &BiomeCaches,
    ) -> Result<BiomeResult, WorldError> {
        Ok((BiomeType::Underground, 1.0))
    }
}

/// Derive the biome weight table for one region.
///
/// Starts from a copy of the continent's base table (the seed itself is
/// never touched), perturbs each weight with noise seeded by
/// `region + biome name`, clamps at zero and renormalizes to sum 1.
pub async fn region_parameters(
    seed: &WorldSeed,
    region: &str,
    cache: &Option<CacheHandle<BiomeParameters>>,
) -> Result<BiomeParameters, WorldError> {
    if let Some(cached) = cache_get(cache, region).await {
        return Ok(cached);
    }

    let continent = region
        .chars()
        .next()
        .ok_or_else(|| WorldError::invalid_address(region, "empty region"))?;
    let mut parameters: BiomeParameters = seed.continent_weights(continent)?.clone();

    for (biome, weight) in parameters.iter_mut() {
        let noise = seeded_unit(&format!("{region}{biome}")) - 0.5;
        *weight = (NOISE_BASE_SHARE * *weight + NOISE_SHARE * noise).max(0.0);
    }

    let total: f64 = parameters.values().sum();
    if total > 0.0 {
        for weight in parameters.values_mut() {
            *weight /= total;
        }
    }

    cache_set(cache, region, parameters.clone()).await;
    Ok(parameters)
}

/// Classify the biome at an address.
///
/// Surface addresses draw from the region's weight table after the
/// sea-level check; the `h9` test region is forced tundra; everything
/// non-surface goes to the dungeon resolver.
pub async fn biome_at(
    seed: &WorldSeed,
    store: &RasterStore,
    dungeon: &dyn DungeonBiomeResolver,
    address: &Geohash,
    location: LocationType,
    caches: &BiomeCaches,
) -> Result<BiomeResult, WorldError> {
    let cache_key = format!("{address}-{location}");
    if let Some(cached) = cache_get(&caches.result, &cache_key).await {
        return Ok(cached);
    }

    let result = if !location.is_surface() {
        dungeon.dungeon_biome_at(address, location, caches).await?
    } else if address.as_str().starts_with(TEST_REGION_PREFIX) {
        (BiomeType::Tundra, 0.0)
    } else {
        let elevation = elevation_at(store, address, location, &caches.topology, None).await?;
        if elevation < 1 {
            // Below sea level, regardless of region weights.
            (BiomeType::Aquatic, 1.0)
        } else {
            let city = address.prefix(seed.spatial.city.precision);
            let parameters = region_parameters(seed, city, &caches.parameters).await?;
            select_biome(address, &parameters)
        }
    };

    cache_set(&caches.result, &cache_key, result).await;
    Ok(result)
}

/// Seeded weighted selection over the fixed biome order.
///
/// The draw lands in one cumulative band; intensity is 1 at the band's
/// midpoint and approaches 0 at its edges.
fn select_biome(address: &Geohash, parameters: &BiomeParameters) -> BiomeResult {
    let weights: Vec<f64> = BiomeType::ALL
        .iter()
        .map(|b| parameters.get(b).copied().unwrap_or(0.0))
        .collect();
    let total: f64 = weights.iter().sum();
    let draw = seeded_unit(address.as_str()) * total;

    let mut cumulative = 0.0;
    for (biome, weight) in BiomeType::ALL.iter().zip(&weights) {
        cumulative += weight;
        if draw < cumulative {
            let band_mid = cumulative - weight / 2.0;
            let intensity = 1.0 - (draw - band_mid).abs() / (weight / 2.0);
            return (*biome, intensity);
        }
    }

    // Unreachable for a positive-total table; keeps the signature total.
    (BiomeType::Grassland, 1.0)
}
