//! World seed configuration.
//!
//! The seed is the immutable root of all procedural generation: spatial
//! precision constants plus per-continent base biome weight tables. It is
//! constructed once, injected into the engine, and never mutated — the
//! per-region noise step in the biome classifier operates on a copy of the
//! continent table, never on the seed itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::biome::BiomeType;
use crate::errors::WorldError;

/// Precision (geohash length) of one spatial level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialLevel {
    pub precision: usize,
}

/// Spatial precision constants. Continent and territory are fixed by the
/// geohash encoding itself; city and unit are game tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialSettings {
    pub continent: SpatialLevel,
    pub territory: SpatialLevel,
    /// Biome parameters (and region descriptions) are derived per city.
    pub city: SpatialLevel,
    /// Full cell precision used for entities and terrain assets.
    pub unit: SpatialLevel,
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self {
            continent: SpatialLevel { precision: 1 },
            territory: SpatialLevel { precision: 2 },
            city: SpatialLevel { precision: 4 },
            unit: SpatialLevel { precision: 8 },
        }
    }
}

/// Per-continent seed data: base biome weights before per-city noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinentSeed {
    pub biome: BTreeMap<BiomeType, f64>,
}

/// Process-wide immutable world configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSeed {
    pub name: String,
    pub spatial: SpatialSettings,
    /// One entry per continent character of the geohash alphabet.
    pub continents: BTreeMap<char, ContinentSeed>,
}

impl WorldSeed {
    /// Base biome weights for a continent. A missing entry is a
    /// misconfigured seed, not a recoverable miss.
    pub fn continent_weights(
        &self,
        continent: char,
    ) -> Result<&BTreeMap<BiomeType, f64>, WorldError> {
        self.continents
            .get(&continent)
            .map(|c| &c.biome)
            .ok_or(WorldError::RegionResolutionFailure { continent })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

fn weights(entries: &[(BiomeType, f64)]) -> BTreeMap<BiomeType, f64> {
    entries.iter().copied().collect()
}

impl Default for WorldSeed {
    /// The stock world: every continent character gets a base table drawn
    /// from one of four climate archetypes, keyed by the character's
    /// alphabet position.
    fn default() -> Self {
        let temperate = weights(&[
            (BiomeType::Grassland, 0.5),
            (BiomeType::Forest, 0.3),
            (BiomeType::Desert, 0.1),
            (BiomeType::Tundra, 0.1),
        ]);
        let verdant = weights(&[
            (BiomeType::Grassland, 0.3),
            (BiomeType::Forest, 0.5),
            (BiomeType::Desert, 0.05),
            (BiomeType::Tundra, 0.15),
        ]);
        let arid = weights(&[
            (BiomeType::Grassland, 0.25),
            (BiomeType::Forest, 0.1),
            (BiomeType::Desert, 0.55),
            (BiomeType::Tundra, 0.1),
        ]);
        let boreal = weights(&[
            (BiomeType::Grassland, 0.2),
            (BiomeType::Forest, 0.25),
            (BiomeType::Desert, 0.05),
            (BiomeType::Tundra, 0.5),
        ]);
        let archetypes = [temperate, verdant, arid, boreal];

        let continents = crate::geohash::GEOHASH_ALPHABET
            .chars()
            .enumerate()
            .map(|(i, c)| {
                (
                    c,
                    ContinentSeed {
                        biome: archetypes[i % archetypes.len()].clone(),
                    },
                )
            })
            .collect();

        Self {
            name: "yggdrasil".to_string(),
            spatial: SpatialSettings::default(),
            continents,
        }
    }
}
