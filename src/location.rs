//! Location type tags.

use serde::{Deserialize, Serialize};

use crate::errors::WorldError;

/// Which sampling path applies to an address.
///
/// `Geohash` is the world surface and samples the terrain raster. The
/// dungeon strata (`D1`-`D4`) and interior instances (`In`) have no raster:
/// their elevation is fixed at 0 and biome resolution is delegated to the
/// injected dungeon resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Geohash,
    D1,
    D2,
    D3,
    D4,
    In,
}

impl LocationType {
    pub fn is_surface(&self) -> bool {
        matches!(self, Self::Geohash)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geohash => "geohash",
            Self::D1 => "d1",
            Self::D2 => "d2",
            Self::D3 => "d3",
            Self::D4 => "d4",
            Self::In => "in",
        }
    }
}

impl std::str::FromStr for LocationType {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "geohash" => Ok(Self::Geohash),
            "d1" => Ok(Self::D1),
            "d2" => Ok(Self::D2),
            "d3" => Ok(Self::D3),
            "d4" => Ok(Self::D4),
            "in" => Ok(Self::In),
            other => Err(WorldError::InvalidLocationType {
                tag: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
