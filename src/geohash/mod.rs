//! Geohash grid math.
//!
//! A geohash is a base-32 string where every shared prefix implies spatial
//! containment. Terrain rasters are stored per 2-character tile key, so the
//! sampler needs to know, for a full-precision address, which tile it falls
//! in and at which cell offset inside that tile. All of that is pure
//! arithmetic on the geohash bit layout; no I/O happens here.

use serde::{Deserialize, Serialize};

use crate::errors::WorldError;

/// The geohash base-32 alphabet (no a, i, l, o).
pub const GEOHASH_ALPHABET: &str = "0123456789bcdefghjkmnpqrstuvwxyz";

/// Marker appended to a tile key at even character positions to stay on the
/// tile's north-west cell. `b` decodes to column 0 / row 0 there.
const MARKER_EVEN: char = 'b';
/// North-west marker for odd character positions.
const MARKER_ODD: char = 'p';

fn char_index(c: char) -> Option<u64> {
    GEOHASH_ALPHABET.find(c).map(|i| i as u64)
}

/// A validated, immutable geohash address.
///
/// Length equals precision: 1 char is a continent, 2 a territory, and the
/// configured city/unit precisions come from the
/// [`WorldSeed`](crate::seed::WorldSeed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Geohash(String);

impl Geohash {
    pub fn new(address: impl Into<String>) -> Result<Self, WorldError> {
        let address = address.into();
        if address.is_empty() {
            return Err(WorldError::invalid_address(&address, "empty address"));
        }
        for c in address.chars() {
            if char_index(c).is_none() {
                return Err(WorldError::invalid_address(
                    &address,
                    format!("character {c:?} is not in the geohash alphabet"),
                ));
            }
        }
        Ok(Self(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Precision of this address (character count).
    pub fn precision(&self) -> usize {
        self.0.len()
    }

    /// Continent character (precision-1 prefix).
    pub fn continent(&self) -> char {
        // The alphabet is ASCII and new() rejects empty addresses.
        self.0.as_bytes()[0] as char
    }

    /// Truncate to the given precision. Addresses shorter than `precision`
    /// are returned whole.
    pub fn prefix(&self, precision: usize) -> &str {
        let end = precision.min(self.0.len());
        &self.0[..end]
    }
}

impl std::str::FromStr for Geohash {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Geohash {
    type Error = WorldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Geohash> for String {
    fn from(value: Geohash) -> Self {
        value.0
    }
}

impl std::fmt::Display for Geohash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Absolute (column, row) of an address in the global grid at its own
/// precision. Rows count from the north edge, which is what makes the
/// `b`/`p` marker keys decode to a tile's top-left corner.
///
/// Geohash characters interleave longitude/latitude bits, starting with
/// longitude: even character positions carry 3 longitude + 2 latitude bits
/// (an 8x4 split), odd positions the transpose (4x8).
pub fn to_col_row(address: &str) -> Result<(u64, u64), WorldError> {
    let mut col = 0u64;
    let mut row = 0u64;
    for (i, c) in address.chars().enumerate() {
        let v = char_index(c).ok_or_else(|| {
            WorldError::invalid_address(address, format!("character {c:?} is not in the geohash alphabet"))
        })?;
        let (b4, b3, b2, b1, b0) = (v >> 4 & 1, v >> 3 & 1, v >> 2 & 1, v >> 1 & 1, v & 1);
        if i % 2 == 0 {
            let lon = b4 << 2 | b2 << 1 | b0;
            let lat = b3 << 1 | b1;
            col = col * 8 + lon;
            row = row * 4 + (3 - lat);
        } else {
            let lat = b4 << 2 | b2 << 1 | b0;
            let lon = b3 << 1 | b1;
            col = col * 4 + lon;
            row = row * 8 + (7 - lat);
        }
    }
    Ok((col, row))
}

/// A raster tile resolved for one address: the 2-character tile key, the
/// tile's cell dimensions at the address's precision, and the address's
/// cell offset inside the tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyTile {
    /// 2-character tile key; the raster for this tile lives at
    /// `{base}/{key}.png`.
    pub key: String,
    /// Full-precision key of the tile's north-west cell.
    pub top_left: String,
    /// Cell rows in the tile at the address's precision.
    pub rows: u64,
    /// Cell columns in the tile at the address's precision.
    pub cols: u64,
    /// Column of the address inside the tile, `0..cols`.
    pub col: u64,
    /// Row of the address inside the tile, `0..rows`.
    pub row: u64,
    /// World column of the tile's top-left cell.
    pub tl_col: u64,
    /// World row of the tile's top-left cell.
    pub tl_row: u64,
}

/// Resolve the raster tile containing `address`.
///
/// Tiles are stored per 2-character prefix and start at 4 rows x 8 columns
/// of precision-3 cells. Each further precision step multiplies by the
/// complementary 8x4 / 4x8 split. The top-left key is built by appending
/// north-west markers, with the terminal marker chosen to complement the
/// last subdivision branch.
pub fn topology_tile(address: &Geohash) -> Result<TopologyTile, WorldError> {
    let s = address.as_str();
    if s.len() < 3 {
        return Err(WorldError::invalid_address(
            s,
            "address must be at least precision 3 to resolve a tile cell",
        ));
    }

    let key = &s[..2];
    let mut rows: u64 = 4;
    let mut cols: u64 = 8;
    let mut top_left = key.to_string();
    for i in 0..s.len() - 3 {
        if i % 2 == 0 {
            rows *= 8;
            cols *= 4;
            top_left.push(MARKER_EVEN);
        } else {
            rows *= 4;
            cols *= 8;
            top_left.push(MARKER_ODD);
        }
    }
    if top_left.ends_with(MARKER_EVEN) {
        top_left.push(MARKER_ODD);
    } else {
        top_left.push(MARKER_EVEN);
    }

    let (tl_col, tl_row) = to_col_row(&top_left)?;
    let (col, row) = to_col_row(s)?;

    Ok(TopologyTile {
        key: key.to_string(),
        top_left,
        rows,
        cols,
        col: col - tl_col,
        row: row - tl_row,
        tl_col,
        tl_row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_alphabet() {
        assert!(Geohash::new("w2a").is_err()); // 'a' is excluded
        assert!(Geohash::new("w2 ").is_err());
        assert!(Geohash::new("").is_err());
        assert!(Geohash::new("w21z3t").is_ok());
    }

    #[test]
    fn test_prefix_and_continent() {
        let gh = Geohash::new("w21z3t").unwrap();
        assert_eq!(gh.continent(), 'w');
        assert_eq!(gh.prefix(2), "w2");
        assert_eq!(gh.prefix(4), "w21z");
        assert_eq!(gh.prefix(9), "w21z3t");
    }

    #[test]
    fn test_col_row_single_char() {
        // 'w' = 28 = 0b11100: lon bits 110 = 6, lat bits 10 = 2, row = 3-2
        assert_eq!(to_col_row("w").unwrap(), (6, 1));
        // 'b' = 10 = 0b01010: north-west of an even position
        assert_eq!(to_col_row("b").unwrap(), (0, 0));
    }

    #[test]
    fn test_marker_key_is_tile_origin() {
        // The marker-built key must decode to the scaled top-left corner.
        let (c2, r2) = to_col_row("w2").unwrap();
        let (tl_col, tl_row) = to_col_row("w2bpbp").unwrap();
        assert_eq!(tl_col, c2 * 8 * 4 * 8 * 4);
        assert_eq!(tl_row, r2 * 4 * 8 * 4 * 8);
    }

    #[test]
    fn test_tile_geometry_reference() {
        // Hand-computed reference for "w21z3t" (precision 6).
        let tile = topology_tile(&Geohash::new("w21z3t").unwrap()).unwrap();
        assert_eq!(tile.key, "w2");
        assert_eq!(tile.top_left, "w2bpbp");
        assert_eq!(tile.rows, 1024); // 4*8*4*8
        assert_eq!(tile.cols, 1024); // 8*4*8*4
        assert_eq!(tile.col, 230);
        assert_eq!(tile.row, 786);
    }

    #[test]
    fn test_tile_offsets_in_bounds() {
        for addr in ["w2b", "w2z", "sk3m", "h9h9h9h9", "zzzzzzzz", "00000000"] {
            let tile = topology_tile(&Geohash::new(addr).unwrap()).unwrap();
            assert!(tile.col < tile.cols, "{addr}: col {} >= cols {}", tile.col, tile.cols);
            assert!(tile.row < tile.rows, "{addr}: row {} >= rows {}", tile.row, tile.rows);
        }
    }

    #[test]
    fn test_tile_requires_precision_three() {
        let err = topology_tile(&Geohash::new("w2").unwrap()).unwrap_err();
        assert!(matches!(err, WorldError::InvalidAddress { .. }));
    }

    #[test]
    fn test_precision_three_tile() {
        let tile = topology_tile(&Geohash::new("w2b").unwrap()).unwrap();
        assert_eq!(tile.rows, 4);
        assert_eq!(tile.cols, 8);
        // "w2b" is itself the tile's top-left cell
        assert_eq!(tile.top_left, "w2b");
        assert_eq!((tile.col, tile.row), (0, 0));
    }
}
