//! Elevation sampling.
//!
//! Maps a geohash cell onto its tile raster and reads an intensity for it.
//! Raster resolution and grid resolution are independent, so two numeric
//! regimes apply: when the raster is finer than the grid the cell's pixel
//! footprint is averaged (bounded to 16 sample steps per axis), and when it
//! is coarser the value is interpolated between smoothed pixel
//! neighborhoods so that cell boundaries do not show stair-stepping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::{cache_get, cache_set, TopologyCaches};
use crate::errors::WorldError;
use crate::geohash::{topology_tile, Geohash, TopologyTile};
use crate::location::LocationType;
use crate::raster::{RasterBuffer, RasterStore};

/// Maximum sampling steps per axis when averaging a cell's pixel footprint.
const MAX_FOOTPRINT_STEPS: u64 = 16;

/// Manual override for one location: explicit elevation and/or suppression
/// of decorative overlays. Takes precedence over every cache stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingEntry {
    pub elevation: Option<u8>,
    pub decorations: Option<bool>,
}

/// Sparse land-grading table keyed by location type and address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandGrading {
    entries: HashMap<LocationType, HashMap<String, GradingEntry>>,
}

impl LandGrading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, location: LocationType, address: impl Into<String>, entry: GradingEntry) {
        self.entries
            .entry(location)
            .or_default()
            .insert(address.into(), entry);
    }

    pub fn get(&self, location: LocationType, address: &str) -> Option<&GradingEntry> {
        self.entries.get(&location)?.get(address)
    }

    /// Whether decorative overlays are suppressed at a location.
    pub fn decorations_suppressed(&self, location: LocationType, address: &str) -> bool {
        self.get(location, address)
            .and_then(|e| e.decorations)
            .map(|enabled| !enabled)
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|m| m.is_empty())
    }
}

/// Full topology sample for one address: the raw intensity plus the raster
/// and tile context it came from.
#[derive(Debug, Clone)]
pub struct TopologySample {
    pub intensity: f64,
    pub width: u32,
    pub height: u32,
    /// Floored base pixel of the cell in the raster.
    pub x: u32,
    pub y: u32,
    pub url: String,
    pub tile: TopologyTile,
}

/// Sample the terrain raster at an address.
pub async fn topology_at(
    store: &RasterStore,
    address: &Geohash,
    caches: &TopologyCaches,
) -> Result<TopologySample, WorldError> {
    let tile = topology_tile(address)?;
    let url = store.tile_url(&tile.key);
    let raster = store.buffer_for(&url, caches).await?;

    let (intensity, x, y) = sample_tile(&raster, &tile);

    Ok(TopologySample {
        intensity,
        width: raster.width,
        height: raster.height,
        x,
        y,
        url,
        tile,
    })
}

/// Elevation in `[0, 255]` at an address.
///
/// Precedence: land grading (bypasses all caches), result cache, then live
/// sampling. Non-surface locations have no raster and are fixed at 0. The
/// biome layer treats values below 1 as below sea level; this function does
/// not.
pub async fn elevation_at(
    store: &RasterStore,
    address: &Geohash,
    location: LocationType,
    caches: &TopologyCaches,
    land_grading: Option<&LandGrading>,
) -> Result<u8, WorldError> {
    if let Some(graded) = land_grading
        .and_then(|lg| lg.get(location, address.as_str()))
        .and_then(|entry| entry.elevation)
    {
        return Ok(graded);
    }

    let cache_key = format!("{location}-{address}");
    if let Some(cached) = cache_get(&caches.result, &cache_key).await {
        return Ok(cached);
    }

    if !location.is_surface() {
        return Ok(0);
    }

    let sample = topology_at(store, address, caches).await?;
    let elevation = sample.intensity.ceil().clamp(0.0, 255.0) as u8;

    cache_set(&caches.result, &cache_key, elevation).await;
    Ok(elevation)
}

/// Sample one tile cell from a raster. Returns the intensity and the
/// floored base pixel.
fn sample_tile(raster: &RasterBuffer, tile: &TopologyTile) -> (f64, u32, u32) {
    let width = raster.width as u64;
    let height = raster.height as u64;

    // Proportional fractional pixel coordinate; both ends are 0-indexed.
    // Floor, never round: rounding would double-count the boundary pixel.
    let x_raw = (width - 1) as f64 * (tile.col as f64 / (tile.cols - 1) as f64);
    let y_raw = (height - 1) as f64 * (tile.row as f64 / (tile.rows - 1) as f64);
    let x = x_raw.floor() as u32;
    let y = y_raw.floor() as u32;

    let intensity = if width > tile.cols {
        average_footprint(raster, tile)
    } else {
        interpolate_subpixel(raster, x, y, x_raw - x_raw.floor(), y_raw - y_raw.floor())
    };

    (intensity, x, y)
}

/// Downsample regime: the raster is finer than the grid, so one cell covers
/// a pixel footprint. Average the footprint, visiting at most
/// [`MAX_FOOTPRINT_STEPS`] pixels per axis.
fn average_footprint(raster: &RasterBuffer, tile: &TopologyTile) -> f64 {
    let width = raster.width as u64;
    let height = raster.height as u64;

    let x_pixels = (width / tile.cols).max(1);
    let y_pixels = (height / tile.rows).max(1);
    let x_step = (x_pixels / MAX_FOOTPRINT_STEPS).max(1);
    let y_step = (y_pixels / MAX_FOOTPRINT_STEPS).max(1);
    let x_start = width * tile.col / tile.cols;
    let y_start = height * tile.row / tile.rows;

    let mut total = 0u64;
    let mut count = 0u64;
    let mut j = y_start;
    while j < (y_start + y_pixels).min(height) {
        let mut i = x_start;
        while i < (x_start + x_pixels).min(width) {
            total += raster.intensity(i as u32, j as u32) as u64;
            count += 1;
            i += x_step;
        }
        j += y_step;
    }

    total as f64 / count as f64
}

/// Upsample regime: one raster pixel covers multiple cells. Pick the
/// quadrant of the covering pixel implied by the sub-pixel offset and
/// bilinearly interpolate between the four neighborhood means framing it.
///
/// Raw corner pixels would produce straight edges at cell boundaries
/// (integer plateaus meeting integer plateaus), so each corner value is the
/// mean of that pixel and its in-bounds 3x3 neighborhood instead.
fn interpolate_subpixel(raster: &RasterBuffer, x: u32, y: u32, fx: f64, fy: f64) -> f64 {
    let xm = x.saturating_sub(1);
    let xp = (x + 1).min(raster.width - 1);
    let ym = y.saturating_sub(1);
    let yp = (y + 1).min(raster.height - 1);

    let mean = |px: u32, py: u32| neighborhood_mean(raster, px, py);

    let (tl, tr, bl, br) = if fx < 0.5 {
        if fy < 0.5 {
            (
                corner(-0.5, -0.5, mean(xm, ym)),
                corner(0.5, -0.5, mean(x, ym)),
                corner(-0.5, 0.5, mean(xm, y)),
                corner(0.5, 0.5, mean(x, y)),
            )
        } else {
            (
                corner(-0.5, 0.5, mean(xm, y)),
                corner(0.5, 0.5, mean(x, y)),
                corner(-0.5, 1.5, mean(xm, yp)),
                corner(0.5, 1.5, mean(x, yp)),
            )
        }
    } else if fy < 0.5 {
        (
            corner(0.5, -0.5, mean(x, ym)),
            corner(1.5, -0.5, mean(xp, ym)),
            corner(0.5, 0.5, mean(x, y)),
            corner(1.5, 0.5, mean(xp, y)),
        )
    } else {
        (
            corner(0.5, 0.5, mean(x, y)),
            corner(1.5, 0.5, mean(xp, y)),
            corner(0.5, 1.5, mean(x, yp)),
            corner(1.5, 1.5, mean(xp, yp)),
        )
    };

    bilinear(fx, fy, tl, tr, bl, br)
}

/// Mean of a pixel and its up-to-8 in-bounds neighbors. Out-of-range
/// neighbors are excluded from the divisor, which shifts interpolation
/// weight slightly at raster borders; that behavior is load-bearing for
/// terrain continuity at tile seams.
fn neighborhood_mean(raster: &RasterBuffer, x: u32, y: u32) -> f64 {
    let mut total = 0u32;
    let mut count = 0u32;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx >= 0 && ny >= 0 && (nx as u32) < raster.width && (ny as u32) < raster.height {
                total += raster.intensity(nx as u32, ny as u32) as u32;
                count += 1;
            }
        }
    }
    total as f64 / count as f64
}

#[derive(Clone, Copy)]
struct Corner {
    x: f64,
    y: f64,
    intensity: f64,
}

fn corner(x: f64, y: f64, intensity: f64) -> Corner {
    Corner { x, y, intensity }
}

/// Bilinear interpolation between four corners at `(x, y)`.
///
/// Uses the lerp form rather than the weighted-sum form: for a constant
/// field the result is then the constant exactly, so the later `ceil`
/// cannot drift an all-128 raster up to 129.
fn bilinear(x: f64, y: f64, tl: Corner, tr: Corner, bl: Corner, br: Corner) -> f64 {
    let tx = (x - bl.x) / (br.x - bl.x);
    let ty = (y - tl.y) / (bl.y - tl.y);

    let top = tl.intensity + (tr.intensity - tl.intensity) * tx;
    let bottom = bl.intensity + (br.intensity - bl.intensity) * tx;
    top + (bottom - top) * ty
}
