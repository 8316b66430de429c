//! Engine error types.
//!
//! Cache misses and absent cache handles are never errors; every variant
//! here means the call cannot produce a value at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    /// Malformed geohash input (characters outside the base-32 alphabet,
    /// or an address too short to resolve a tile).
    #[error("invalid geohash address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Network or decode failure while resolving a terrain raster.
    /// The caller decides retry/fallback policy; nothing is retried here.
    #[error("raster unavailable for {url}: {reason}")]
    RasterUnavailable { url: String, reason: String },

    /// Unknown location type tag. Programming error in the caller.
    #[error("invalid location type {tag:?}")]
    InvalidLocationType { tag: String },

    /// The world seed carries no entry for a continent referenced by an
    /// address. Indicates a misconfigured seed, not bad user input.
    #[error("no continent entry {continent:?} in world seed")]
    RegionResolutionFailure { continent: char },
}

impl WorldError {
    pub(crate) fn invalid_address(address: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn raster_unavailable(url: &str, reason: impl Into<String>) -> Self {
        Self::RasterUnavailable {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
