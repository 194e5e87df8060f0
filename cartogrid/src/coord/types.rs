//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Default zoom limits for the viewport.
pub const MIN_ZOOM: u32 = 2;
pub const MAX_ZOOM: u32 = 17;

/// Standard slippy-map tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Errors from coordinate construction and conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -85.05112878 and 85.05112878)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom range: min {min} is greater than max {max}")]
    InvalidZoomRange { min: u32, max: u32 },
}

/// Inclusive range of integer zoom levels a [`Location`] may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min: u32,
    pub max: u32,
}

impl ZoomRange {
    /// Creates a zoom range, rejecting `min > max`.
    pub fn new(min: u32, max: u32) -> Result<Self, CoordError> {
        if min > max {
            return Err(CoordError::InvalidZoomRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Clamps a continuous zoom value into the range.
    #[inline]
    pub fn clamp(&self, z: f64) -> f64 {
        z.clamp(self.min as f64, self.max as f64)
    }

    /// Returns true if the integer level lies within the range.
    #[inline]
    pub fn contains(&self, level: u32) -> bool {
        (self.min..=self.max).contains(&level)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
        }
    }
}

/// Pixel dimensions of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
    }
}

/// Pixel dimensions of the screen area the grid fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of whole tiles that fit across and down the viewport.
    ///
    /// Returns `(0, 0)` for a degenerate tile size instead of dividing by zero.
    pub fn tiles_across(&self, tile: TileSize) -> (u32, u32) {
        (
            self.width.checked_div(tile.width).unwrap_or(0),
            self.height.checked_div(tile.height).unwrap_or(0),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// A relative pan/zoom step produced by the input layer.
///
/// `dx`/`dy` are world pixels at the current zoom level, `dz` is in zoom
/// levels (negative zooms out).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveDelta {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl MoveDelta {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn pan(dx: f64, dy: f64) -> Self {
        Self::new(dx, dy, 0.0)
    }

    pub fn zoom(dz: f64) -> Self {
        Self::new(0.0, 0.0, dz)
    }

    /// Returns true if this delta changes the zoom.
    #[inline]
    pub fn is_zoom(&self) -> bool {
        self.dz != 0.0
    }
}

/// World-space focal point of the viewport.
///
/// `x`/`y` are pixel offsets of the viewport's top-left corner measured at
/// the current zoom level; `z` is the continuous zoom.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Integer zoom level used for tile addressing.
    #[inline]
    pub fn zoom_level(&self) -> u32 {
        self.z.round().max(0.0) as u32
    }

    /// Clamps `z` into `zoom` without touching the pan offset.
    pub fn clamp_zoom(&mut self, zoom: ZoomRange) {
        self.z = zoom.clamp(self.z);
    }

    /// Applies a pan/zoom delta and returns the number of integer zoom levels
    /// actually crossed (negative when zooming out).
    ///
    /// Pan is additive. The zoom target is clamped before the pan offset is
    /// rescaled, so `x`/`y` are scaled by `2^levels` for exactly the levels
    /// that were applied. A zoom step attempted at a limit leaves the offset
    /// untouched.
    pub fn apply(&mut self, delta: MoveDelta, zoom: ZoomRange) -> i32 {
        self.x += delta.dx;
        self.y += delta.dy;

        let from = zoom.clamp(self.z);
        if !delta.is_zoom() {
            self.z = from;
            return 0;
        }

        let target = zoom.clamp(self.z + delta.dz);
        let levels = target.round() as i32 - from.round() as i32;
        if levels != 0 {
            let scale = 2f64.powi(levels);
            self.x *= scale;
            self.y *= scale;
        }
        self.z = target;
        levels
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}) @ z{:.2}", self.x, self.y, self.z)
    }
}

/// Address of one raster tile in the slippy-map scheme.
///
/// At zoom `z` the plane holds `2^z × 2^z` tiles; `x` grows east, `y` south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl TileKey {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles along one axis at this key's zoom level.
    #[inline]
    pub fn tiles_per_axis(&self) -> u64 {
        1u64.checked_shl(self.z).unwrap_or(u64::MAX)
    }

    /// Returns true if the key addresses a tile that exists on the plane.
    #[inline]
    pub fn is_in_bounds(&self) -> bool {
        let n = self.tiles_per_axis();
        (self.x as u64) < n && (self.y as u64) < n
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
